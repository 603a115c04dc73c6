use std::mem;

use rustc_hash::FxHashMap;

use crate::error::{ApiError, ApiResult};
use crate::tags::TagId;

use super::{Str, Val};

/// Hashable identity of a table key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyId {
    Number(u64),
    Str(Str),
    Ref(usize),
}

impl KeyId {
    /// `None` for keys a table can never hold (nil and NaN).
    fn of(key: &Val) -> Option<KeyId> {
        match key {
            Val::Nil => None,
            Val::Number(n) if n.is_nan() => None,
            // 0.0 and -0.0 are the same key
            Val::Number(n) if *n == 0.0 => Some(KeyId::Number(0f64.to_bits())),
            Val::Number(n) => Some(KeyId::Number(n.to_bits())),
            Val::Str(s) => Some(KeyId::Str(s.clone())),
            other => other.identity().map(KeyId::Ref),
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    key: Val,
    value: Val,
}

/// Hash table keyed by any non-nil value.
///
/// Entries live in insertion order. Assigning nil to a field keeps its node
/// as a dead entry, so clearing fields while traversing with [`Table::next`]
/// is fine. Adding new keys during a traversal may compact the node list;
/// the traversal then has no defined order and may skip or repeat entries.
#[derive(Debug)]
pub struct Table {
    tag: TagId,
    nodes: Vec<Node>,
    slots: FxHashMap<KeyId, usize>,
    dead: usize,
}

impl Table {
    pub fn new(tag: TagId) -> Self {
        Self {
            tag,
            nodes: Vec::new(),
            slots: FxHashMap::default(),
            dead: 0,
        }
    }

    #[inline]
    pub fn tag(&self) -> TagId {
        self.tag
    }

    #[inline]
    pub(crate) fn set_tag(&mut self, tag: TagId) {
        self.tag = tag;
    }

    /// Number of fields with a non-nil value.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len() - self.dead
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &Val) -> Val {
        KeyId::of(key)
            .and_then(|id| self.slots.get(&id))
            .map(|&pos| self.nodes[pos].value.clone())
            .unwrap_or_default()
    }

    pub fn get_int(&self, n: i64) -> Val {
        self.get(&Val::Number(n as f64))
    }

    /// Stores `value` under `key`. Nil and NaN keys are rejected.
    pub fn set(&mut self, key: Val, value: Val) -> ApiResult<()> {
        let Some(id) = KeyId::of(&key) else {
            let what = if key.is_nil() { "nil" } else { "NaN" };
            return Err(ApiError::Runtime(format!("table index is {what}")));
        };
        if let Some(&pos) = self.slots.get(&id) {
            let slot = &mut self.nodes[pos].value;
            match (slot.is_nil(), value.is_nil()) {
                (false, true) => self.dead += 1,
                (true, false) => self.dead -= 1,
                _ => {}
            }
            *slot = value;
            return Ok(());
        }
        if value.is_nil() {
            return Ok(());
        }
        if self.dead > 0 && self.dead * 2 >= self.nodes.len() {
            self.compact();
        }
        self.slots.insert(id, self.nodes.len());
        self.nodes.push(Node { key, value });
        Ok(())
    }

    pub fn set_int(&mut self, n: i64, value: Val) {
        // numeric keys built from integers are never nil or NaN
        let _ = self.set(Val::Number(n as f64), value);
    }

    /// Entry following `key` in traversal order; nil starts the traversal.
    /// `key` must be nil or a key returned by a previous call.
    pub fn next(&self, key: &Val) -> ApiResult<Option<(Val, Val)>> {
        let start = if key.is_nil() {
            0
        } else {
            match KeyId::of(key).and_then(|id| self.slots.get(&id)) {
                Some(&pos) => pos + 1,
                None => return Err(ApiError::Runtime("invalid key for next".to_string())),
            }
        };
        Ok(self.nodes[start..]
            .iter()
            .find(|node| !node.value.is_nil())
            .map(|node| (node.key.clone(), node.value.clone())))
    }

    /// Size hint for array-like tables: the numeric field `n` when present,
    /// otherwise the largest numeric key holding a non-nil value (zero when
    /// there is none). Tables with holes get some maximal key, not a count.
    pub fn length_hint(&self, n_key: &Str) -> i64 {
        if let Val::Number(n) = self.get(&Val::Str(n_key.clone())) {
            return n as i64;
        }
        let max = self
            .iter()
            .filter_map(|(key, _)| match key {
                Val::Number(n) => Some(*n),
                _ => None,
            })
            .fold(0f64, f64::max);
        max as i64
    }

    /// Live entries in traversal order.
    pub fn iter(&self) -> impl Iterator<Item = (&Val, &Val)> {
        self.nodes
            .iter()
            .filter(|node| !node.value.is_nil())
            .map(|node| (&node.key, &node.value))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.slots.clear();
        self.dead = 0;
    }

    pub(crate) fn heap_size(&self) -> usize {
        mem::size_of::<Self>()
            + self.nodes.capacity() * mem::size_of::<Node>()
            + self.slots.capacity() * (mem::size_of::<KeyId>() + mem::size_of::<usize>())
    }

    fn compact(&mut self) {
        self.nodes.retain(|node| !node.value.is_nil());
        self.slots.clear();
        for (pos, node) in self.nodes.iter().enumerate() {
            if let Some(id) = KeyId::of(&node.key) {
                self.slots.insert(id, pos);
            }
        }
        self.dead = 0;
    }
}
