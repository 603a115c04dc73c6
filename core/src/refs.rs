//! Reference table: stable integer handles that anchor values against
//! collection.
//!
//! Slots form an index arena. Released slots are chained into a LIFO free
//! list and reused before the arena grows; growth only appends, so a handle
//! keeps naming the same slot for as long as it is anchored.

use tracing::{trace, warn};

use crate::error::{ApiError, ApiResult};
use crate::val::Val;

const MIN_GROWTH: usize = 4;

/// Host-facing reference to an anchored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(i32);

impl Handle {
    /// Handle of nil. It needs no slot and always dereferences to nil.
    pub const NIL: Handle = Handle(-2);
    /// Handle that never names a value.
    pub const NONE: Handle = Handle(-1);

    #[inline]
    pub const fn from_raw(raw: i32) -> Handle {
        Handle(raw)
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    fn slot(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

/// How strongly the host holds an anchored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// The host must release the handle explicitly.
    Locked,
    /// Weaker convention for handles the host keeps for internal bookkeeping.
    Held,
}

#[derive(Debug, Clone)]
enum RefSlot {
    Free { next: Option<u32> },
    Anchored { value: Val, anchor: Anchor },
}

#[derive(Debug)]
pub struct RefTable {
    slots: Vec<RefSlot>,
    free: Option<u32>,
    anchored: usize,
    max: usize,
}

impl RefTable {
    pub fn new(max: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: None,
            anchored: 0,
            max: max.min(i32::MAX as usize),
        }
    }

    /// Anchors `value` and returns its handle. Nil gets [`Handle::NIL`]
    /// without using a slot.
    pub fn alloc(&mut self, value: Val, lock: bool) -> ApiResult<Handle> {
        if value.is_nil() {
            return Ok(Handle::NIL);
        }
        let anchor = if lock { Anchor::Locked } else { Anchor::Held };
        let slot = match self.free {
            Some(id) => {
                let id = id as usize;
                let RefSlot::Free { next } = self.slots[id] else {
                    unreachable!("free list points at an anchored slot");
                };
                self.free = next;
                id
            }
            None => self.grow()?,
        };
        self.slots[slot] = RefSlot::Anchored { value, anchor };
        self.anchored += 1;
        trace!(target: "tagvm::refs", handle = slot, ?anchor, "refs.alloc");
        Ok(Handle(slot as i32))
    }

    fn grow(&mut self) -> ApiResult<usize> {
        let id = self.slots.len();
        if id >= self.max {
            warn!(target: "tagvm::refs", slots = id, "refs.overflow");
            return Err(ApiError::CapacityExhausted("reference table"));
        }
        if id == self.slots.capacity() {
            let additional = id.max(MIN_GROWTH).min(self.max - id);
            self.slots
                .try_reserve_exact(additional)
                .map_err(|_| ApiError::CapacityExhausted("reference table"))?;
        }
        self.slots.push(RefSlot::Free { next: None });
        Ok(id)
    }

    /// Returns an anchored slot to the free list. Releasing a negative handle
    /// is a no-op; releasing a free or unknown handle is a contract violation.
    pub fn release(&mut self, handle: Handle) {
        let Some(slot) = handle.slot() else {
            return;
        };
        api_check!(
            matches!(self.slots.get(slot), Some(RefSlot::Anchored { .. })),
            "release of handle {} that is not anchored",
            handle.0
        );
        self.slots[slot] = RefSlot::Free { next: self.free };
        self.free = Some(slot as u32);
        self.anchored -= 1;
        trace!(target: "tagvm::refs", handle = slot, "refs.release");
    }

    /// Value behind `handle`, or `None` when the handle is not anchored.
    pub fn deref(&self, handle: Handle) -> Option<Val> {
        if handle == Handle::NIL {
            return Some(Val::Nil);
        }
        match self.slots.get(handle.slot()?) {
            Some(RefSlot::Anchored { value, .. }) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn anchor(&self, handle: Handle) -> Option<Anchor> {
        match self.slots.get(handle.slot()?) {
            Some(RefSlot::Anchored { anchor, .. }) => Some(*anchor),
            _ => None,
        }
    }

    /// Slots ever allocated, free ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Handles currently anchored.
    #[inline]
    pub fn anchored(&self) -> usize {
        self.anchored
    }

    /// Every anchored value; these are collection roots.
    pub fn roots(&self) -> impl Iterator<Item = &Val> {
        self.slots.iter().filter_map(|slot| match slot {
            RefSlot::Anchored { value, .. } => Some(value),
            RefSlot::Free { .. } => None,
        })
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free = None;
        self.anchored = 0;
    }
}
