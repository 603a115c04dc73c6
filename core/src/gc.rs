//! Collection threshold accounting and the collector hook.
//!
//! Heap objects are reference counted. The collector traces what is
//! reachable from the roots, empties unreachable tables so reference cycles
//! through them fall apart, forgets objects that are already gone and
//! recomputes the live estimate.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::val::{Closure, Interner, Table, TableRef, UserData, Val};

const KB_SHIFT: u32 = 10;

/// Threshold and live-volume counters, kept in bytes and exposed in kilobytes.
#[derive(Debug, Clone)]
pub struct GcController {
    threshold: usize,
    live: usize,
    cycles: u64,
}

impl GcController {
    pub fn new(threshold_kb: usize) -> Self {
        let mut gc = Self {
            threshold: 0,
            live: 0,
            cycles: 0,
        };
        gc.set_threshold_kb(threshold_kb);
        gc
    }

    #[inline]
    pub fn threshold_kb(&self) -> usize {
        self.threshold >> KB_SHIFT
    }

    /// Values whose byte count does not fit clamp to the largest threshold.
    pub fn set_threshold_kb(&mut self, kb: usize) {
        self.threshold = kb.checked_mul(1 << KB_SHIFT).unwrap_or(usize::MAX);
    }

    #[inline]
    pub fn live_kb(&self) -> usize {
        self.live >> KB_SHIFT
    }

    #[inline]
    pub fn threshold_bytes(&self) -> usize {
        self.threshold
    }

    #[inline]
    pub fn live_bytes(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    #[inline]
    pub fn note_alloc(&mut self, bytes: usize) {
        self.live = self.live.saturating_add(bytes);
    }

    #[inline]
    pub fn should_collect(&self) -> bool {
        self.live >= self.threshold
    }

    /// Records a finished cycle; the next one triggers once the live volume doubles.
    pub fn finish_cycle(&mut self, live: usize) {
        self.live = live;
        self.threshold = live.saturating_mul(2);
        self.cycles += 1;
    }
}

/// Weak index of every heap object the VM allocated.
#[derive(Debug, Default)]
pub struct Heap {
    tables: Vec<Weak<RefCell<Table>>>,
    userdata: Vec<Weak<UserData>>,
    closures: Vec<Weak<Closure>>,
    host_userdata: FxHashMap<usize, Weak<UserData>>,
}

impl Heap {
    pub fn track_table(&mut self, table: &TableRef) -> usize {
        self.tables.push(Rc::downgrade(table));
        table.borrow().heap_size()
    }

    pub fn track_userdata(&mut self, udata: &Rc<UserData>) -> usize {
        self.userdata.push(Rc::downgrade(udata));
        udata.heap_size()
    }

    pub fn track_closure(&mut self, closure: &Rc<Closure>) -> usize {
        self.closures.push(Rc::downgrade(closure));
        closure.heap_size()
    }

    /// Userdata already created for the host value at `key`.
    pub fn host_userdata(&self, key: usize) -> Option<Rc<UserData>> {
        self.host_userdata.get(&key).and_then(Weak::upgrade)
    }

    pub fn remember_host_userdata(&mut self, key: usize, udata: &Rc<UserData>) {
        self.host_userdata.insert(key, Rc::downgrade(udata));
    }

    pub fn objects(&self) -> usize {
        self.tables.len() + self.userdata.len() + self.closures.len()
    }

    /// Empties every table still alive. Used when the owning state shuts down.
    pub(crate) fn release_all(&mut self) {
        for table in self.tables.drain(..).filter_map(|weak| weak.upgrade()) {
            table.borrow_mut().clear();
        }
        self.userdata.clear();
        self.closures.clear();
        self.host_userdata.clear();
    }
}

#[derive(Default)]
struct Marker {
    seen: FxHashSet<usize>,
    pending: Vec<Val>,
}

impl Marker {
    fn mark(&mut self, val: &Val) {
        if let Some(id) = val.identity()
            && self.seen.insert(id)
        {
            self.pending.push(val.clone());
        }
    }

    fn propagate(&mut self) {
        while let Some(val) = self.pending.pop() {
            match val {
                Val::Table(table) => {
                    let table = table.borrow();
                    for (key, value) in table.iter() {
                        self.mark(key);
                        self.mark(value);
                    }
                }
                Val::Function(closure) => {
                    for captured in closure.captured() {
                        self.mark(captured);
                    }
                }
                _ => {}
            }
        }
    }

    fn reached<T>(&self, obj: &Rc<T>) -> bool {
        self.seen.contains(&(Rc::as_ptr(obj) as *const () as usize))
    }
}

/// Runs one collection cycle and returns the bytes still live.
pub fn collect<'a>(heap: &mut Heap, strings: &mut Interner, roots: impl IntoIterator<Item = &'a Val>) -> usize {
    let mut marker = Marker::default();
    for root in roots {
        marker.mark(root);
    }
    marker.propagate();

    let before = heap.objects();
    let mut cleared = 0usize;
    for table in heap.tables.iter().filter_map(Weak::upgrade) {
        if !marker.reached(&table) {
            table.borrow_mut().clear();
            cleared += 1;
        }
    }
    drop(marker);

    let mut live = 0usize;
    heap.tables.retain(|weak| match weak.upgrade() {
        Some(table) => {
            live += table.borrow().heap_size();
            true
        }
        None => false,
    });
    heap.userdata.retain(|weak| match weak.upgrade() {
        Some(udata) => {
            live += udata.heap_size();
            true
        }
        None => false,
    });
    heap.closures.retain(|weak| match weak.upgrade() {
        Some(closure) => {
            live += closure.heap_size();
            true
        }
        None => false,
    });
    heap.host_userdata.retain(|_, weak| weak.strong_count() > 0);

    let freed_strings = strings.prune();
    live += strings.bytes();

    debug!(
        target: "tagvm::gc",
        objects_before = before,
        objects_after = heap.objects(),
        cleared_tables = cleared,
        freed_string_bytes = freed_strings,
        live_bytes = live,
        "gc.collect"
    );
    live
}
