//! The embedding context.
//!
//! A [`State`] owns everything the host talks to: the value stack and its
//! call frames, the reference table, the tag registry, the string pool and
//! the collector accounting. Host code creates one with [`State::new`] and
//! destroys it with [`State::close`] (or by dropping it).

use std::{cell::RefCell, fmt, rc::Rc};

use tracing::debug;

use crate::config::StateConfig;
use crate::gc::{GcController, Heap};
use crate::refs::RefTable;
use crate::tags::{TagId, TagRegistry};
use crate::val::{Interner, Str, Table, TableRef, Val};

mod access;
mod call;
mod gc;
mod guard;
mod push;
mod refs;
mod stack;
mod table;
mod tags;

#[cfg(test)]
mod state_test;

use guard::{ApiGuard, ApiLock};

/// Window of the stack visible to the running call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallInfo {
    pub(crate) base: usize,
}

pub struct State {
    stack: Vec<Val>,
    top: usize,
    ci: CallInfo,
    frames: Vec<CallInfo>,
    refs: RefTable,
    tags: TagRegistry,
    strings: Interner,
    heap: Heap,
    gc: GcController,
    globals: TableRef,
    config: StateConfig,
    lock: Rc<ApiLock>,
    n_key: Str,
}

impl State {
    pub fn new(config: StateConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let mut strings = Interner::new();
        let (n_key, _) = strings.intern(b"n");
        let mut heap = Heap::default();
        let globals = Rc::new(RefCell::new(Table::new(TagId::TABLE)));
        let globals_size = heap.track_table(&globals);
        let mut gc = GcController::new(config.initial_gc_threshold_kb);
        gc.note_alloc(globals_size + strings.bytes());

        let state = Self {
            stack: vec![Val::Nil; config.initial_stack],
            top: 0,
            ci: CallInfo { base: 0 },
            frames: Vec::new(),
            refs: RefTable::new(config.max_refs),
            tags: TagRegistry::new(),
            strings,
            heap,
            gc,
            globals,
            config,
            lock: Rc::new(ApiLock::default()),
            n_key,
        };
        debug!(
            target: "tagvm::state",
            stack = state.stack.len(),
            tags = state.tags.len(),
            "state.new"
        );
        Ok(state)
    }

    pub fn with_defaults() -> Self {
        match Self::new(StateConfig::default()) {
            Ok(state) => state,
            Err(err) => unreachable!("default configuration is valid: {err}"),
        }
    }

    /// Destroys the state, releasing every anchored handle and breaking
    /// reference cycles between its tables.
    pub fn close(self) {
        debug!(
            target: "tagvm::state",
            anchored = self.refs.anchored(),
            collections = self.gc.cycles(),
            "state.close"
        );
    }

    pub fn config(&self) -> &StateConfig {
        let _guard = self.enter();
        &self.config
    }

    /// Number of boundary operations currently open on this state. Native
    /// functions run inside the `call` that invoked them, so this counts
    /// the nesting of the active call chain.
    pub fn api_depth(&self) -> usize {
        self.lock.depth()
    }

    /// Depth of nested native calls.
    pub fn call_depth(&self) -> usize {
        let _guard = self.enter();
        self.frames.len()
    }

    #[inline]
    fn enter(&self) -> ApiGuard {
        self.lock.enter()
    }

    /// Heap accounting for a new object, followed by a collection check.
    fn note_alloc(&mut self, bytes: usize) {
        self.gc.note_alloc(bytes);
        self.check_gc();
    }

    /// Interns `bytes`, accounting new strings. The caller runs the
    /// collection check once the string is on the stack.
    fn intern(&mut self, bytes: &[u8]) -> Str {
        let (s, fresh) = self.strings.intern(bytes);
        self.gc.note_alloc(fresh);
        s
    }
}

impl Drop for State {
    fn drop(&mut self) {
        self.stack.clear();
        self.refs.clear();
        self.tags.clear_methods();
        self.globals.borrow_mut().clear();
        self.heap.release_all();
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("base", &self.ci.base)
            .field("top", &self.top)
            .field("stack_last", &self.stack.len())
            .field("frames", &self.frames.len())
            .field("refs", &self.refs.anchored())
            .field("tags", &self.tags.len())
            .field("gc", &self.gc)
            .finish()
    }
}
