use std::{cell::Cell, rc::Rc};

/// Reentrancy lock shared by every boundary operation of one state.
///
/// The VM is single threaded: the lock does not block, it records how many
/// operations are open so nested calls made by native functions stay on one
/// serialized call chain.
#[derive(Debug, Default)]
pub(crate) struct ApiLock {
    depth: Cell<usize>,
}

impl ApiLock {
    pub(crate) fn enter(self: &Rc<Self>) -> ApiGuard {
        self.depth.set(self.depth.get() + 1);
        ApiGuard { lock: Rc::clone(self) }
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth.get()
    }
}

/// Held for the duration of one operation; released on every exit path.
pub(crate) struct ApiGuard {
    lock: Rc<ApiLock>,
}

impl Drop for ApiGuard {
    fn drop(&mut self) {
        self.lock.depth.set(self.lock.depth.get() - 1);
    }
}
