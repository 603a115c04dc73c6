use crate::error::ApiResult;
use crate::refs::{Anchor, Handle, RefTable};

use super::State;

impl State {
    /// Pops the top value and anchors it in the reference table. `lock`
    /// selects [`Anchor::Locked`] over [`Anchor::Held`].
    pub fn create_ref(&mut self, lock: bool) -> ApiResult<Handle> {
        let _guard = self.enter();
        let value = self.slot(-1).clone();
        let handle = self.refs.alloc(value, lock)?;
        self.truncate_to(self.top - 1);
        Ok(handle)
    }

    /// Pushes the value behind `handle` and returns true, or returns false
    /// and pushes nothing when the handle is not anchored.
    pub fn get_ref(&mut self, handle: Handle) -> bool {
        let _guard = self.enter();
        match self.refs.deref(handle) {
            Some(value) => {
                self.push_raw(value);
                true
            }
            None => false,
        }
    }

    /// Releases `handle`. The handle must be anchored (or negative).
    pub fn release_ref(&mut self, handle: Handle) {
        let _guard = self.enter();
        self.refs.release(handle);
    }

    pub fn ref_anchor(&self, handle: Handle) -> Option<Anchor> {
        let _guard = self.enter();
        self.refs.anchor(handle)
    }

    pub fn ref_table(&self) -> &RefTable {
        let _guard = self.enter();
        &self.refs
    }
}
