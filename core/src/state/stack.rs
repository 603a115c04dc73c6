//! Index resolution and stack-window manipulation.
//!
//! Host indices are 1-based offsets from the frame base when positive and
//! offsets from the top when negative (`-1` is the topmost value). Zero is
//! never valid.

use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::val::Val;

use super::State;

impl State {
    /// First slot of the running call.
    #[inline]
    pub fn base(&self) -> usize {
        let _guard = self.enter();
        self.ci.base
    }

    /// Resolves an index that must name a live slot. Anything else is a
    /// contract violation.
    pub fn resolve_strict(&self, index: i32) -> usize {
        let _guard = self.enter();
        let used = self.top - self.ci.base;
        if index > 0 {
            let offset = index as usize;
            api_check!(offset <= used, "stack index {index} above top ({used} values)");
            self.ci.base + offset - 1
        } else {
            let depth = index.unsigned_abs() as usize;
            api_check!(
                index != 0 && depth <= used,
                "invalid stack index {index} ({used} values)"
            );
            self.top - depth
        }
    }

    /// Resolves an index leniently: a positive index within the stack
    /// capacity but at or above the top yields `None` instead of failing.
    pub fn resolve_acceptable(&self, index: i32) -> Option<usize> {
        let _guard = self.enter();
        if index > 0 {
            let slot = self.ci.base + index as usize - 1;
            api_check!(
                slot < self.stack.len(),
                "stack index {index} beyond stack capacity"
            );
            (slot < self.top).then_some(slot)
        } else {
            Some(self.resolve_strict(index))
        }
    }

    #[inline]
    pub(crate) fn slot(&self, index: i32) -> &Val {
        &self.stack[self.resolve_strict(index)]
    }

    #[inline]
    pub(crate) fn probe(&self, index: i32) -> Option<&Val> {
        self.resolve_acceptable(index).map(|slot| &self.stack[slot])
    }

    /// Number of values in the current frame.
    pub fn get_top(&self) -> usize {
        let _guard = self.enter();
        self.top - self.ci.base
    }

    /// Free slots between the top and the end of the stack.
    pub fn stack_space(&self) -> usize {
        let _guard = self.enter();
        self.stack.len() - self.top
    }

    /// Makes room for `extra` more pushes.
    pub fn check_stack(&mut self, extra: usize) -> ApiResult<()> {
        let _guard = self.enter();
        let needed = self.top.checked_add(extra).ok_or(ApiError::CapacityExhausted("stack"))?;
        self.ensure_capacity(needed)
    }

    /// With `index >= 0` the frame gets exactly `index` values, padding with
    /// nil or discarding from the top. A negative index removes values so
    /// that the slot it named becomes the new top value.
    pub fn set_top(&mut self, index: i32) -> ApiResult<()> {
        let _guard = self.enter();
        if index >= 0 {
            let new_top = self.ci.base + index as usize;
            if new_top > self.top {
                self.ensure_capacity(new_top)?;
                self.stack[self.top..new_top].fill(Val::Nil);
                self.top = new_top;
            } else {
                self.truncate_to(new_top);
            }
        } else {
            let discard = (index.unsigned_abs() - 1) as usize;
            let used = self.top - self.ci.base;
            api_check!(discard <= used, "set_top({index}) below frame base ({used} values)");
            self.truncate_to(self.top - discard);
        }
        Ok(())
    }

    /// Pops `n` values.
    pub fn pop(&mut self, n: usize) {
        let _guard = self.enter();
        let used = self.top - self.ci.base;
        api_check!(n <= used, "pop({n}) with only {used} values");
        self.truncate_to(self.top - n);
    }

    /// Moves the top value into `index`, shifting the values above it up.
    pub fn insert(&mut self, index: i32) {
        let _guard = self.enter();
        let slot = self.resolve_strict(index);
        self.stack[slot..self.top].rotate_right(1);
    }

    /// Removes the value at `index`, shifting the values above it down.
    pub fn remove(&mut self, index: i32) {
        let _guard = self.enter();
        let slot = self.resolve_strict(index);
        self.stack[slot..self.top].rotate_left(1);
        self.truncate_to(self.top - 1);
    }

    /// Pushes a copy of the value at `index`.
    pub fn push_value(&mut self, index: i32) {
        let _guard = self.enter();
        let val = self.slot(index).clone();
        self.push_raw(val);
    }

    /// Writes `val` at the top. The host must have reserved the slot.
    pub(crate) fn push_raw(&mut self, val: Val) {
        api_check!(
            self.top < self.stack.len(),
            "stack overflow: push without check_stack ({} slots)",
            self.stack.len()
        );
        self.stack[self.top] = val;
        self.top += 1;
    }

    /// Removes and returns the top value.
    pub(crate) fn pop_raw(&mut self) -> Val {
        api_check!(self.top > self.ci.base, "pop from an empty frame");
        self.top -= 1;
        std::mem::take(&mut self.stack[self.top])
    }

    /// Lowers the top, clearing the abandoned slots so they hold no references.
    pub(crate) fn truncate_to(&mut self, new_top: usize) {
        if new_top < self.top {
            self.stack[new_top..self.top].fill(Val::Nil);
            self.top = new_top;
        }
    }

    /// Grows the stack so that slot `needed - 1` exists.
    pub(crate) fn ensure_capacity(&mut self, needed: usize) -> ApiResult<()> {
        if needed <= self.stack.len() {
            return Ok(());
        }
        if needed > self.config.max_stack {
            warn!(
                target: "tagvm::state",
                needed,
                max = self.config.max_stack,
                "stack.overflow"
            );
            return Err(ApiError::CapacityExhausted("stack"));
        }
        let new_len = needed.max(self.stack.len() * 2).min(self.config.max_stack);
        self.stack.resize(new_len, Val::Nil);
        Ok(())
    }
}
