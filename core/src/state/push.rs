//! Typed pushes from the host onto the stack. Every push needs a reserved
//! slot (see [`State::check_stack`]); allocating pushes run the collection
//! check once the new value sits on the stack.

use std::{any::Any, rc::Rc};

use crate::error::ApiResult;
use crate::tags::TagId;
use crate::val::{Closure, NativeFn, UserData, Val};

use super::State;

impl State {
    pub fn push_nil(&mut self) {
        let _guard = self.enter();
        self.push_raw(Val::Nil);
    }

    pub fn push_number(&mut self, n: f64) {
        let _guard = self.enter();
        self.push_raw(Val::Number(n));
    }

    /// Pushes an interned copy of `bytes`.
    pub fn push_string(&mut self, bytes: impl AsRef<[u8]>) {
        let _guard = self.enter();
        let s = self.intern(bytes.as_ref());
        self.push_raw(Val::Str(s));
        self.check_gc();
    }

    /// Pops `n_captured` values and pushes a function that carries them.
    pub fn push_native_function(&mut self, function: NativeFn, n_captured: usize) {
        let _guard = self.enter();
        let used = self.top - self.ci.base;
        api_check!(
            n_captured <= used,
            "closure captures {n_captured} values but the frame holds {used}"
        );
        let first = self.top - n_captured;
        let captured = self.stack[first..self.top].iter_mut().map(std::mem::take).collect();
        self.truncate_to(first);

        let closure = Rc::new(Closure::new(function, captured));
        let size = self.heap.track_closure(&closure);
        self.push_raw(Val::Function(closure));
        self.note_alloc(size);
    }

    /// Pushes the userdata wrapping `value`. Pushing the same host value again
    /// yields the same userdata; the result tells whether a new one was made.
    pub fn push_userdata(&mut self, value: Rc<dyn Any>) -> bool {
        let _guard = self.enter();
        let key = UserData::host_key(&value);
        if let Some(existing) = self.heap.host_userdata(key) {
            self.push_raw(Val::UserData(existing));
            return false;
        }
        let udata = Rc::new(UserData::with_host(value, TagId::USERDATA));
        self.heap.remember_host_userdata(key, &udata);
        let size = self.heap.track_userdata(&udata);
        self.push_raw(Val::UserData(Rc::clone(&udata)));
        self.note_alloc(size);
        true
    }

    /// Pushes a new zeroed buffer userdata of `size` bytes (at least one) and
    /// returns it. Nothing is pushed when the buffer cannot be allocated.
    pub fn new_userdata(&mut self, size: usize) -> ApiResult<Rc<UserData>> {
        let _guard = self.enter();
        let udata = Rc::new(UserData::with_buffer(size, TagId::USERDATA)?);
        let bytes = self.heap.track_userdata(&udata);
        self.push_raw(Val::UserData(Rc::clone(&udata)));
        self.note_alloc(bytes);
        Ok(udata)
    }
}
