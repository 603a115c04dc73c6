//! Call dispatch, the protective boundary and string concatenation.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{ApiError, ApiResult};
use crate::tags::TagEvent;
use crate::val::{Closure, Val, format_number};

use super::{CallInfo, State};

impl State {
    /// Calls the function sitting below the top `nargs` values. The function
    /// and its arguments are replaced by its results, adjusted to `nresults`
    /// values (`None` keeps them all). Errors unwind to the caller.
    pub fn call(&mut self, nargs: usize, nresults: Option<usize>) -> ApiResult<()> {
        let _guard = self.enter();
        let used = self.top - self.ci.base;
        api_check!(nargs < used, "call needs a function and {nargs} arguments, frame holds {used}");
        let func = self.top - nargs - 1;
        self.dispatch(func, nresults)
    }

    /// Like [`State::call`], but on error the function and its arguments are
    /// removed and the frame is left as it was below them.
    pub fn pcall(&mut self, nargs: usize, nresults: Option<usize>) -> ApiResult<()> {
        let _guard = self.enter();
        let used = self.top - self.ci.base;
        api_check!(nargs < used, "pcall needs a function and {nargs} arguments, frame holds {used}");
        let func = self.top - nargs - 1;
        let saved_ci = self.ci;
        let saved_frames = self.frames.len();
        match self.dispatch(func, nresults) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.ci = saved_ci;
                self.frames.truncate(saved_frames);
                self.truncate_to(func);
                debug!(target: "tagvm::call", error = %err, "call.unwound");
                Err(err)
            }
        }
    }

    /// Error for a native function to return.
    pub fn raise(&self, message: impl Into<String>) -> ApiError {
        ApiError::Runtime(message.into())
    }

    fn dispatch(&mut self, func: usize, nresults: Option<usize>) -> ApiResult<()> {
        let closure = match &self.stack[func] {
            Val::Function(closure) => Rc::clone(closure),
            other => {
                let handler = self.tags.method(self.tag_of_val(other), TagEvent::Function);
                if handler.is_nil() {
                    return Err(ApiError::Runtime(format!(
                        "attempt to call a {} value",
                        other.type_of()
                    )));
                }
                // the handler is called with the original callee as first argument
                self.ensure_capacity(self.top + 1)?;
                self.stack[self.top] = handler;
                self.top += 1;
                self.stack[func..self.top].rotate_right(1);
                return self.dispatch(func, nresults);
            }
        };

        if self.frames.len() >= self.config.max_native_depth {
            return Err(ApiError::CapacityExhausted("native call depth"));
        }
        let caller = self.ci;
        self.frames.push(caller);
        self.ci = CallInfo { base: func + 1 };
        let outcome = self.invoke(&closure);
        self.frames.pop();
        self.ci = caller;
        let n = outcome?;

        let first = self.top - n;
        for i in 0..n {
            self.stack[func + i] = std::mem::take(&mut self.stack[first + i]);
        }
        self.truncate_to(func + n);
        if let Some(wanted) = nresults
            && wanted != n
        {
            if wanted > n {
                self.ensure_capacity(func + wanted)?;
                self.stack[func + n..func + wanted].fill(Val::Nil);
                self.top = func + wanted;
            } else {
                self.truncate_to(func + wanted);
            }
        }
        Ok(())
    }

    /// Runs a native inside the frame already set up for it; returns how many
    /// results it left on top.
    fn invoke(&mut self, closure: &Closure) -> ApiResult<usize> {
        let captured = closure.captured();
        self.ensure_capacity(self.top + captured.len() + self.config.min_stack)?;
        for val in captured {
            self.push_raw(val.clone());
        }
        trace!(
            target: "tagvm::call",
            depth = self.frames.len(),
            args = self.top - self.ci.base,
            "call.native"
        );
        let n = (closure.function())(self).map_err(ApiError::from_native)?;
        let available = self.top - self.ci.base;
        api_check!(n <= available, "native returned {n} results but its frame holds {available}");
        Ok(n)
    }

    /// Calls `handler` with `args` and returns its single result.
    /// On error the stack is restored to where it was before the call.
    pub(crate) fn call_tag_method(&mut self, handler: Val, args: &[Val]) -> ApiResult<Val> {
        let saved_top = self.top;
        self.ensure_capacity(self.top + args.len() + 1)?;
        self.push_raw(handler);
        for arg in args {
            self.push_raw(arg.clone());
        }
        match self.call(args.len(), Some(1)) {
            Ok(()) => Ok(self.pop_raw()),
            Err(err) => {
                self.truncate_to(saved_top);
                Err(err)
            }
        }
    }

    /// Concatenates the top `n` values into one string. Strings and numbers
    /// join directly; any other operand goes through the `concat` tag method.
    /// `n == 0` pushes the empty string and `n == 1` leaves the stack alone.
    pub fn concat(&mut self, n: usize) -> ApiResult<()> {
        let _guard = self.enter();
        let used = self.top - self.ci.base;
        api_check!(n <= used, "concat of {n} values, frame holds {used}");
        match n {
            0 => {
                let empty = self.intern(b"");
                self.push_raw(Val::Str(empty));
            }
            1 => return Ok(()),
            _ => self.concat_values(n)?,
        }
        self.check_gc();
        Ok(())
    }

    fn concat_values(&mut self, mut total: usize) -> ApiResult<()> {
        while total > 1 {
            let top = self.top;
            let (lhs, rhs) = (&self.stack[top - 2], &self.stack[top - 1]);
            if !(lhs.is_string_like() && rhs.is_string_like()) {
                let mut handler = self.tags.method(self.tag_of_val(lhs), TagEvent::Concat);
                if handler.is_nil() {
                    handler = self.tags.method(self.tag_of_val(rhs), TagEvent::Concat);
                }
                if handler.is_nil() {
                    let offender = if lhs.is_string_like() { rhs } else { lhs };
                    return Err(ApiError::Runtime(format!(
                        "attempt to concat a {} value",
                        offender.type_of()
                    )));
                }
                let args = [lhs.clone(), rhs.clone()];
                let joined = self.call_tag_method(handler, &args)?;
                self.stack[top - 2] = joined;
                self.truncate_to(top - 1);
                total -= 1;
                continue;
            }

            // join the longest run of string-like values ending at the top
            let mut run = 2;
            while run < total && self.stack[top - run - 1].is_string_like() {
                run += 1;
            }
            let mut bytes = Vec::new();
            for val in &self.stack[top - run..top] {
                match val {
                    Val::Str(s) => bytes.extend_from_slice(s.as_bytes()),
                    Val::Number(n) => bytes.extend_from_slice(format_number(*n).as_bytes()),
                    _ => unreachable!("run holds only strings and numbers"),
                }
            }
            let joined = self.intern(&bytes);
            self.stack[top - run] = Val::Str(joined);
            self.truncate_to(top - run + 1);
            total -= run - 1;
        }
        Ok(())
    }
}
