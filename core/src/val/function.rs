use std::{fmt, mem};

use crate::state::State;

use super::Val;

/// Host function callable from the VM. It finds its arguments at indices
/// `1..=n` of its own frame, followed by the values captured when it was
/// pushed, and returns how many values from the top of the stack are its
/// results.
pub type NativeFn = fn(&mut State) -> anyhow::Result<usize>;

/// A native function plus the values it captured.
pub struct Closure {
    function: NativeFn,
    captured: Box<[Val]>,
}

impl Closure {
    pub fn new(function: NativeFn, captured: Vec<Val>) -> Self {
        Self {
            function,
            captured: captured.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn function(&self) -> NativeFn {
        self.function
    }

    #[inline]
    pub fn captured(&self) -> &[Val] {
        &self.captured
    }

    pub(crate) fn heap_size(&self) -> usize {
        mem::size_of::<Self>() + self.captured.len() * mem::size_of::<Val>()
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("function", &(self.function as usize as *const ()))
            .field("captured", &self.captured.len())
            .finish()
    }
}
