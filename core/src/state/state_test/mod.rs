pub(super) use std::rc::Rc;

pub(super) use crate::{
    ApiError, Handle, State, StateConfig, TagEvent, TagId, Type,
    refs::Anchor,
};

pub(super) fn new_state() -> State {
    State::with_defaults()
}

/// Pushes `values` as numbers.
pub(super) fn push_numbers(state: &mut State, values: &[f64]) {
    for n in values {
        state.push_number(*n);
    }
}

mod gc;
mod refs;
mod stack;
mod tables;
mod values;
