//! Host embedding layer for the tagvm scripting VM.
//!
//! The host talks to the VM through a [`State`]: an indexed value stack, a
//! reference table of stable handles, a registry of named tags and the
//! garbage-collection threshold controls.

#[macro_use]
mod macros;

pub mod config;
pub mod error;
pub mod gc;
pub mod refs;
pub mod state;
pub mod tags;
pub mod val;

pub use config::StateConfig;
pub use error::{ApiError, ApiResult};
pub use refs::{Anchor, Handle, RefTable};
pub use state::State;
pub use tags::{TagEvent, TagId, TagRegistry};
pub use val::{NativeFn, Type, Val};
