use std::fmt;

use crate::val::Type;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced across the host boundary.
///
/// Introspective reads never produce these; they degrade to sentinels. The
/// structural and mutating operations return them to abort the current call
/// chain up to the nearest [`State::pcall`](crate::State::pcall).
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// A host index that does not name a live stack slot.
    OutOfRangeIndex(i32),
    /// A handle that is not anchored in the reference table.
    InvalidHandle(i32),
    /// A tag name that is already registered.
    TagConflict(String),
    /// A value of the wrong structural type for the operation.
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    /// A tag id that the registry never handed out.
    InvalidTag(u32),
    /// The stack, the reference table or the native call depth cannot grow.
    CapacityExhausted(&'static str),
    /// An error raised by a native function or a value operation.
    Runtime(String),
}

impl ApiError {
    pub(crate) fn type_mismatch(op: &'static str, expected: Type, found: Type) -> Self {
        ApiError::TypeMismatch {
            op,
            expected: expected.name(),
            found: found.name(),
        }
    }

    /// Recovers an [`ApiError`] that travelled through a native function as an
    /// `anyhow::Error`; anything else becomes a [`ApiError::Runtime`].
    pub fn from_native(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api) => api,
            Err(other) => ApiError::Runtime(format!("{other:#}")),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::OutOfRangeIndex(index) => write!(f, "stack index {index} is out of range"),
            ApiError::InvalidHandle(handle) => write!(f, "{handle} is not a valid reference"),
            ApiError::TagConflict(name) => write!(f, "type name '{name}' already exists"),
            ApiError::TypeMismatch { op, expected, found } => {
                write!(f, "{op}: expected a {expected} value, got {found}")
            }
            ApiError::InvalidTag(tag) => write!(f, "{tag} is not a valid tag"),
            ApiError::CapacityExhausted(what) => write!(f, "{what} overflow"),
            ApiError::Runtime(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for ApiError {}
