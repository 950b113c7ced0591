//! Audit error types.

use storage::{InvalidCursor, UnknownKind};
use thiserror::Error;

/// Input rejected before anything touched the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error(transparent)]
    UnknownKind(#[from] UnknownKind),

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error(transparent)]
    InvalidCursor(#[from] InvalidCursor),

    #[error("page limit must be at least 1")]
    ZeroLimit,
}

/// Audit errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid activity input: {0}")]
    Validation(#[from] ValidationError),

    /// The activity store failed. When `warning` is set the failure came
    /// from an append, and the change it describes already happened.
    #[error("activity store unavailable: {source}")]
    StoreUnavailable {
        #[source]
        source: storage::Error,
        warning: bool,
    },
}

impl Error {
    pub(crate) fn append_failed(source: storage::Error) -> Self {
        Error::StoreUnavailable {
            source,
            warning: true,
        }
    }

    pub(crate) fn read_failed(source: storage::Error) -> Self {
        Error::StoreUnavailable {
            source,
            warning: false,
        }
    }

    /// Whether the caller may carry on without the history entry.
    pub fn is_warning(&self) -> bool {
        matches!(self, Error::StoreUnavailable { warning: true, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
