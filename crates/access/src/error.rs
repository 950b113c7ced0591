//! Access error types.

use thiserror::Error;

/// Access errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller holds no usable grant on the estate, or the estate does
    /// not exist. The two are deliberately indistinguishable.
    #[error("access denied")]
    Forbidden,

    /// The estate store could not answer. Never treated as a grant.
    #[error("estate store unavailable: {0}")]
    StoreUnavailable(#[from] storage::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
