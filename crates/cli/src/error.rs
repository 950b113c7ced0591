//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The database file does not exist.
    ///
    /// This typically means no estate has been created yet.
    #[error("database not found at {path}. Run 'estates estate create' first")]
    DatabaseNotFound { path: PathBuf },

    /// The role given on the command line is not one of OWNER, EDITOR, VIEWER.
    #[error("unknown role '{0}', expected EDITOR or VIEWER")]
    InvalidRole(String),

    /// `--snapshot` was not valid JSON.
    #[error("snapshot is not valid JSON: {0}")]
    InvalidSnapshot(#[source] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred in the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// An error occurred while resolving access.
    #[error(transparent)]
    Access(#[from] access::Error),

    /// An error occurred in the audit layer.
    #[error(transparent)]
    Audit(#[from] audit::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
