//! Estate access control.
//!
//! Core principle: **every request touching an estate resolves access first.**
//!
//! The [`AccessResolver`] reads the owner and collaborator list of an estate
//! and turns the caller's identity into an [`Access`]: an effective [`Role`]
//! plus the [`Capabilities`] that role carries. [`capabilities_for`] is the
//! policy table behind it.
//!
//! Resolution follows a fixed precedence:
//!
//! 1. The estate owner is always [`Role::Owner`].
//! 2. Otherwise the first collaborator row for the caller decides.
//! 3. No row, or a role string that is not exactly `OWNER`, `EDITOR` or
//!    `VIEWER`, means no access at all.
//!
//! ```no_run
//! use std::sync::Arc;
//! use access::AccessResolver;
//! use storage::SqliteStore;
//!
//! let store = Arc::new(SqliteStore::open("estates.db")?);
//! let resolver = AccessResolver::new(store);
//!
//! let access = resolver.require_access(&"estate-1".into(), &"bob".into())?;
//! access.require_edit()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod resolver;
mod role;

pub use error::{Error, Result};
pub use resolver::{Access, AccessResolver};
pub use role::{Capabilities, Role, capabilities_for};
