//! Persistence for estate access projections and the estate activity log.
//!
//! This crate owns the record types of the activity history and the two
//! narrow store contracts the access and audit services are built on.
//!
//! # Core Concepts
//!
//! ## Stores
//!
//! - [`EstateStore`] reads the [`EstateAccess`] projection of an estate: its
//!   owner and its ordered collaborator list, nothing else.
//! - [`ActivityStore`] appends [`ActivityRecord`]s and pages through them in
//!   descending `(created_at, id)` order. It has no update or delete.
//!
//! [`SqliteStore`] implements both against one SQLite database.
//! [`MemoryEstateStore`] and [`MemoryActivityStore`] are in-memory fakes.
//!
//! ## ActivityRecord
//!
//! An immutable entry describing one change to an estate sub-resource:
//! - A [`ActivityId`] (UUIDv7, breaks timestamp ties)
//! - The estate and its owner at logging time
//! - An [`ActivityKind`] (`invoice`, `document`, `task`, `note`) and an action verb
//! - A caller-built message and an optional opaque snapshot
//! - A microsecond-precision `created_at`
//!
//! ## Cursor
//!
//! A [`Cursor`] marks the last `(created_at, id)` pair a client has seen.
//! Records inserted above it never shift later pages.
//!
//! # Example
//!
//! ```no_run
//! use storage::{ActivityFilter, ActivityStore, EstateStore, SqliteStore};
//!
//! let store = SqliteStore::open("estates.db")?;
//! store.create_estate(&"estate-1".into(), &"alice".into())?;
//! store.put_collaborator(&"estate-1".into(), &"bob".into(), "EDITOR")?;
//!
//! let access = store.fetch_access_projection(&"estate-1".into())?;
//! println!("{access:?}");
//!
//! let page = store.query(&"estate-1".into(), &ActivityFilter::default(), None, 20)?;
//! for record in page {
//!     println!("{}: {}", record.created_at, record.message);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod cursor;
mod error;
mod estate;
mod memory;
mod record;
mod store;

pub use cursor::{Cursor, InvalidCursor};
pub use error::{Error, Result};
pub use estate::{Collaborator, EstateAccess};
pub use memory::{MemoryActivityStore, MemoryEstateStore};
pub use record::{
    ActivityFilter, ActivityId, ActivityKind, ActivityRecord, EstateId, UnknownKind, UserId,
};
pub use store::{ActivityStore, EstateStore, SqliteStore};
