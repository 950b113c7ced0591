//! Append-only activity history for estates.
//!
//! Two services sit on top of an injected [`storage::ActivityStore`]:
//!
//! - [`AuditLogger`] validates a [`NewActivity`], stamps it with an id and
//!   the server time, and appends it as one immutable record. It has no
//!   update or delete.
//! - [`ActivityQuery`] pages through an estate's records newest first,
//!   ordered by `(created_at, id)`, optionally narrowed by kind and action.
//!
//! Logging is decoupled from the change it describes. Callers perform their
//! own mutation first and append afterwards; an append that fails on the
//! store comes back with [`Error::is_warning`] set, and the caller may carry
//! on without the history entry.
//!
//! ```no_run
//! use std::sync::Arc;
//! use audit::{ActivityQuery, AuditLogger, NewActivity};
//! use storage::{ActivityFilter, ActivityKind, SqliteStore};
//!
//! let store = Arc::new(SqliteStore::open("estates.db")?);
//! let logger = AuditLogger::new(store.clone());
//! let query = ActivityQuery::new(store);
//!
//! let entry = NewActivity::new(
//!     "estate-1",
//!     "alice",
//!     ActivityKind::Invoice,
//!     "created",
//!     "inv-7",
//!     "Invoice #7 added",
//! );
//! if let Err(e) = logger.append(entry) {
//!     if !e.is_warning() {
//!         return Err(e.into());
//!     }
//! }
//!
//! let page = query.list(&"estate-1".into(), &ActivityFilter::default(), None, 20)?;
//! for record in &page.records {
//!     println!("{} {}", record.created_at, record.message);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod clock;
mod error;
mod logger;
mod query;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result, ValidationError};
pub use logger::{AuditLogger, NewActivity};
pub use query::{ActivityPage, ActivityQuery, DEFAULT_MAX_LIMIT};
