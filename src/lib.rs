//! Typed query execution over a generic SQL execution handle.
//!
//! # Intention
//!
//! - Run raw SQL through any [`DbHandle`] (a connection, a transaction, a shared
//!   connection) and map every row into a caller-chosen type.
//! - Result types declare their destination slots in column order through
//!   [`ScanTarget`]; there is no name-based column matching.
//! - Provide LIMIT/OFFSET pagination on top of plain queries.
//!
//! # Architectural Boundaries
//!
//! - Callers supply SQL text; this is not a query builder or an ORM.
//! - Handles are owned by the caller. Nothing here opens pools, commits or
//!   rolls back transactions.
//! - [`sqlite`] is the one bundled driver adapter.
//!
//! ```no_run
//! use rust_sqlquery::{args, Context, Querier, ScanTarget, Slot};
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl ScanTarget for User {
//!     fn fields(&mut self) -> Vec<Slot<'_>> {
//!         vec![Slot::new(&mut self.id), Slot::new(&mut self.name)]
//!     }
//! }
//!
//! # fn main() -> rust_sqlquery::Result<()> {
//! let conn = rusqlite::Connection::open_in_memory()?;
//! let users = Querier::<User, _>::new(&conn);
//! let ctx = Context::background();
//! let sql = "SELECT id, name FROM users WHERE age > ?";
//! let page = users.paginate_query(&ctx, 0, 10, sql, &args![18])?;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod handle;
pub mod querier;
pub mod scan;
pub mod sqlite;
pub mod value;

pub use context::Context;
pub use error::{Error, Result};
pub use handle::{DbHandle, ExecResult, RowCursor, SingleRow};
pub use querier::{paginate_sql, Querier};
pub use scan::{
    resolve, resolve_one, scan_values, Candidate, Resolve, ResolveError, ScanTarget, Slot,
};
pub use sqlite::{SqliteConfig, SqliteRow, SqliteRows, SqliteStatement};
pub use value::{ConversionError, FromValue, Value};
