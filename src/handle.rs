use crate::context::Context;
use crate::error::Result;
use crate::scan::Slot;
use crate::value::Value;
use std::sync::Arc;

/// Summary of a statement executed for its side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    rows_affected: u64,
    last_insert_id: i64,
}

impl ExecResult {
    pub fn new(rows_affected: u64, last_insert_id: i64) -> Self {
        Self {
            rows_affected,
            last_insert_id,
        }
    }

    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    pub fn last_insert_id(&self) -> i64 {
        self.last_insert_id
    }
}

/// Forward-only cursor over the rows of a multi-row query.
pub trait RowCursor {
    fn columns(&self) -> &[String];

    /// Advance to the next row. Returns false when exhausted, closed or failed;
    /// check [`RowCursor::err`] to tell them apart.
    fn next(&mut self) -> bool;

    /// Scan the current row into `slots`.
    fn scan(&mut self, slots: &mut [Slot<'_>]) -> Result<()>;

    /// Release the cursor. Safe to call more than once.
    fn close(&mut self) -> Result<()>;

    /// The error that ended iteration, if any.
    fn err(&mut self) -> Result<()>;
}

/// Result of a single-row query. Query failures are deferred to [`SingleRow::scan`].
pub trait SingleRow {
    fn scan(&mut self, slots: &mut [Slot<'_>]) -> Result<()>;

    fn err(&mut self) -> Result<()>;
}

/// Anything able to run SQL: a connection, a transaction, a shared connection.
pub trait DbHandle {
    type Statement;
    type Rows: RowCursor;
    type Row: SingleRow;

    fn exec(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<ExecResult>;

    fn prepare(&self, ctx: &Context, sql: &str) -> Result<Self::Statement>;

    fn query(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<Self::Rows>;

    fn query_row(&self, ctx: &Context, sql: &str, args: &[Value]) -> Self::Row;
}

macro_rules! forward_handle {
    ($($wrapper:ty),*) => {
        $(
            impl<H: DbHandle + ?Sized> DbHandle for $wrapper {
                type Statement = H::Statement;
                type Rows = H::Rows;
                type Row = H::Row;

                fn exec(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<ExecResult> {
                    (**self).exec(ctx, sql, args)
                }

                fn prepare(&self, ctx: &Context, sql: &str) -> Result<Self::Statement> {
                    (**self).prepare(ctx, sql)
                }

                fn query(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<Self::Rows> {
                    (**self).query(ctx, sql, args)
                }

                fn query_row(&self, ctx: &Context, sql: &str, args: &[Value]) -> Self::Row {
                    (**self).query_row(ctx, sql, args)
                }
            }
        )*
    };
}

forward_handle!(&H, Box<H>, Arc<H>);
