use crate::context::Context;
use crate::error::{Error, Result};
use crate::handle::{DbHandle, RowCursor, SingleRow};
use crate::scan::{resolve_one, Resolve};
use crate::value::Value;
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Maps query results into `T`, one fresh `T::default()` per row.
///
/// The querier holds nothing but its handle; it can be shared across call
/// sites whenever the handle can.
pub struct Querier<T, H> {
    handle: H,
    _row: PhantomData<fn() -> T>,
}

impl<T, H: Clone> Clone for Querier<T, H> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            _row: PhantomData,
        }
    }
}

impl<T, H: fmt::Debug> fmt::Debug for Querier<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Querier")
            .field("row", &std::any::type_name::<T>())
            .field("handle", &self.handle)
            .finish()
    }
}

impl<T, H> Querier<T, H>
where
    T: Default + Resolve,
    H: DbHandle,
{
    pub fn new(handle: H) -> Self {
        Self {
            handle,
            _row: PhantomData,
        }
    }

    /// A querier for the same row type over another handle, typically a
    /// transaction opened on the original connection.
    pub fn with_tx<H2: DbHandle>(&self, handle: H2) -> Querier<T, H2> {
        Querier::new(handle)
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Scan the first row of `sql` into a `T`.
    ///
    /// Fails with [`Error::NoRows`] when nothing matches.
    pub fn query_one(&self, ctx: &Context, sql: &str) -> Result<T> {
        self.query_raw(ctx, sql, &[])
    }

    /// Like [`Querier::query_one`], with positional arguments.
    pub fn query_raw(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<T> {
        let mut row = self.handle.query_row(ctx, sql, args);
        let mut value = T::default();
        {
            let mut slots = resolve_one(&mut value)?;
            row.scan(&mut slots)?;
        }
        row.err()?;
        Ok(value)
    }

    /// Scan every row of `sql` into a `T`, in cursor order.
    ///
    /// Zero rows give an empty vector. Any scan failure discards the rows read
    /// so far. The cursor is closed on every path and close and iteration
    /// failures are both reported.
    pub fn query(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<Vec<T>> {
        let mut rows = self.handle.query(ctx, sql, args)?;
        let mut items = Vec::new();
        let drained = drain(&mut rows, &mut items);
        let closed = rows.close();
        if let Err(err) = &closed {
            warn!(error = %err, "closing rows failed");
        }
        Error::join([drained, closed, rows.err()])?;
        debug!(rows = items.len(), "query mapped");
        Ok(items)
    }

    /// Run `sql` with `LIMIT`/`OFFSET` appended, see [`paginate_sql`].
    ///
    /// `skip` and `limit` are written into the statement text, not bound, so
    /// they must never come straight from untrusted input.
    pub fn paginate_query(
        &self,
        ctx: &Context,
        skip: u64,
        limit: u64,
        sql: &str,
        args: &[Value],
    ) -> Result<Vec<T>> {
        self.query(ctx, &paginate_sql(sql, skip, limit), args)
    }
}

fn drain<T, R>(rows: &mut R, items: &mut Vec<T>) -> Result<()>
where
    T: Default + Resolve,
    R: RowCursor,
{
    while rows.next() {
        let mut value = T::default();
        {
            let mut slots = resolve_one(&mut value)?;
            rows.scan(&mut slots)?;
        }
        items.push(value);
    }
    Ok(())
}

/// Append ` LIMIT {limit}` when `limit > 0`, then ` OFFSET {skip}` when `skip > 0`.
pub fn paginate_sql(sql: &str, skip: u64, limit: u64) -> String {
    let mut paged = String::from(sql);
    if limit > 0 {
        paged.push_str(&format!(" LIMIT {limit}"));
    }
    if skip > 0 {
        paged.push_str(&format!(" OFFSET {skip}"));
    }
    paged
}
