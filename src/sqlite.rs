//! rusqlite adapter for the execution-handle contract.
//!
//! `Connection`, `Transaction` and `Mutex<Connection>` all act as [`DbHandle`]s.
//! Statements go through the connection's prepared-statement cache.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::handle::{DbHandle, ExecResult, RowCursor, SingleRow};
use crate::scan::{scan_values, Slot};
use crate::value::Value;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, Statement, ToSql, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, trace};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Value::Unsigned(v) => {
                let v = i64::try_from(*v)
                    .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
                ToSqlOutput::Borrowed(ValueRef::Integer(v))
            }
            Value::Real(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
            Value::Boolean(v) => ToSqlOutput::Borrowed(ValueRef::Integer(i64::from(*v))),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Real(v),
            // TEXT that is not UTF-8 keeps its exact bytes.
            ValueRef::Text(text) => match std::str::from_utf8(text) {
                Ok(text) => Value::Text(text.to_owned()),
                Err(_) => Value::Blob(text.to_vec()),
            },
            ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        }
    }
}

/// Connection settings for the SQLite handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Path to the database file; `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
    pub statement_cache_capacity: usize,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5_000,
            foreign_keys: true,
            statement_cache_capacity: 64,
        }
    }
}

impl SqliteConfig {
    /// Config for a database file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn open(&self) -> Result<Connection> {
        debug!(path = ?self.path, "opening sqlite connection");
        let conn = match &self.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(Duration::from_millis(self.busy_timeout_ms))?;
        conn.pragma_update(None, "foreign_keys", if self.foreign_keys { "ON" } else { "OFF" })?;
        conn.set_prepared_statement_cache_capacity(self.statement_cache_capacity);
        Ok(conn)
    }
}

/// A statement compiled into the connection's cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteStatement {
    sql: String,
    parameter_count: usize,
    columns: Vec<String>,
}

impl SqliteStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Cursor over rows stepped to completion when the query was opened.
///
/// A stepping failure ends the buffer; rows read before it are still yielded
/// and the failure is reported by [`RowCursor::err`].
#[derive(Debug)]
pub struct SqliteRows {
    ctx: Context,
    columns: Vec<String>,
    buffered: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    err: Option<Error>,
    closed: bool,
}

impl SqliteRows {
    fn new(
        ctx: Context,
        columns: Vec<String>,
        buffered: VecDeque<Vec<Value>>,
        err: Option<Error>,
    ) -> Self {
        Self {
            ctx,
            columns,
            buffered,
            current: None,
            err,
            closed: false,
        }
    }
}

impl RowCursor for SqliteRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next(&mut self) -> bool {
        if self.closed {
            return false;
        }
        if let Err(err) = self.ctx.check() {
            self.err.get_or_insert(err);
            self.current = None;
            return false;
        }
        self.current = self.buffered.pop_front();
        self.current.is_some()
    }

    fn scan(&mut self, slots: &mut [Slot<'_>]) -> Result<()> {
        if self.closed {
            return Err(Error::RowsClosed);
        }
        let values = self.current.as_ref().ok_or(Error::NoCurrentRow)?;
        scan_values(&self.columns, values, slots)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.current = None;
        self.buffered.clear();
        Ok(())
    }

    fn err(&mut self) -> Result<()> {
        self.err.take().map_or(Ok(()), Err)
    }
}

/// First row of a query, or the failure that prevented reading it.
#[derive(Debug)]
pub struct SqliteRow {
    columns: Vec<String>,
    values: Option<Vec<Value>>,
    err: Option<Error>,
}

impl SqliteRow {
    fn failed(err: Error) -> Self {
        Self {
            columns: Vec::new(),
            values: None,
            err: Some(err),
        }
    }
}

impl SingleRow for SqliteRow {
    /// Reports a deferred query failure first, then [`Error::NoRows`].
    fn scan(&mut self, slots: &mut [Slot<'_>]) -> Result<()> {
        if let Some(err) = self.err.take() {
            return Err(err);
        }
        match &self.values {
            Some(values) => scan_values(&self.columns, values, slots),
            None => Err(Error::NoRows),
        }
    }

    fn err(&mut self) -> Result<()> {
        self.err.take().map_or(Ok(()), Err)
    }
}

fn column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(str::to_owned).collect()
}

fn read_row(row: &rusqlite::Row<'_>, width: usize) -> Result<Vec<Value>> {
    (0..width)
        .map(|index| row.get_ref(index).map(Value::from).map_err(Error::from))
        .collect()
}

fn exec_on(conn: &Connection, ctx: &Context, sql: &str, args: &[Value]) -> Result<ExecResult> {
    ctx.check()?;
    debug!(sql, args = args.len(), "exec");
    let mut stmt = conn.prepare_cached(sql)?;
    let affected = stmt.execute(params_from_iter(args.iter()))?;
    Ok(ExecResult::new(affected as u64, conn.last_insert_rowid()))
}

fn prepare_on(conn: &Connection, ctx: &Context, sql: &str) -> Result<SqliteStatement> {
    ctx.check()?;
    debug!(sql, "prepare");
    let stmt = conn.prepare_cached(sql)?;
    Ok(SqliteStatement {
        sql: sql.to_owned(),
        parameter_count: stmt.parameter_count(),
        columns: column_names(&stmt),
    })
}

fn query_on(conn: &Connection, ctx: &Context, sql: &str, args: &[Value]) -> Result<SqliteRows> {
    ctx.check()?;
    debug!(sql, args = args.len(), "query");
    let mut stmt = conn.prepare_cached(sql)?;
    let columns = column_names(&stmt);
    let mut rows = stmt.query(params_from_iter(args.iter()))?;

    let mut buffered = VecDeque::new();
    let mut terminal = None;
    loop {
        if let Err(err) = ctx.check() {
            terminal = Some(err);
            break;
        }
        match rows.next() {
            Ok(Some(row)) => match read_row(row, columns.len()) {
                Ok(values) => buffered.push_back(values),
                Err(err) => {
                    terminal = Some(err);
                    break;
                }
            },
            Ok(None) => break,
            Err(err) => {
                terminal = Some(Error::from(err));
                break;
            }
        }
    }
    trace!(rows = buffered.len(), failed = terminal.is_some(), "query stepped");
    Ok(SqliteRows::new(ctx.clone(), columns, buffered, terminal))
}

fn first_row(conn: &Connection, ctx: &Context, sql: &str, args: &[Value]) -> Result<SqliteRow> {
    ctx.check()?;
    debug!(sql, args = args.len(), "query row");
    let mut stmt = conn.prepare_cached(sql)?;
    let columns = column_names(&stmt);
    let mut rows = stmt.query(params_from_iter(args.iter()))?;
    let values = match rows.next()? {
        Some(row) => Some(read_row(row, columns.len())?),
        None => None,
    };
    Ok(SqliteRow {
        columns,
        values,
        err: None,
    })
}

fn query_row_on(conn: &Connection, ctx: &Context, sql: &str, args: &[Value]) -> SqliteRow {
    first_row(conn, ctx, sql, args).unwrap_or_else(SqliteRow::failed)
}

impl DbHandle for Connection {
    type Statement = SqliteStatement;
    type Rows = SqliteRows;
    type Row = SqliteRow;

    fn exec(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<ExecResult> {
        exec_on(self, ctx, sql, args)
    }

    fn prepare(&self, ctx: &Context, sql: &str) -> Result<SqliteStatement> {
        prepare_on(self, ctx, sql)
    }

    fn query(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<SqliteRows> {
        query_on(self, ctx, sql, args)
    }

    fn query_row(&self, ctx: &Context, sql: &str, args: &[Value]) -> SqliteRow {
        query_row_on(self, ctx, sql, args)
    }
}

impl DbHandle for Transaction<'_> {
    type Statement = SqliteStatement;
    type Rows = SqliteRows;
    type Row = SqliteRow;

    fn exec(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<ExecResult> {
        exec_on(self, ctx, sql, args)
    }

    fn prepare(&self, ctx: &Context, sql: &str) -> Result<SqliteStatement> {
        prepare_on(self, ctx, sql)
    }

    fn query(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<SqliteRows> {
        query_on(self, ctx, sql, args)
    }

    fn query_row(&self, ctx: &Context, sql: &str, args: &[Value]) -> SqliteRow {
        query_row_on(self, ctx, sql, args)
    }
}

/// A connection shared between threads; each call holds the lock for one round trip.
impl DbHandle for Mutex<Connection> {
    type Statement = SqliteStatement;
    type Rows = SqliteRows;
    type Row = SqliteRow;

    fn exec(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<ExecResult> {
        let conn = self.lock().map_err(|_| Error::Poisoned)?;
        exec_on(&conn, ctx, sql, args)
    }

    fn prepare(&self, ctx: &Context, sql: &str) -> Result<SqliteStatement> {
        let conn = self.lock().map_err(|_| Error::Poisoned)?;
        prepare_on(&conn, ctx, sql)
    }

    fn query(&self, ctx: &Context, sql: &str, args: &[Value]) -> Result<SqliteRows> {
        let conn = self.lock().map_err(|_| Error::Poisoned)?;
        query_on(&conn, ctx, sql, args)
    }

    fn query_row(&self, ctx: &Context, sql: &str, args: &[Value]) -> SqliteRow {
        match self.lock() {
            Ok(conn) => query_row_on(&conn, ctx, sql, args),
            Err(_) => SqliteRow::failed(Error::Poisoned),
        }
    }
}
