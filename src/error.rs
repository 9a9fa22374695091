use crate::scan::ResolveError;
use crate::value::ConversionError;
use thiserror::Error;

/// Errors surfaced by handles, cursors and the querier.
#[derive(Debug, Error)]
pub enum Error {
    /// Failure reported by SQLite while preparing, binding or stepping.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// A single-row query matched nothing.
    #[error("no rows in result set")]
    NoRows,

    #[error("expected {expected} destination slots, got {got}")]
    ColumnCount { expected: usize, got: usize },

    #[error("scanning column {index} ({column}): {source}")]
    Scan {
        index: usize,
        column: String,
        #[source]
        source: ConversionError,
    },

    #[error("resolving scan slots: {0}")]
    Resolve(#[from] ResolveError),

    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("rows are closed")]
    RowsClosed,

    #[error("scan called without a current row")]
    NoCurrentRow,

    /// The lock guarding a shared connection was poisoned by a panicking holder.
    #[error("connection lock poisoned")]
    Poisoned,

    /// Two or more failures reported together, in the order they occurred.
    #[error("{}", join_messages(.0))]
    Joined(Vec<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    /// Combine outcomes without dropping any failure.
    ///
    /// All `Ok` gives `Ok(())`, a single failure is returned unchanged, and
    /// several become [`Error::Joined`]. Nested joins are flattened.
    pub fn join<I>(outcomes: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<()>>,
    {
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(()) => {}
                Err(Error::Joined(inner)) => errors.extend(inner),
                Err(err) => errors.push(err),
            }
        }
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Error::Joined(errors)),
        }
    }

    /// The individual failures: the members of a join, or just `self`.
    pub fn errors(&self) -> &[Error] {
        match self {
            Error::Joined(inner) => inner,
            other => std::slice::from_ref(other),
        }
    }

    pub fn is_no_rows(&self) -> bool {
        matches!(self, Error::NoRows)
    }
}
