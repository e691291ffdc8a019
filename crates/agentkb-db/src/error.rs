//! Database error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Embedding dimension mismatch: index holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl DbError {
    /// Map unique-key violations to `Conflict` and dangling references to
    /// `NotFound`. Anything else stays `Sqlite`.
    pub(crate) fn from_insert(err: rusqlite::Error, what: impl Into<String>) -> Self {
        use rusqlite::ffi;

        match err {
            rusqlite::Error::SqliteFailure(ref e, _)
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                DbError::Conflict(what.into())
            }
            rusqlite::Error::SqliteFailure(ref e, _)
                if e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                DbError::NotFound(format!("owner of {}", what.into()))
            }
            other => DbError::Sqlite(other),
        }
    }

    /// Map "no rows" to `NotFound`, anything else to `Sqlite`.
    pub(crate) fn from_lookup(err: rusqlite::Error, what: impl Into<String>) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(what.into()),
            other => DbError::Sqlite(other),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
