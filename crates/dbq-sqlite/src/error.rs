// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use dbq_core::DbqError;
use thiserror::Error;

/// Driver error delivered to callers of SQLite commands.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite rejected or failed the statement.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// The background connection thread has shut down.
    #[error("sqlite connection is closed")]
    ConnectionClosed,

    #[error("sqlite connection error: {0}")]
    Connection(String),

    /// The command's SQL text was blank.
    #[error("empty SQL statement")]
    EmptyStatement,
}

impl SqliteError {
    /// The SQLite primary result code, when SQLite itself reported the error.
    pub fn sqlite_code(&self) -> Option<rusqlite::ErrorCode> {
        match self {
            SqliteError::Sqlite(err) => err.sqlite_error_code(),
            _ => None,
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for SqliteError {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(err) => SqliteError::Sqlite(err),
            tokio_rusqlite::Error::ConnectionClosed => SqliteError::ConnectionClosed,
            other => SqliteError::Connection(other.to_string()),
        }
    }
}

/// Convert errors raised while opening or configuring the connection into
/// DbqError::Storage.
pub(crate) fn storage_err<E>(e: E) -> DbqError
where
    E: std::error::Error + Send + Sync + 'static,
{
    DbqError::Storage {
        source: Box::new(e),
    }
}
