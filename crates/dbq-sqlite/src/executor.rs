// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the CommandExecutor trait.
//!
//! All statements run on tokio-rusqlite's single background connection
//! thread. Launching a command hands its closure to that thread immediately,
//! so statements reach SQLite in exactly the order they were launched. A
//! command cancelled while still waiting for the connection thread is skipped
//! when its turn comes; one already executing runs to completion.

use std::time::Duration;

use dbq_config::SqliteConfig;
use dbq_core::{
    CommandExecutor, DbqError, LaunchError, LaunchResult, OperationError, ReaderBehavior,
};
use dbq_queue::QueuedCommand;
use futures::FutureExt;
use rusqlite::{params_from_iter, OptionalExtension};
use tokio_rusqlite::Connection;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{storage_err, SqliteError};
use crate::types::{RowSet, SqlCommand, SqlValue};

/// Executor backed by one tokio-rusqlite connection.
#[derive(Clone)]
pub struct SqliteExecutor {
    conn: Connection,
    path: String,
}

impl SqliteExecutor {
    /// Opens the configured database, applying the busy timeout and, for
    /// file databases, WAL journaling.
    pub async fn open(config: &SqliteConfig) -> Result<Self, DbqError> {
        let in_memory = config.database_path == ":memory:";
        let conn = if in_memory {
            Connection::open_in_memory().await
        } else {
            Connection::open(&config.database_path).await
        }
        .map_err(storage_err)?;

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(busy_timeout)?;
            if !in_memory {
                conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
            }
            Ok(())
        })
        .await
        .map_err(storage_err)?;

        debug!(path = %config.database_path, "sqlite executor opened");
        Ok(Self {
            conn,
            path: config.database_path.clone(),
        })
    }

    pub async fn open_in_memory() -> Result<Self, DbqError> {
        Self::open(&SqliteConfig::default()).await
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn launch<T, F>(
        &self,
        command: SqlCommand,
        cancel: CancellationToken,
        run: F,
    ) -> LaunchResult<T, SqliteError>
    where
        T: Send + 'static,
        F: FnOnce(&mut rusqlite::Connection, &SqlCommand) -> rusqlite::Result<T> + Send + 'static,
    {
        if command.sql.trim().is_empty() {
            return Err(LaunchError::Failed(SqliteError::EmptyStatement));
        }

        let conn = self.conn.clone();
        let skip = cancel.clone();
        let mut call = Box::pin(async move {
            conn.call(move |conn| -> Result<Option<T>, rusqlite::Error> {
                // Cancelled while waiting behind earlier statements.
                if skip.is_cancelled() {
                    return Ok(None);
                }
                run(conn, &command).map(Some)
            })
            .await
        });
        // The first poll submits the closure to the connection thread.
        let submitted = call.as_mut().now_or_never();

        Ok(async move {
            let outcome = match submitted {
                Some(outcome) => outcome,
                None => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(OperationError::Cancelled),
                        outcome = call => outcome,
                    }
                }
            };
            match outcome {
                Ok(Some(value)) => Ok(value),
                Ok(None) => Err(OperationError::Cancelled),
                Err(e) => Err(OperationError::Failed(SqliteError::from(e))),
            }
        }
        .boxed())
    }
}

impl std::fmt::Debug for SqliteExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteExecutor")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn query_scalar(
    conn: &mut rusqlite::Connection,
    command: &SqlCommand,
) -> rusqlite::Result<Option<SqlValue>> {
    let mut stmt = conn.prepare_cached(&command.sql)?;
    stmt.query_row(params_from_iter(command.params.iter()), |row| {
        row.get_ref(0).map(SqlValue::from)
    })
    .optional()
}

fn execute(conn: &mut rusqlite::Connection, command: &SqlCommand) -> rusqlite::Result<u64> {
    let mut stmt = conn.prepare_cached(&command.sql)?;
    let changed = stmt.execute(params_from_iter(command.params.iter()))?;
    Ok(changed as u64)
}

fn query_rows(
    conn: &mut rusqlite::Connection,
    command: &SqlCommand,
    behavior: ReaderBehavior,
) -> rusqlite::Result<RowSet> {
    let mut stmt = conn.prepare_cached(&command.sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    if behavior.schema_only {
        return Ok(RowSet {
            columns,
            rows: Vec::new(),
        });
    }

    let width = columns.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.query(params_from_iter(command.params.iter()))?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(SqlValue::from(row.get_ref(idx)?));
        }
        rows.push(values);
        if behavior.single_row {
            break;
        }
    }
    Ok(RowSet { columns, rows })
}

impl CommandExecutor for SqliteExecutor {
    type Command = SqlCommand;
    type Scalar = SqlValue;
    type Reader = RowSet;
    type Error = SqliteError;

    fn name(&self) -> &str {
        "sqlite"
    }

    fn launch_scalar(
        &self,
        command: SqlCommand,
        cancel: CancellationToken,
    ) -> LaunchResult<Option<SqlValue>, SqliteError> {
        self.launch(command, cancel, query_scalar)
    }

    fn launch_non_query(
        &self,
        command: SqlCommand,
        cancel: CancellationToken,
    ) -> LaunchResult<u64, SqliteError> {
        self.launch(command, cancel, execute)
    }

    fn launch_reader(
        &self,
        command: SqlCommand,
        behavior: ReaderBehavior,
        cancel: CancellationToken,
    ) -> LaunchResult<RowSet, SqliteError> {
        self.launch(command, cancel, move |conn, command| {
            query_rows(conn, command, behavior)
        })
    }
}

impl QueuedCommand for SqlCommand {
    type Executor = SqliteExecutor;
}
