// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dbq exec`: run one statement through a queue processor.

use std::sync::Arc;

use dbq_config::DbqConfig;
use dbq_core::{CommandError, CommandKind, CommandProcessor, DbqError, ReaderBehavior};
use dbq_queue::QueueProcessor;
use dbq_sqlite::{SqlCommand, SqlValue, SqliteError, SqliteExecutor};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Opens the configured database, runs `sql` and prints the result.
///
/// Ctrl-C cancels the in-flight command.
pub async fn run_exec(
    config: &DbqConfig,
    sql: &str,
    kind: CommandKind,
    params: &[String],
) -> Result<(), DbqError> {
    let executor = Arc::new(SqliteExecutor::open(&config.sqlite).await?);
    let processor = QueueProcessor::builder(executor)
        .config(config.queue.clone())
        .start()?;

    let command = params
        .iter()
        .fold(SqlCommand::new(sql), |command, raw| command.bind(parse_param(raw)));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling command");
            interrupt.cancel();
        }
    });

    let output = execute(&processor, command, kind, cancel).await;
    processor.dispose();

    let value = output.map_err(command_failed)?;
    let rendered = serde_json::to_string_pretty(&value)
        .map_err(|e| DbqError::Internal(format!("failed to render result: {e}")))?;
    println!("{rendered}");
    Ok(())
}

/// Runs `command` as `kind` and converts the result to JSON.
pub async fn execute<P>(
    processor: &P,
    command: SqlCommand,
    kind: CommandKind,
    cancel: CancellationToken,
) -> Result<Value, CommandError<SqliteError>>
where
    P: CommandProcessor<SqliteExecutor>,
{
    debug!(%kind, sql = %command.sql, "executing command");
    match kind {
        CommandKind::Scalar => {
            let value = processor.execute_scalar_async(command, cancel).await?;
            Ok(sql_value_to_json(value))
        }
        CommandKind::NonQuery => {
            let changed = processor.execute_non_query_async(command, cancel).await?;
            Ok(json!({ "rows_affected": changed }))
        }
        CommandKind::Reader => {
            let set = processor
                .execute_reader_async(command, ReaderBehavior::default(), cancel)
                .await?;
            let rows: Vec<Value> = set
                .rows
                .into_iter()
                .map(|row| Value::Array(row.into_iter().map(sql_value_to_json).collect()))
                .collect();
            Ok(json!({ "columns": set.columns, "rows": rows }))
        }
    }
}

fn command_failed(err: CommandError<SqliteError>) -> DbqError {
    match err {
        CommandError::Driver(source) => DbqError::Storage {
            source: Box::new(source),
        },
        other => DbqError::Internal(other.to_string()),
    }
}

/// Interprets a command-line parameter: `null`, integers and reals map to
/// their SQL types, anything else binds as text.
pub fn parse_param(raw: &str) -> SqlValue {
    if raw.eq_ignore_ascii_case("null") {
        return SqlValue::Null;
    }
    if let Ok(int) = raw.parse::<i64>() {
        return SqlValue::Integer(int);
    }
    match raw.parse::<f64>() {
        Ok(real) if real.is_finite() => SqlValue::Real(real),
        _ => SqlValue::Text(raw.to_string()),
    }
}

fn sql_value_to_json(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => json!(i),
        SqlValue::Real(r) => json!(r),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(bytes) => json!({ "blob": bytes }),
    }
}
