// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dbq bench`: insert throughput through the queue or a direct processor.
//!
//! Producers split the command count between them and submit every insert
//! without awaiting, then await the whole batch. The table row count is
//! checked afterwards so a lost command fails the run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dbq_config::DbqConfig;
use dbq_core::{CommandProcessor, DbqError};
use dbq_queue::{DirectProcessor, QueueProcessor, QueueStatsSnapshot};
use dbq_sqlite::{SqlCommand, SqliteExecutor};
use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct BenchOptions {
    pub commands: usize,
    pub producers: usize,
    pub direct: bool,
    pub metrics: bool,
}

#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub mode: &'static str,
    pub commands: usize,
    pub producers: usize,
    pub failures: usize,
    pub elapsed_ms: f64,
    pub commands_per_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<QueueStatsSnapshot>,
}

/// CLI entry: runs the benchmark and prints the report as JSON, followed by
/// Prometheus output when `--metrics` is set.
pub async fn run_bench_command(config: &DbqConfig, options: BenchOptions) -> Result<(), DbqError> {
    #[cfg(feature = "prometheus")]
    let exporter = if options.metrics {
        Some(dbq_prometheus::PrometheusExporter::install()?)
    } else {
        None
    };
    #[cfg(not(feature = "prometheus"))]
    if options.metrics {
        warn!("built without the prometheus feature, --metrics ignored");
    }

    let report = run_bench(config, options).await?;
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|e| DbqError::Internal(format!("failed to render report: {e}")))?;
    println!("{rendered}");

    #[cfg(feature = "prometheus")]
    if let Some(exporter) = exporter {
        print!("{}", exporter.render());
    }
    Ok(())
}

pub async fn run_bench(config: &DbqConfig, options: BenchOptions) -> Result<BenchReport, DbqError> {
    if options.commands == 0 || options.producers == 0 {
        return Err(DbqError::Config(
            "bench needs at least one command and one producer".into(),
        ));
    }

    let executor = Arc::new(SqliteExecutor::open(&config.sqlite).await?);
    let setup = DirectProcessor::new(Arc::clone(&executor));
    for sql in [
        "DROP TABLE IF EXISTS dbq_bench",
        "CREATE TABLE dbq_bench (producer INTEGER NOT NULL, seq INTEGER NOT NULL)",
    ] {
        setup
            .execute_non_query_async(SqlCommand::new(sql), CancellationToken::new())
            .await
            .map_err(storage)?;
    }

    let (mode, elapsed, failures, stats) = if options.direct {
        let processor = Arc::new(DirectProcessor::new(Arc::clone(&executor)));
        let (elapsed, failures) = drive(processor, options).await?;
        ("direct", elapsed, failures, None)
    } else {
        let processor = Arc::new(
            QueueProcessor::builder(Arc::clone(&executor))
                .config(config.queue.clone())
                .start()?,
        );
        let (elapsed, failures) = drive(Arc::clone(&processor), options).await?;
        // Joining the worker settles the dispatch counters.
        processor.dispose();
        let stats = processor.stats();
        ("queued", elapsed, failures, Some(stats))
    };

    let stored = setup
        .execute_scalar_async(
            SqlCommand::new("SELECT COUNT(*) FROM dbq_bench"),
            CancellationToken::new(),
        )
        .await
        .map_err(storage)?
        .as_i64()
        .unwrap_or_default();
    let expected = (options.commands - failures) as i64;
    if stored != expected {
        return Err(DbqError::Internal(format!(
            "bench stored {stored} rows, expected {expected}"
        )));
    }

    let secs = elapsed.as_secs_f64();
    let report = BenchReport {
        mode,
        commands: options.commands,
        producers: options.producers,
        failures,
        elapsed_ms: secs * 1_000.0,
        commands_per_sec: if secs > 0.0 {
            options.commands as f64 / secs
        } else {
            0.0
        },
        stats,
    };
    info!(
        mode,
        commands = report.commands,
        producers = report.producers,
        elapsed_ms = report.elapsed_ms,
        "bench finished"
    );
    Ok(report)
}

/// Spreads `options.commands` inserts across producer tasks and returns the
/// wall time and the number of failed commands.
async fn drive<P>(processor: Arc<P>, options: BenchOptions) -> Result<(Duration, usize), DbqError>
where
    P: CommandProcessor<SqliteExecutor> + 'static,
{
    let started = Instant::now();
    let producers: Vec<_> = (0..options.producers)
        .map(|producer| {
            let processor = Arc::clone(&processor);
            let share = share_of(options.commands, options.producers, producer);
            tokio::spawn(async move {
                let pending: Vec<_> = (0..share)
                    .map(|seq| {
                        processor.execute_non_query_async(
                            SqlCommand::new("INSERT INTO dbq_bench (producer, seq) VALUES (?1, ?2)")
                                .bind(producer as i64)
                                .bind(seq as i64),
                            CancellationToken::new(),
                        )
                    })
                    .collect();
                join_all(pending)
                    .await
                    .into_iter()
                    .filter(|result| result.is_err())
                    .count()
            })
        })
        .collect();

    let mut failures = 0;
    for joined in join_all(producers).await {
        failures += joined.map_err(|e| DbqError::Internal(format!("producer task failed: {e}")))?;
    }
    if failures > 0 {
        warn!(failures, "bench commands failed");
    }
    Ok((started.elapsed(), failures))
}

/// Number of commands producer `index` issues when `total` is split
/// across `producers`. The first `total % producers` producers take one extra.
fn share_of(total: usize, producers: usize, index: usize) -> usize {
    total / producers + usize::from(index < total % producers)
}

fn storage(err: dbq_core::CommandError<dbq_sqlite::SqliteError>) -> DbqError {
    DbqError::Storage {
        source: Box::new(err),
    }
}
