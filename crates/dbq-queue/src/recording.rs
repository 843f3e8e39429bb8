// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue metrics, recorded through the metrics-rs facade.
//!
//! Every call is a no-op until a recorder is installed (see `dbq-prometheus`).

use dbq_core::CommandKind;
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// Describes every queue metric to the installed recorder.
pub fn register_metrics() {
    describe_gauge!(
        "dbq_queue_backlog",
        "Commands enqueued but not yet dispatched"
    );
    describe_counter!("dbq_commands_enqueued_total", "Commands accepted by the intake queue");
    describe_counter!(
        "dbq_commands_dispatched_total",
        "Commands originated by the drain worker"
    );
    describe_counter!(
        "dbq_commands_rejected_total",
        "Commands rejected because the processor was disposed"
    );
    describe_counter!(
        "dbq_launch_failures_total",
        "Commands whose launch failed synchronously"
    );
    describe_histogram!(
        "dbq_drain_batch_size",
        "Descriptors dispatched per drain pass"
    );
    describe_histogram!(
        "dbq_command_duration_seconds",
        Unit::Seconds,
        "Time from enqueue to completion resolution"
    );
}

pub fn set_backlog(scope: &str, backlog: usize) {
    metrics::gauge!("dbq_queue_backlog", "scope" => scope.to_string()).set(backlog as f64);
}

pub fn record_enqueued(kind: CommandKind) {
    metrics::counter!("dbq_commands_enqueued_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_dispatched(kind: CommandKind) {
    metrics::counter!("dbq_commands_dispatched_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_rejected(kind: CommandKind) {
    metrics::counter!("dbq_commands_rejected_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_launch_failure(kind: CommandKind) {
    metrics::counter!("dbq_launch_failures_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_drain_batch(size: usize) {
    metrics::histogram!("dbq_drain_batch_size").record(size as f64);
}

/// Record the enqueue-to-resolution latency of one command.
///
/// `outcome` is one of `value`, `cancelled`, `failed`.
pub fn record_duration(kind: CommandKind, outcome: &'static str, seconds: f64) {
    metrics::histogram!(
        "dbq_command_duration_seconds",
        "kind" => kind.to_string(),
        "outcome" => outcome
    )
    .record(seconds);
}
