// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the dbq command queue.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use dbq_core::ResolveMode;
use serde::{Deserialize, Serialize};

/// Top-level dbq configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DbqConfig {
    /// Queue processor and drain worker settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// SQLite executor settings.
    #[serde(default)]
    pub sqlite: SqliteConfig,
}

/// Queue processor and drain worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Upper bound, in milliseconds, the drain worker idles between passes.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Wake the drain worker on every enqueue instead of waiting for the next tick.
    #[serde(default = "default_wake_on_enqueue")]
    pub wake_on_enqueue: bool,

    /// How completion handles are resolved once an operation finishes.
    #[serde(default)]
    pub resolve_mode: ResolveMode,

    /// OS thread name of the drain worker.
    #[serde(default = "default_worker_thread_name")]
    pub worker_thread_name: String,
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            wake_on_enqueue: default_wake_on_enqueue(),
            resolve_mode: ResolveMode::default(),
            worker_thread_name: default_worker_thread_name(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1
}

fn default_wake_on_enqueue() -> bool {
    true
}

fn default_worker_thread_name() -> String {
    "dbq-drain".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite executor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteConfig {
    /// Path to the SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// How long SQLite waits on a locked database before failing, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    ":memory:".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}
