// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for queue integration tests.
//!
//! `QueueHarness` starts a [`QueueProcessor`] over a fresh [`MockExecutor`]
//! with its own [`QueueStats`], so tests can assert on the backlog without
//! interference from other tests running in the same process.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dbq_config::QueueConfig;
use dbq_core::{DbqError, ResolveMode};
use dbq_queue::{QueueProcessor, QueueStats};

use crate::mock_executor::MockExecutor;

/// Builder for creating test environments with configurable options.
pub struct QueueHarnessBuilder {
    config: QueueConfig,
    readers: bool,
}

impl QueueHarnessBuilder {
    fn new() -> Self {
        Self {
            config: QueueConfig::default(),
            readers: true,
        }
    }

    pub fn with_resolve_mode(mut self, mode: ResolveMode) -> Self {
        self.config.resolve_mode = mode;
        self
    }

    pub fn with_poll_interval_ms(mut self, millis: u64) -> Self {
        self.config.poll_interval_ms = millis;
        self
    }

    /// Leave the worker to its poll interval instead of waking it per enqueue.
    pub fn without_wake_on_enqueue(mut self) -> Self {
        self.config.wake_on_enqueue = false;
        self
    }

    /// Use an executor that does not support row streams.
    pub fn without_readers(mut self) -> Self {
        self.readers = false;
        self
    }

    /// Build the harness on the current tokio runtime.
    pub fn build(self) -> Result<QueueHarness, DbqError> {
        let executor = Arc::new(if self.readers {
            MockExecutor::new()
        } else {
            MockExecutor::without_readers()
        });
        let stats = Arc::new(QueueStats::new("harness"));
        let processor = QueueProcessor::builder(Arc::clone(&executor))
            .config(self.config)
            .stats(Arc::clone(&stats))
            .start()?;
        Ok(QueueHarness {
            executor,
            processor,
            stats,
        })
    }
}

/// A running processor over a mock executor.
pub struct QueueHarness {
    /// The mock executor, for launch assertions.
    pub executor: Arc<MockExecutor>,
    /// The processor under test.
    pub processor: QueueProcessor<MockExecutor>,
    /// Counters private to this harness.
    pub stats: Arc<QueueStats>,
}

impl QueueHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> QueueHarnessBuilder {
        QueueHarnessBuilder::new()
    }

    /// Start a harness with default settings.
    pub fn start() -> Result<QueueHarness, DbqError> {
        Self::builder().build()
    }

    /// Polls until the backlog is empty or `timeout` passes.
    ///
    /// Returns `true` if the backlog drained in time.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.stats.queued() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        true
    }

    /// Polls until the executor has seen `count` launches or `timeout` passes.
    pub async fn wait_for_launches(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.executor.launch_count() < count {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        true
    }
}
