// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue statistics: backlog depth and lifetime totals.
//!
//! All counters are plain atomics. The backlog counter is incremented on
//! enqueue and decremented once the descriptor has been dispatched (its
//! continuation attached or its failure routed), never when the operation
//! itself completes.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use serde::Serialize;
use tracing::warn;

use crate::recording;

static GLOBAL: LazyLock<Arc<QueueStats>> = LazyLock::new(|| Arc::new(QueueStats::new("global")));

/// Atomic counters for one or more queue processors.
#[derive(Debug)]
pub struct QueueStats {
    scope: String,
    queued: AtomicUsize,
    enqueued: AtomicU64,
    dispatched: AtomicU64,
    launch_failures: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time copy of [`QueueStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatsSnapshot {
    pub queued: usize,
    pub enqueued: u64,
    pub dispatched: u64,
    pub launch_failures: u64,
    pub rejected: u64,
}

impl QueueStats {
    /// Creates an isolated counter set. `scope` labels the backlog gauge.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            queued: AtomicUsize::new(0),
            enqueued: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            launch_failures: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// The process-wide instance shared by processors built without their own.
    pub fn global() -> Arc<QueueStats> {
        Arc::clone(&GLOBAL)
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Current backlog: enqueued but not yet dispatched.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    /// Claims a backlog slot for a descriptor about to be offered to the
    /// intake queue.
    pub fn increment(&self) {
        let backlog = self.queued.fetch_add(1, Ordering::AcqRel) + 1;
        recording::set_backlog(&self.scope, backlog);
    }

    /// Counts a descriptor the intake queue accepted.
    pub fn record_enqueue(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the backlog, saturating at zero.
    pub fn decrement(&self) {
        match self
            .queued
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(previous) => recording::set_backlog(&self.scope, previous - 1),
            Err(_) => warn!(scope = %self.scope, "backlog decrement without matching increment"),
        }
    }

    /// Records a dispatched descriptor and releases its backlog slot.
    pub fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.decrement();
    }

    pub fn record_launch_failure(&self) {
        self.launch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a descriptor the intake queue refused and releases its backlog slot.
    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        self.decrement();
    }

    pub fn snapshot(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            queued: self.queued(),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            launch_failures: self.launch_failures.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

impl Default for QueueStats {
    fn default() -> Self {
        Self::new("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tracing_test::traced_test;

    #[test]
    fn increment_and_dispatch_balance_out() {
        let stats = QueueStats::new("test");
        stats.increment();
        stats.record_enqueue();
        stats.increment();
        assert_eq!(stats.queued(), 2);
        stats.record_dispatch();
        stats.record_rejection();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.queued, 0);
        assert_eq!(snapshot.enqueued, 1);
        assert_eq!(snapshot.dispatched, 1);
        assert_eq!(snapshot.rejected, 1);
    }

    #[traced_test]
    #[test]
    fn decrement_saturates_at_zero() {
        let stats = QueueStats::new("underflow");
        stats.decrement();
        assert_eq!(stats.queued(), 0);
        assert!(logs_contain("backlog decrement without matching increment"));
    }

    #[test]
    fn global_instance_is_shared() {
        let a = QueueStats::global();
        let b = QueueStats::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.scope(), "global");
    }

    #[test]
    fn snapshot_serializes_as_json() {
        let stats = QueueStats::new("json");
        stats.increment();
        stats.record_enqueue();
        let json = serde_json::to_value(stats.snapshot()).expect("serialize");
        assert_eq!(json["queued"], 1);
        assert_eq!(json["enqueued"], 1);
    }

    proptest! {
        #[test]
        fn concurrent_balanced_updates_return_to_zero(per_thread in 1usize..200, threads in 1usize..6) {
            let stats = Arc::new(QueueStats::new("prop"));
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let stats = Arc::clone(&stats);
                    std::thread::spawn(move || {
                        for _ in 0..per_thread {
                            stats.increment();
                            stats.record_dispatch();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            let snapshot = stats.snapshot();
            prop_assert_eq!(snapshot.queued, 0);
            prop_assert_eq!(snapshot.dispatched, (per_thread * threads) as u64);
        }
    }
}
