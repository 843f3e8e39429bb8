// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the queue processor against the mock executor.
//!
//! Each test starts an isolated QueueHarness with its own statistics, so
//! tests are independent and order-insensitive.

use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};

use dbq_core::{
    CommandError, CommandExecutor, CommandKind, CommandProcessor, LaunchResult, ReaderBehavior,
    ResolveMode, WorkerState,
};
use dbq_queue::{CompletionState, QueueProcessor, QueueStats};
use dbq_test_utils::{MockBehavior, MockCommand, MockError, MockExecutor, QueueHarness};
use futures::future::join_all;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

const SETTLE: Duration = Duration::from_secs(5);

// ---- Test 1: Basic delivery ----

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_entry_points_deliver_values() {
    let harness = QueueHarness::start().unwrap();
    let p = &harness.processor;

    let scalar = p
        .execute_scalar_async(MockCommand::returning(1, 42), CancellationToken::new())
        .await
        .unwrap();
    let rows = p
        .execute_non_query_async(MockCommand::returning(2, 3), CancellationToken::new())
        .await
        .unwrap();
    let reader = p
        .execute_reader_async(
            MockCommand::returning(3, 7),
            ReaderBehavior::single_row(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(scalar, 42);
    assert_eq!(rows, 3);
    assert_eq!(reader.command_id, 3);
    assert_eq!(reader.rows, vec![7]);
    assert!(reader.behavior.single_row);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scalar_without_row_value_resolves_default() {
    let harness = QueueHarness::start().unwrap();
    let value = harness
        .processor
        .execute_scalar_async(
            MockCommand::new(1, MockBehavior::ReturnNothing),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(value, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_many_commands_each_resolve_exactly_once() {
    let harness = QueueHarness::start().unwrap();
    let completions: Vec<_> = (0..1_000)
        .map(|i| {
            harness
                .processor
                .submit_scalar(MockCommand::returning(i, i as i64), CancellationToken::new())
        })
        .collect();

    let results = join_all(completions).await;
    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), i as i64);
    }
    assert_eq!(harness.executor.launch_count(), 1_000);
}

// ---- Test 2: Ordering and origination ----

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_producer_commands_originate_in_order() {
    let harness = QueueHarness::start().unwrap();
    let release = CancellationToken::new();
    let gated = |id| {
        MockCommand::new(
            id,
            MockBehavior::Gated {
                release: release.clone(),
                value: id as i64,
            },
        )
    };

    let a = harness.processor.submit_scalar(gated(1), CancellationToken::new());
    let b = harness.processor.submit_scalar(gated(2), CancellationToken::new());
    let c = harness.processor.submit_scalar(gated(3), CancellationToken::new());

    assert!(harness.wait_for_launches(3, SETTLE).await);
    assert_eq!(harness.executor.launched_ids(), vec![1, 2, 3]);

    release.cancel();
    assert_eq!(a.await.unwrap(), 1);
    assert_eq!(b.await.unwrap(), 2);
    assert_eq!(c.await.unwrap(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_all_origination_happens_on_the_drain_worker() {
    let harness = Arc::new(QueueHarness::start().unwrap());

    let producers: Vec<_> = (0..8u64)
        .map(|producer| {
            let harness = Arc::clone(&harness);
            thread::spawn(move || {
                (0..50u64)
                    .map(|i| {
                        harness.processor.submit_non_query(
                            MockCommand::returning(producer * 1_000 + i, 1),
                            CancellationToken::new(),
                        )
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut completions = Vec::new();
    for producer in producers {
        completions.extend(producer.join().unwrap());
    }
    for result in join_all(completions).await {
        assert_eq!(result.unwrap(), 1);
    }

    let launches = harness.executor.launches();
    assert_eq!(launches.len(), 400);
    assert_eq!(harness.executor.launch_threads().len(), 1);
    assert!(launches
        .iter()
        .all(|l| l.thread_name.as_deref() == Some("dbq-drain")));

    // Per-producer FIFO survives interleaving.
    for producer in 0..8u64 {
        let ids: Vec<u64> = launches
            .iter()
            .map(|l| l.command_id)
            .filter(|id| id / 1_000 == producer)
            .collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }
}

// ---- Test 3: Non-blocking enqueue ----

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_enqueue_does_not_wait_for_stalled_operations() {
    let harness = QueueHarness::start().unwrap();
    let cancel = CancellationToken::new();

    let started = Instant::now();
    let completions: Vec<_> = (0..10_000)
        .map(|i| {
            harness.processor.submit_scalar(
                MockCommand::new(i, MockBehavior::WaitForCancel),
                cancel.clone(),
            )
        })
        .collect();
    let enqueue_time = started.elapsed();
    assert!(
        enqueue_time < Duration::from_secs(2),
        "enqueueing took {enqueue_time:?}"
    );
    assert!(completions
        .iter()
        .all(|c| c.state() == CompletionState::Pending));

    assert!(harness.wait_for_launches(10_000, SETTLE).await);
    cancel.cancel();
    for result in join_all(completions).await {
        assert!(result.unwrap_err().is_cancelled());
    }
}

// ---- Test 4: Error fidelity ----

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_driver_error_surfaces_unchanged() {
    let harness = QueueHarness::start().unwrap();
    let original = MockError::new(2067, "UNIQUE constraint failed: users.email");

    let err = harness
        .processor
        .execute_non_query_async(
            MockCommand::new(1, MockBehavior::Fail(original.clone())),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), original.to_string());
    assert_eq!(err.into_driver(), Some(original));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_launch_failure_is_routed_to_the_handle() {
    let harness = QueueHarness::start().unwrap();
    let original = MockError::new(14, "unable to open database file");

    let err = harness
        .processor
        .execute_scalar_async(
            MockCommand::new(1, MockBehavior::FailLaunch(original.clone())),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.into_driver(), Some(original));
    assert!(harness.wait_for_drain(SETTLE).await);
    assert_eq!(harness.stats.snapshot().launch_failures, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unsupported_reader_kind() {
    let harness = QueueHarness::builder().without_readers().build().unwrap();

    let err = harness
        .processor
        .execute_reader_async(
            MockCommand::returning(1, 1),
            ReaderBehavior::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CommandError::Unsupported(CommandKind::Reader)));
    assert_eq!(harness.executor.launch_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_launch_does_not_kill_the_worker() {
    let harness = QueueHarness::start().unwrap();

    let err = harness
        .processor
        .execute_scalar_async(
            MockCommand::new(1, MockBehavior::PanicOnLaunch),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Panicked(ref m) if m.contains("command 1")));

    let err = harness
        .processor
        .execute_scalar_async(
            MockCommand::new(2, MockBehavior::PanicWhileRunning),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Panicked(_)));

    let value = harness
        .processor
        .execute_scalar_async(MockCommand::returning(3, 5), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(value, 5);
    assert_ne!(harness.processor.worker_state(), WorkerState::Stopped);
}

// ---- Test 5: Cancellation ----

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancellation_resolves_cancelled() {
    let harness = QueueHarness::start().unwrap();
    let cancel = CancellationToken::new();

    let completion = harness.processor.submit_scalar(
        MockCommand::new(1, MockBehavior::Delay(Duration::from_secs(30), 1)),
        cancel.clone(),
    );
    assert!(harness.wait_for_launches(1, SETTLE).await);
    cancel.cancel();

    assert!(completion.await.unwrap_err().is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pre_cancelled_command_is_never_launched() {
    let harness = QueueHarness::start().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = harness
        .processor
        .execute_non_query_async(MockCommand::returning(1, 1), cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(harness.executor.launch_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_after_resolution_has_no_effect() {
    let harness = QueueHarness::start().unwrap();
    let cancel = CancellationToken::new();

    let value = harness
        .processor
        .execute_scalar_async(MockCommand::returning(1, 11), cancel.clone())
        .await
        .unwrap();
    cancel.cancel();
    assert_eq!(value, 11);
}

// ---- Test 6: Statistics ----

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_backlog_returns_to_zero() {
    let harness = QueueHarness::start().unwrap();

    let completions: Vec<_> = (0..500)
        .map(|i| {
            let behavior = match i % 3 {
                0 => MockBehavior::Return(1),
                1 => MockBehavior::Fail(MockError::new(1, "boom")),
                _ => MockBehavior::FailLaunch(MockError::new(2, "bad sql")),
            };
            harness
                .processor
                .submit_non_query(MockCommand::new(i, behavior), CancellationToken::new())
        })
        .collect();
    join_all(completions).await;

    assert!(harness.wait_for_drain(SETTLE).await);
    let snapshot = harness.stats.snapshot();
    assert_eq!(snapshot.queued, 0);
    assert_eq!(snapshot.enqueued, 500);
    assert_eq!(snapshot.dispatched, 500);
    assert_eq!(snapshot.launch_failures, 166);
    assert_eq!(harness.processor.stats(), snapshot);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_backlog_counts_queued_descriptors_without_wake() {
    let harness = QueueHarness::builder()
        .without_wake_on_enqueue()
        .with_poll_interval_ms(1000)
        .build()
        .unwrap();
    // Let the worker reach its first sleep.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let a = harness
        .processor
        .submit_scalar(MockCommand::returning(1, 1), CancellationToken::new());
    let b = harness
        .processor
        .submit_scalar(MockCommand::returning(2, 2), CancellationToken::new());
    assert_eq!(harness.processor.queued(), 2);

    assert_eq!(a.await.unwrap(), 1);
    assert_eq!(b.await.unwrap(), 2);
    assert!(harness.wait_for_drain(SETTLE).await);
}

// ---- Test 7: Blocking entry points ----

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sync_and_async_results_match() {
    let harness = Arc::new(QueueHarness::start().unwrap());

    let awaited = harness
        .processor
        .execute_scalar_async(MockCommand::returning(1, 99), CancellationToken::new())
        .await;

    let blocking_harness = Arc::clone(&harness);
    let blocked = thread::spawn(move || {
        blocking_harness
            .processor
            .execute_scalar(MockCommand::returning(2, 99))
    })
    .join()
    .unwrap();
    assert_eq!(awaited.unwrap(), blocked.unwrap());

    // Inside a multi-thread runtime the blocking call hands off the worker.
    let in_place = harness
        .processor
        .execute_non_query(MockCommand::returning(3, 4))
        .unwrap();
    assert_eq!(in_place, 4);

    let failed_sync = harness
        .processor
        .execute_scalar(MockCommand::new(4, MockBehavior::Fail(MockError::new(5, "busy"))))
        .unwrap_err();
    let failed_async = harness
        .processor
        .execute_scalar_async(
            MockCommand::new(5, MockBehavior::Fail(MockError::new(5, "busy"))),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(failed_sync.into_driver(), failed_async.into_driver());
}

#[tokio::test(flavor = "current_thread")]
async fn test_blocking_call_inside_current_thread_runtime_fails_fast() {
    let harness = QueueHarness::start().unwrap();

    let err = harness
        .processor
        .execute_scalar(MockCommand::returning(1, 1))
        .unwrap_err();

    assert!(matches!(
        err,
        CommandError::BlockingInAsyncContext(CommandKind::Scalar)
    ));
    assert_eq!(harness.stats.snapshot().enqueued, 0);
}

#[tokio::test(flavor = "current_thread")]
async fn test_blocking_call_inside_current_thread_runtime_waits_on_separate_pool() {
    let operations = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let stats = Arc::new(QueueStats::new("separate-pool"));
    let processor = QueueProcessor::builder(Arc::new(MockExecutor::new()))
        .runtime(operations.handle().clone())
        .stats(Arc::clone(&stats))
        .start()
        .unwrap();

    let value = processor
        .execute_scalar(MockCommand::new(1, MockBehavior::Delay(Duration::from_millis(10), 5)))
        .unwrap();
    assert_eq!(value, 5);

    processor.dispose();
    assert_eq!(stats.snapshot().enqueued, 1);
    operations.shutdown_background();
}

/// Executor whose scalar launch re-enters its own processor synchronously.
#[derive(Default)]
struct ReentrantExecutor {
    processor: OnceLock<Weak<QueueProcessor<ReentrantExecutor>>>,
}

impl CommandExecutor for ReentrantExecutor {
    type Command = ();
    type Scalar = bool;
    type Reader = ();
    type Error = MockError;

    fn name(&self) -> &str {
        "reentrant"
    }

    fn launch_scalar(&self, _: (), _: CancellationToken) -> LaunchResult<Option<bool>, MockError> {
        let processor = self.processor.get().and_then(Weak::upgrade);
        let refused = processor.is_some_and(|p| {
            matches!(
                p.execute_non_query(()),
                Err(CommandError::WorkerReentry(CommandKind::NonQuery))
            )
        });
        Ok(futures::future::ready(Ok(Some(refused))).boxed())
    }

    fn launch_non_query(&self, _: (), _: CancellationToken) -> LaunchResult<u64, MockError> {
        Ok(futures::future::ready(Ok(1)).boxed())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_call_on_drain_worker_is_refused() {
    let executor = Arc::new(ReentrantExecutor::default());
    let processor = Arc::new(
        QueueProcessor::builder(Arc::clone(&executor))
            .stats(Arc::new(QueueStats::new("reentrant")))
            .start()
            .unwrap(),
    );
    executor
        .processor
        .set(Arc::downgrade(&processor))
        .unwrap_or_else(|_| panic!("processor already attached"));

    let refused = processor
        .execute_scalar_async((), CancellationToken::new())
        .await
        .unwrap();
    assert!(refused);
}

// ---- Test 8: Disposal ----

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dispose_drains_everything_already_enqueued() {
    let harness = QueueHarness::builder()
        .without_wake_on_enqueue()
        .with_poll_interval_ms(1000)
        .build()
        .unwrap();

    let completions: Vec<_> = (0..200)
        .map(|i| {
            harness
                .processor
                .submit_scalar(MockCommand::returning(i, i as i64), CancellationToken::new())
        })
        .collect();
    harness.processor.dispose();

    for (i, result) in join_all(completions).await.into_iter().enumerate() {
        assert_eq!(result.unwrap(), i as i64);
    }
    assert_eq!(harness.executor.launch_count(), 200);
    assert_eq!(harness.processor.worker_state(), WorkerState::Stopped);
    assert_eq!(harness.stats.queued(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_enqueue_after_dispose_is_rejected() {
    let harness = QueueHarness::start().unwrap();
    harness.processor.dispose();
    harness.processor.dispose();
    assert!(harness.processor.is_disposed());

    let err = harness
        .processor
        .execute_non_query_async(MockCommand::returning(1, 1), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CommandError::Disposed));
    assert_eq!(harness.executor.launch_count(), 0);
    let snapshot = harness.stats.snapshot();
    assert_eq!(snapshot.rejected, 1);
    assert_eq!(snapshot.enqueued, 0);
    assert_eq!(snapshot.queued, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dispose_racing_producers_never_loses_a_command() {
    let harness = Arc::new(QueueHarness::start().unwrap());

    let producers: Vec<_> = (0..4u64)
        .map(|producer| {
            let harness = Arc::clone(&harness);
            thread::spawn(move || {
                (0..250u64)
                    .map(|i| {
                        harness.processor.submit_scalar(
                            MockCommand::returning(producer * 1_000 + i, 1),
                            CancellationToken::new(),
                        )
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    thread::sleep(Duration::from_millis(1));
    harness.processor.dispose();

    let mut delivered = 0;
    let mut rejected = 0;
    for producer in producers {
        for result in join_all(producer.join().unwrap()).await {
            match result {
                Ok(1) => delivered += 1,
                Err(CommandError::Disposed) => rejected += 1,
                other => panic!("unexpected outcome {other:?}"),
            }
        }
    }
    assert_eq!(delivered + rejected, 1_000);
    assert_eq!(harness.executor.launch_count(), delivered);
    assert_eq!(harness.stats.queued(), 0);
}

// ---- Test 9: Resolve modes ----

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deferred_resolution_delivers_the_same_results() {
    let harness = QueueHarness::builder()
        .with_resolve_mode(ResolveMode::Deferred)
        .build()
        .unwrap();
    let p = &harness.processor;

    assert_eq!(
        p.execute_scalar_async(MockCommand::returning(1, 8), CancellationToken::new())
            .await
            .unwrap(),
        8
    );
    let err = p
        .execute_scalar_async(
            MockCommand::new(2, MockBehavior::Fail(MockError::new(3, "readonly"))),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.into_driver(), Some(MockError::new(3, "readonly")));

    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(p
        .execute_non_query_async(MockCommand::returning(3, 1), cancel)
        .await
        .unwrap_err()
        .is_cancelled());
}
