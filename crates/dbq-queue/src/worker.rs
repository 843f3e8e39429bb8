// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The drain worker: the only thread that originates operations.
//!
//! The worker sleeps for at most the poll interval (or until unparked by an
//! enqueue), drains the intake queue until it is empty and launches each
//! descriptor's operation without waiting for it. A continuation task
//! spawned on the runtime resolves the descriptor's completion.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, Thread, ThreadId};
use std::time::{Duration, Instant};

use dbq_core::{
    CommandError, CommandExecutor, CommandKind, CommandResult, LaunchResult, OperationFuture,
    ResolveMode, WorkerState,
};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::completion::CompletionSource;
use crate::descriptor::{CommandDescriptor, Payload};
use crate::dispatch::{self, launch_guarded, run_guarded, scalar_or_default};
use crate::intake::IntakeReceiver;
use crate::recording;
use crate::stats::QueueStats;

/// State shared between a processor's facade and its drain worker.
#[derive(Debug)]
pub(crate) struct ProcessorShared {
    disposed: AtomicBool,
    state: AtomicU8,
    worker: OnceLock<Thread>,
    pub(crate) stats: Arc<QueueStats>,
}

impl ProcessorShared {
    pub(crate) fn new(stats: Arc<QueueStats>) -> Self {
        Self {
            disposed: AtomicBool::new(false),
            state: AtomicU8::new(WorkerState::Idle.as_u8()),
            worker: OnceLock::new(),
            stats,
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Sets the stop flag. Returns `true` for the call that actually set it.
    pub(crate) fn mark_disposed(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn attach_worker(&self, thread: Thread) {
        let _ = self.worker.set(thread);
    }

    pub(crate) fn worker_id(&self) -> Option<ThreadId> {
        self.worker.get().map(Thread::id)
    }

    /// Cuts the worker's current sleep short.
    pub(crate) fn wake(&self) {
        if let Some(worker) = self.worker.get() {
            worker.unpark();
        }
    }
}

/// Where completion resolution runs.
#[derive(Debug, Clone)]
enum Resolver {
    /// On the task that finished the operation.
    Inline,
    /// On a freshly spawned runtime task.
    Deferred(Handle),
}

impl Resolver {
    fn new(mode: ResolveMode, runtime: &Handle) -> Self {
        match mode {
            ResolveMode::Inline => Resolver::Inline,
            ResolveMode::Deferred => Resolver::Deferred(runtime.clone()),
        }
    }

    fn resolve<T, E>(&self, source: CompletionSource<T, E>, result: CommandResult<T, E>)
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        match self {
            Resolver::Inline => {
                source.try_resolve(result);
            }
            Resolver::Deferred(runtime) => {
                runtime.spawn(async move {
                    source.try_resolve(result);
                });
            }
        }
    }
}

/// Everything the worker thread owns.
pub(crate) struct DrainWorker<X: CommandExecutor> {
    executor: Arc<X>,
    intake: IntakeReceiver<X>,
    runtime: Handle,
    resolver: Resolver,
    shared: Arc<ProcessorShared>,
    poll_interval: Duration,
}

impl<X: CommandExecutor> DrainWorker<X> {
    pub(crate) fn new(
        executor: Arc<X>,
        intake: IntakeReceiver<X>,
        runtime: Handle,
        resolve_mode: ResolveMode,
        shared: Arc<ProcessorShared>,
        poll_interval: Duration,
    ) -> Self {
        let resolver = Resolver::new(resolve_mode, &runtime);
        Self {
            executor,
            intake,
            runtime,
            resolver,
            shared,
            poll_interval,
        }
    }

    /// Runs until the processor is disposed, then performs one final pass
    /// over a closed intake queue.
    pub(crate) fn run(mut self) {
        info!(
            executor = self.executor.name(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "drain worker started"
        );
        loop {
            let stopping = self.shared.is_disposed();
            self.shared.set_state(WorkerState::Draining);
            let dispatched = if stopping {
                self.final_pass()
            } else {
                self.drain_pass()
            };
            if dispatched > 0 {
                recording::record_drain_batch(dispatched);
                trace!(dispatched, "drain pass complete");
            }
            if stopping {
                break;
            }
            self.shared.set_state(WorkerState::Idle);
            thread::park_timeout(self.poll_interval);
        }
        self.shared.set_state(WorkerState::Stopped);
        info!(executor = self.executor.name(), "drain worker stopped");
    }

    fn drain_pass(&mut self) -> usize {
        let mut dispatched = 0;
        while let Some(descriptor) = self.intake.try_dequeue() {
            self.dispatch_guarded(descriptor);
            dispatched += 1;
        }
        dispatched
    }

    fn final_pass(&mut self) -> usize {
        self.intake.close();
        let mut dispatched = 0;
        while let Some(descriptor) = self.intake.dequeue_closed() {
            self.dispatch_guarded(descriptor);
            dispatched += 1;
        }
        debug!(dispatched, "final drain pass complete");
        dispatched
    }

    fn dispatch_guarded(&self, descriptor: CommandDescriptor<X>) {
        let kind = descriptor.kind();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(descriptor))) {
            error!(
                %kind,
                panic = %dispatch::panic_message(payload.as_ref()),
                "dispatch panicked"
            );
        }
        self.shared.stats.record_dispatch();
        recording::record_dispatched(kind);
    }

    fn dispatch(&self, descriptor: CommandDescriptor<X>) {
        let kind = descriptor.kind();
        let CommandDescriptor {
            command,
            cancel,
            payload,
            enqueued_at,
        } = descriptor;
        trace!(%kind, "dispatching command");

        let executor = &self.executor;
        let token = cancel.clone();
        match payload {
            Payload::Scalar(source) => {
                let launched = self.launch(kind, &cancel, || executor.launch_scalar(command, token));
                self.attach(kind, enqueued_at, source, launched, scalar_or_default);
            }
            Payload::NonQuery(source) => {
                let launched =
                    self.launch(kind, &cancel, || executor.launch_non_query(command, token));
                self.attach(kind, enqueued_at, source, launched, identity);
            }
            Payload::Reader { behavior, source } => {
                let launched = self.launch(kind, &cancel, || {
                    executor.launch_reader(command, behavior, token)
                });
                self.attach(kind, enqueued_at, source, launched, identity);
            }
        }
    }

    fn launch<T>(
        &self,
        kind: CommandKind,
        cancel: &CancellationToken,
        start: impl FnOnce() -> LaunchResult<T, X::Error>,
    ) -> Result<OperationFuture<T, X::Error>, CommandError<X::Error>> {
        // Launch primitives may register timers or spawn driver tasks.
        let _runtime = self.runtime.enter();
        let launched = launch_guarded(self.executor.name(), kind, cancel, start);
        if matches!(&launched, Err(err) if !err.is_cancelled()) {
            self.shared.stats.record_launch_failure();
            recording::record_launch_failure(kind);
        }
        launched
    }

    fn attach<T, R>(
        &self,
        kind: CommandKind,
        enqueued_at: Instant,
        source: CompletionSource<R, X::Error>,
        launched: Result<OperationFuture<T, X::Error>, CommandError<X::Error>>,
        map: fn(T) -> R,
    ) where
        T: Send + 'static,
        R: Send + 'static,
    {
        match launched {
            Err(err) => {
                let result = Err(err);
                recording::record_duration(
                    kind,
                    dispatch::outcome(&result),
                    enqueued_at.elapsed().as_secs_f64(),
                );
                self.resolver.resolve(source, result);
            }
            Ok(operation) => {
                let resolver = self.resolver.clone();
                self.runtime.spawn(async move {
                    let result = run_guarded(operation, map).await;
                    recording::record_duration(
                        kind,
                        dispatch::outcome(&result),
                        enqueued_at.elapsed().as_secs_f64(),
                    );
                    resolver.resolve(source, result);
                });
            }
        }
    }
}

fn identity<T>(value: T) -> T {
    value
}
