// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue facade: blocking and non-blocking entry points per command kind.
//!
//! Every entry point builds a descriptor, counts it in the backlog and pushes
//! it onto the intake queue. Only the drain worker originates operations, so
//! callers on any number of threads never start database work themselves.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use dbq_config::QueueConfig;
use dbq_core::{
    CommandError, CommandExecutor, CommandFuture, CommandKind, CommandProcessor, CommandResult,
    DbqError, ReaderBehavior, WorkerState,
};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::blocking::Waiter;
use crate::completion::{completion, Completion};
use crate::descriptor::{CommandDescriptor, Payload};
use crate::intake::{intake_queue, IntakeQueue};
use crate::recording;
use crate::stats::{QueueStats, QueueStatsSnapshot};
use crate::worker::{DrainWorker, ProcessorShared};

/// Builder for [`QueueProcessor`].
pub struct QueueProcessorBuilder<X: CommandExecutor> {
    executor: Arc<X>,
    config: QueueConfig,
    runtime: Option<Handle>,
    stats: Option<Arc<QueueStats>>,
}

impl<X: CommandExecutor> QueueProcessorBuilder<X> {
    /// Queue settings. Defaults to [`QueueConfig::default`].
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    /// Runtime that runs launched operations and their continuations.
    /// Defaults to the runtime of the thread calling [`start`](Self::start).
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Counters to report into. Defaults to [`QueueStats::global`].
    pub fn stats(mut self, stats: Arc<QueueStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Spawns the drain worker and returns the running processor.
    pub fn start(self) -> Result<QueueProcessor<X>, DbqError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| DbqError::Runtime(e.to_string()))?,
        };
        let stats = self.stats.unwrap_or_else(QueueStats::global);
        let shared = Arc::new(ProcessorShared::new(stats));
        let (intake, receiver) = intake_queue();

        let worker = DrainWorker::new(
            Arc::clone(&self.executor),
            receiver,
            runtime.clone(),
            self.config.resolve_mode,
            Arc::clone(&shared),
            self.config.poll_interval(),
        );
        let handle = thread::Builder::new()
            .name(self.config.worker_thread_name.clone())
            .spawn(move || worker.run())
            .map_err(|source| DbqError::WorkerSpawn { source })?;
        shared.attach_worker(handle.thread().clone());

        info!(
            executor = self.executor.name(),
            thread = %self.config.worker_thread_name,
            resolve_mode = %self.config.resolve_mode,
            wake_on_enqueue = self.config.wake_on_enqueue,
            "command queue processor started"
        );

        Ok(QueueProcessor {
            executor: self.executor,
            intake,
            shared,
            runtime,
            worker: Mutex::new(Some(handle)),
            wake_on_enqueue: self.config.wake_on_enqueue,
        })
    }
}

/// Routes every command through a single drain worker.
///
/// Dropping the processor disposes it.
pub struct QueueProcessor<X: CommandExecutor> {
    executor: Arc<X>,
    intake: IntakeQueue<X>,
    shared: Arc<ProcessorShared>,
    runtime: Handle,
    worker: Mutex<Option<JoinHandle<()>>>,
    wake_on_enqueue: bool,
}

impl<X: CommandExecutor> QueueProcessor<X> {
    pub fn builder(executor: Arc<X>) -> QueueProcessorBuilder<X> {
        QueueProcessorBuilder {
            executor,
            config: QueueConfig::default(),
            runtime: None,
            stats: None,
        }
    }

    /// Starts a processor with default settings on the current runtime.
    pub fn start(executor: Arc<X>) -> Result<Self, DbqError> {
        Self::builder(executor).start()
    }

    pub fn executor(&self) -> &Arc<X> {
        &self.executor
    }

    pub fn worker_state(&self) -> WorkerState {
        self.shared.state()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    pub fn stats(&self) -> QueueStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Current backlog of the counters this processor reports into.
    pub fn queued(&self) -> usize {
        self.shared.stats.queued()
    }

    /// Enqueues a scalar fetch. The command is queued before this returns.
    pub fn submit_scalar(
        &self,
        command: X::Command,
        cancel: CancellationToken,
    ) -> Completion<X::Scalar, X::Error> {
        let (source, completion) = completion();
        self.enqueue(CommandDescriptor::new(command, cancel, Payload::Scalar(source)));
        completion
    }

    /// Enqueues a non-query statement. The command is queued before this returns.
    pub fn submit_non_query(
        &self,
        command: X::Command,
        cancel: CancellationToken,
    ) -> Completion<u64, X::Error> {
        let (source, completion) = completion();
        self.enqueue(CommandDescriptor::new(command, cancel, Payload::NonQuery(source)));
        completion
    }

    /// Enqueues a row-stream open. The command is queued before this returns.
    pub fn submit_reader(
        &self,
        command: X::Command,
        behavior: ReaderBehavior,
        cancel: CancellationToken,
    ) -> Completion<X::Reader, X::Error> {
        let (source, completion) = completion();
        self.enqueue(CommandDescriptor::new(
            command,
            cancel,
            Payload::Reader { behavior, source },
        ));
        completion
    }

    fn enqueue(&self, descriptor: CommandDescriptor<X>) {
        let kind = descriptor.kind();
        self.shared.stats.increment();
        let refused = if self.shared.is_disposed() {
            Some(descriptor)
        } else {
            self.intake.enqueue(descriptor).err()
        };
        match refused {
            None => {
                self.shared.stats.record_enqueue();
                recording::record_enqueued(kind);
                if self.wake_on_enqueue {
                    self.shared.wake();
                }
            }
            Some(descriptor) => {
                self.shared.stats.record_rejection();
                recording::record_rejected(kind);
                debug!(%kind, "command rejected by disposed processor");
                descriptor.reject(CommandError::Disposed);
            }
        }
    }

    fn waiter(&self, kind: CommandKind) -> Result<Waiter, CommandError<X::Error>> {
        Waiter::for_current_thread(kind, self.shared.worker_id(), Some(&self.runtime))
    }

    /// Stops the drain worker after one final pass.
    ///
    /// Every command accepted before this call is still originated; later
    /// submissions resolve with [`CommandError::Disposed`]. Idempotent.
    pub fn dispose(&self) {
        if !self.shared.mark_disposed() {
            return;
        }
        info!(
            executor = self.executor.name(),
            backlog = self.shared.stats.queued(),
            "disposing command queue processor"
        );
        self.shared.wake();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return;
        };
        // Disposed from inside a launch: the worker finishes on its own.
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            error!(executor = self.executor.name(), "drain worker panicked");
        }
    }
}

impl<X: CommandExecutor> CommandProcessor<X> for QueueProcessor<X> {
    fn execute_scalar(&self, command: X::Command) -> CommandResult<X::Scalar, X::Error> {
        let waiter = self.waiter(CommandKind::Scalar)?;
        waiter.wait(self.submit_scalar(command, CancellationToken::new()))
    }

    fn execute_scalar_async(
        &self,
        command: X::Command,
        cancel: CancellationToken,
    ) -> CommandFuture<X::Scalar, X::Error> {
        self.submit_scalar(command, cancel).boxed()
    }

    fn execute_non_query(&self, command: X::Command) -> CommandResult<u64, X::Error> {
        let waiter = self.waiter(CommandKind::NonQuery)?;
        waiter.wait(self.submit_non_query(command, CancellationToken::new()))
    }

    fn execute_non_query_async(
        &self,
        command: X::Command,
        cancel: CancellationToken,
    ) -> CommandFuture<u64, X::Error> {
        self.submit_non_query(command, cancel).boxed()
    }

    fn execute_reader(
        &self,
        command: X::Command,
        behavior: ReaderBehavior,
    ) -> CommandResult<X::Reader, X::Error> {
        let waiter = self.waiter(CommandKind::Reader)?;
        waiter.wait(self.submit_reader(command, behavior, CancellationToken::new()))
    }

    fn execute_reader_async(
        &self,
        command: X::Command,
        behavior: ReaderBehavior,
        cancel: CancellationToken,
    ) -> CommandFuture<X::Reader, X::Error> {
        self.submit_reader(command, behavior, cancel).boxed()
    }
}

impl<X: CommandExecutor> Drop for QueueProcessor<X> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<X: CommandExecutor> std::fmt::Debug for QueueProcessor<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueProcessor")
            .field("executor", &self.executor.name())
            .field("state", &self.worker_state())
            .field("disposed", &self.is_disposed())
            .field("queued", &self.queued())
            .finish()
    }
}
