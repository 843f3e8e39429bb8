// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unqueued processor: originates each operation on the calling thread.
//!
//! This is the baseline strategy the queue processor replaces. It shares the
//! launch guards and result mapping with the drain worker, so the two differ
//! only in which thread performs origination. When a runtime is known the
//! launched operation is spawned onto it, so it makes progress whether or
//! not the caller polls the returned future.

use std::sync::Arc;

use dbq_core::{
    CommandError, CommandExecutor, CommandFuture, CommandKind, CommandProcessor, CommandResult,
    LaunchResult, ReaderBehavior,
};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::blocking::Waiter;
use crate::dispatch::{launch_guarded, run_guarded, scalar_or_default};

/// Calls the executor's launch primitives directly from each entry point.
pub struct DirectProcessor<X: CommandExecutor> {
    executor: Arc<X>,
    runtime: Option<Handle>,
}

impl<X: CommandExecutor> DirectProcessor<X> {
    /// Uses the current thread's runtime, if any, for launched operations.
    pub fn new(executor: Arc<X>) -> Self {
        Self {
            executor,
            runtime: Handle::try_current().ok(),
        }
    }

    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn executor(&self) -> &Arc<X> {
        &self.executor
    }

    fn waiter(&self, kind: CommandKind) -> Result<Waiter, CommandError<X::Error>> {
        Waiter::for_current_thread(kind, None, self.runtime.as_ref())
    }

    fn originate<T, R>(
        &self,
        kind: CommandKind,
        cancel: &CancellationToken,
        start: impl FnOnce() -> LaunchResult<T, X::Error>,
        map: fn(T) -> R,
    ) -> CommandFuture<R, X::Error>
    where
        T: Send + 'static,
        R: Send + 'static,
    {
        let launched = {
            let _runtime = self.runtime.as_ref().map(Handle::enter);
            launch_guarded(self.executor.name(), kind, cancel, start)
        };
        let operation = match launched {
            Ok(operation) => run_guarded(operation, map),
            Err(err) => return futures::future::ready(Err(err)).boxed(),
        };
        match &self.runtime {
            Some(runtime) => {
                let task = runtime.spawn(operation);
                async move { task.await.unwrap_or(Err(CommandError::Abandoned)) }.boxed()
            }
            None => operation.boxed(),
        }
    }
}

impl<X: CommandExecutor> Clone for DirectProcessor<X> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            runtime: self.runtime.clone(),
        }
    }
}

impl<X: CommandExecutor> CommandProcessor<X> for DirectProcessor<X> {
    fn execute_scalar(&self, command: X::Command) -> CommandResult<X::Scalar, X::Error> {
        let waiter = self.waiter(CommandKind::Scalar)?;
        waiter.wait(self.execute_scalar_async(command, CancellationToken::new()))
    }

    fn execute_scalar_async(
        &self,
        command: X::Command,
        cancel: CancellationToken,
    ) -> CommandFuture<X::Scalar, X::Error> {
        let token = cancel.clone();
        self.originate(
            CommandKind::Scalar,
            &cancel,
            || self.executor.launch_scalar(command, token),
            scalar_or_default,
        )
    }

    fn execute_non_query(&self, command: X::Command) -> CommandResult<u64, X::Error> {
        let waiter = self.waiter(CommandKind::NonQuery)?;
        waiter.wait(self.execute_non_query_async(command, CancellationToken::new()))
    }

    fn execute_non_query_async(
        &self,
        command: X::Command,
        cancel: CancellationToken,
    ) -> CommandFuture<u64, X::Error> {
        let token = cancel.clone();
        self.originate(
            CommandKind::NonQuery,
            &cancel,
            || self.executor.launch_non_query(command, token),
            |rows| rows,
        )
    }

    fn execute_reader(
        &self,
        command: X::Command,
        behavior: ReaderBehavior,
    ) -> CommandResult<X::Reader, X::Error> {
        let waiter = self.waiter(CommandKind::Reader)?;
        waiter.wait(self.execute_reader_async(command, behavior, CancellationToken::new()))
    }

    fn execute_reader_async(
        &self,
        command: X::Command,
        behavior: ReaderBehavior,
        cancel: CancellationToken,
    ) -> CommandFuture<X::Reader, X::Error> {
        let token = cancel.clone();
        self.originate(
            CommandKind::Reader,
            &cancel,
            || self.executor.launch_reader(command, behavior, token),
            |reader| reader,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;
    use std::time::Duration;

    use dbq_test_utils::{MockBehavior, MockCommand, MockError, MockExecutor};

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn originates_on_the_calling_thread() {
        let processor = DirectProcessor::new(Arc::new(MockExecutor::new()));
        let caller = thread::current().id();

        let value = processor
            .execute_scalar_async(MockCommand::returning(1, 4), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(value, 4);
        assert_eq!(
            processor.executor().launch_threads(),
            HashSet::from([caller])
        );
    }

    #[test]
    fn explicit_runtime_drives_operations_from_a_plain_thread() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let processor = DirectProcessor::new(Arc::new(MockExecutor::new()))
            .with_runtime(runtime.handle().clone());

        let value = processor
            .execute_scalar(MockCommand::new(1, MockBehavior::Delay(Duration::from_millis(10), 3)))
            .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shares_error_mapping_with_the_queue() {
        let processor = DirectProcessor::new(Arc::new(MockExecutor::without_readers()));

        let err = processor
            .execute_non_query_async(
                MockCommand::new(1, MockBehavior::Fail(MockError::new(8, "readonly"))),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.into_driver(), Some(MockError::new(8, "readonly")));

        let err = processor
            .execute_reader_async(
                MockCommand::returning(2, 1),
                ReaderBehavior::default(),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Unsupported(CommandKind::Reader)));

        let value = processor
            .execute_scalar_async(
                MockCommand::new(3, MockBehavior::ReturnNothing),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(value, 0);
    }

    #[test]
    fn blocking_call_without_runtime() {
        let processor = DirectProcessor::new(Arc::new(MockExecutor::new()));
        assert_eq!(processor.execute_non_query(MockCommand::returning(1, 9)).unwrap(), 9);
    }
}
