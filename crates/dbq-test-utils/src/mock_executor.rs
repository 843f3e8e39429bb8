// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable executor for deterministic queue tests.
//!
//! Each [`MockCommand`] carries the behavior its operation should exhibit.
//! The executor records every launch (command id, kind, thread) so tests can
//! assert origination order and which thread originated.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use dbq_core::{
    CommandExecutor, CommandKind, LaunchError, LaunchResult, OperationError, ReaderBehavior,
};
use dbq_queue::QueuedCommand;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

/// Driver error produced by the mock.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("mock error {code}: {message}")]
pub struct MockError {
    pub code: i32,
    pub message: String,
}

impl MockError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// What a mock operation does once launched.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Completes immediately with the value (row count for non-queries).
    Return(i64),
    /// Scalar fetch that produces no row value.
    ReturnNothing,
    /// Fails while running.
    Fail(MockError),
    /// Fails synchronously inside the launch primitive.
    FailLaunch(MockError),
    /// Panics inside the launch primitive.
    PanicOnLaunch,
    /// Panics while the operation is being polled.
    PanicWhileRunning,
    /// Completes with the value after the delay unless cancelled first.
    Delay(Duration, i64),
    /// Never completes on its own; resolves as cancelled once the token fires.
    WaitForCancel,
    /// Completes with `value` once `release` is cancelled.
    Gated {
        release: CancellationToken,
        value: i64,
    },
}

/// A command understood by [`MockExecutor`].
#[derive(Debug, Clone)]
pub struct MockCommand {
    pub id: u64,
    pub behavior: MockBehavior,
}

impl MockCommand {
    pub fn new(id: u64, behavior: MockBehavior) -> Self {
        Self { id, behavior }
    }

    /// Shorthand for a command that returns `value`.
    pub fn returning(id: u64, value: i64) -> Self {
        Self::new(id, MockBehavior::Return(value))
    }
}

impl QueuedCommand for MockCommand {
    type Executor = MockExecutor;
}

/// Row stream handed back for reader commands.
#[derive(Debug, Clone, PartialEq)]
pub struct MockReader {
    pub command_id: u64,
    pub behavior: ReaderBehavior,
    pub rows: Vec<i64>,
}

/// One recorded launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRecord {
    pub command_id: u64,
    pub kind: CommandKind,
    pub thread: ThreadId,
    pub thread_name: Option<String>,
}

/// Executor whose operations follow each command's [`MockBehavior`].
#[derive(Debug)]
pub struct MockExecutor {
    launches: Mutex<Vec<LaunchRecord>>,
    readers: bool,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            launches: Mutex::new(Vec::new()),
            readers: true,
        }
    }

    /// An executor that keeps the default, unsupported reader primitive.
    pub fn without_readers() -> Self {
        Self {
            launches: Mutex::new(Vec::new()),
            readers: false,
        }
    }

    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Command ids in origination order.
    pub fn launched_ids(&self) -> Vec<u64> {
        self.launches().into_iter().map(|l| l.command_id).collect()
    }

    pub fn launch_count(&self) -> usize {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Distinct threads that performed a launch.
    pub fn launch_threads(&self) -> HashSet<ThreadId> {
        self.launches().into_iter().map(|l| l.thread).collect()
    }

    fn record(&self, command: &MockCommand, kind: CommandKind) {
        let current = thread::current();
        let record = LaunchRecord {
            command_id: command.id,
            kind,
            thread: current.id(),
            thread_name: current.name().map(str::to_owned),
        };
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    fn launch<T: Send + 'static>(
        &self,
        command: MockCommand,
        kind: CommandKind,
        cancel: CancellationToken,
        finish: fn(Option<i64>) -> T,
    ) -> LaunchResult<T, MockError> {
        self.record(&command, kind);
        let behavior = match command.behavior {
            MockBehavior::FailLaunch(err) => return Err(LaunchError::Failed(err)),
            MockBehavior::PanicOnLaunch => panic!("mock launch panic for command {}", command.id),
            other => other,
        };
        Ok(async move { run(behavior, cancel).await.map(finish) }.boxed())
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

async fn run(
    behavior: MockBehavior,
    cancel: CancellationToken,
) -> Result<Option<i64>, OperationError<MockError>> {
    match behavior {
        MockBehavior::Return(value) => Ok(Some(value)),
        MockBehavior::ReturnNothing => Ok(None),
        MockBehavior::Fail(err) => Err(OperationError::Failed(err)),
        MockBehavior::PanicWhileRunning => {
            tokio::task::yield_now().await;
            panic!("mock operation panic");
        }
        MockBehavior::Delay(delay, value) => {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(OperationError::Cancelled),
                _ = tokio::time::sleep(delay) => Ok(Some(value)),
            }
        }
        MockBehavior::WaitForCancel => {
            cancel.cancelled().await;
            Err(OperationError::Cancelled)
        }
        MockBehavior::Gated { release, value } => {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(OperationError::Cancelled),
                _ = release.cancelled() => Ok(Some(value)),
            }
        }
        MockBehavior::FailLaunch(_) | MockBehavior::PanicOnLaunch => {
            unreachable!("launch-time behaviors never reach the running operation")
        }
    }
}

impl CommandExecutor for MockExecutor {
    type Command = MockCommand;
    type Scalar = i64;
    type Reader = MockReader;
    type Error = MockError;

    fn name(&self) -> &str {
        "mock"
    }

    fn launch_scalar(
        &self,
        command: MockCommand,
        cancel: CancellationToken,
    ) -> LaunchResult<Option<i64>, MockError> {
        self.launch(command, CommandKind::Scalar, cancel, |value| value)
    }

    fn launch_non_query(
        &self,
        command: MockCommand,
        cancel: CancellationToken,
    ) -> LaunchResult<u64, MockError> {
        self.launch(command, CommandKind::NonQuery, cancel, |value| {
            value.map_or(0, |v| v.unsigned_abs())
        })
    }

    fn launch_reader(
        &self,
        command: MockCommand,
        behavior: ReaderBehavior,
        cancel: CancellationToken,
    ) -> LaunchResult<MockReader, MockError> {
        if !self.readers {
            return Err(LaunchError::Unsupported(CommandKind::Reader));
        }
        let command_id = command.id;
        let operation = self.launch(command, CommandKind::Reader, cancel, |value| value)?;
        Ok(async move {
            let value = operation.await?;
            let rows = if behavior.schema_only {
                Vec::new()
            } else {
                value.into_iter().collect()
            };
            Ok(MockReader {
                command_id,
                behavior,
                rows,
            })
        }
        .boxed())
    }
}
