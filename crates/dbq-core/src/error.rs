// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the dbq command queue.
//!
//! Two layers exist: [`DbqError`] covers processor lifecycle and setup
//! (configuration, runtime, worker thread), while [`CommandError`] is the
//! terminal failure delivered to the caller of a single queued command.

use thiserror::Error;

use crate::types::CommandKind;

/// The primary error type for processor construction and lifecycle.
#[derive(Debug, Error)]
pub enum DbqError {
    /// Configuration errors (invalid TOML, failed validation).
    #[error("configuration error: {0}")]
    Config(String),

    /// No tokio runtime was available to run launched operations on.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// The drain worker thread could not be spawned.
    #[error("failed to spawn drain worker thread: {source}")]
    WorkerSpawn {
        #[source]
        source: std::io::Error,
    },

    /// A default processor for this executor type is already installed.
    #[error("a default processor is already installed for executor `{executor}`")]
    AlreadyInstalled { executor: &'static str },

    /// Storage backend errors (database open, pragma setup).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Terminal failure of a single command, generic over the driver error `E`.
///
/// Driver errors are carried unmodified in [`CommandError::Driver`] so callers
/// can match on the original error value.
#[derive(Debug, Error)]
pub enum CommandError<E> {
    /// The driver failed, either while launching or while running the operation.
    #[error(transparent)]
    Driver(E),

    /// The operation observed its cancellation token.
    #[error("command was cancelled")]
    Cancelled,

    /// The executor does not implement this operation kind.
    #[error("command kind `{0}` is not supported by this executor")]
    Unsupported(CommandKind),

    /// Launching or polling the operation panicked.
    #[error("command panicked: {0}")]
    Panicked(String),

    /// The processor was disposed before the command was accepted.
    #[error("command queue processor is disposed")]
    Disposed,

    /// Every completion source was dropped without resolving.
    #[error("command was abandoned before it completed")]
    Abandoned,

    /// A blocking entry point was called on the drain worker thread.
    #[error("blocking `{0}` call issued on the drain worker thread")]
    WorkerReentry(CommandKind),

    /// A blocking entry point was called inside a current-thread runtime.
    #[error("blocking `{0}` call issued inside a current-thread runtime")]
    BlockingInAsyncContext(CommandKind),

    /// The default-instance entry points were used before `install_default`.
    #[error("no default command queue processor is installed")]
    NoDefaultProcessor,
}

impl<E> CommandError<E> {
    /// Returns `true` if the command terminated by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Cancelled)
    }

    /// Returns the driver error if this failure originated in the driver.
    pub fn into_driver(self) -> Option<E> {
        match self {
            CommandError::Driver(err) => Some(err),
            _ => None,
        }
    }

    /// Borrows the driver error if this failure originated in the driver.
    pub fn driver(&self) -> Option<&E> {
        match self {
            CommandError::Driver(err) => Some(err),
            _ => None,
        }
    }
}

/// Failure reported by a running operation.
#[derive(Debug, Error)]
pub enum OperationError<E> {
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Failed(E),
}

impl<E> From<OperationError<E>> for CommandError<E> {
    fn from(err: OperationError<E>) -> Self {
        match err {
            OperationError::Cancelled => CommandError::Cancelled,
            OperationError::Failed(e) => CommandError::Driver(e),
        }
    }
}

/// Failure reported synchronously by an executor's launch primitive.
#[derive(Debug, Error)]
pub enum LaunchError<E> {
    #[error("command kind `{0}` is not supported by this executor")]
    Unsupported(CommandKind),

    #[error(transparent)]
    Failed(E),
}

impl<E> From<LaunchError<E>> for CommandError<E> {
    fn from(err: LaunchError<E>) -> Self {
        match err {
            LaunchError::Unsupported(kind) => CommandError::Unsupported(kind),
            LaunchError::Failed(e) => CommandError::Driver(e),
        }
    }
}
