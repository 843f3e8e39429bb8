// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Downstream executor trait: the "start and report completion" primitives.

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::{LaunchError, OperationError};
use crate::types::{CommandKind, ReaderBehavior};

/// A started operation. Resolves exactly once to a value, a cancellation,
/// or a driver failure.
pub type OperationFuture<T, E> = BoxFuture<'static, Result<T, OperationError<E>>>;

/// Result of calling a launch primitive.
///
/// `Err` is a launch failure: the operation never started.
pub type LaunchResult<T, E> = Result<OperationFuture<T, E>, LaunchError<E>>;

/// A driver-facing executor that can originate each operation kind.
///
/// Launch primitives are synchronous: they perform whatever work the driver
/// does at origination time (timer registration, statement preparation,
/// request submission) on the calling thread and hand back a `'static`
/// future for the remainder. The queue processor calls them only from its
/// drain worker, inside the tokio runtime context it was built with.
pub trait CommandExecutor: Send + Sync + 'static {
    /// The opaque, ready-to-execute command.
    type Command: Send + 'static;

    /// Scalar result. `Default` is delivered when a scalar fetch yields no
    /// row value.
    type Scalar: Default + Send + 'static;

    /// Handle to an opened row stream.
    type Reader: Send + 'static;

    /// Driver error, delivered to callers unmodified.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns a short name for this executor, used in logs.
    fn name(&self) -> &str;

    /// Starts a scalar fetch. `Ok(None)` from the future means the statement
    /// produced no row value.
    fn launch_scalar(
        &self,
        command: Self::Command,
        cancel: CancellationToken,
    ) -> LaunchResult<Option<Self::Scalar>, Self::Error>;

    /// Starts a statement and reports the number of affected rows.
    fn launch_non_query(
        &self,
        command: Self::Command,
        cancel: CancellationToken,
    ) -> LaunchResult<u64, Self::Error>;

    /// Opens a row stream.
    ///
    /// Executors without row streams keep the default, which reports the
    /// kind as unsupported.
    fn launch_reader(
        &self,
        command: Self::Command,
        behavior: ReaderBehavior,
        cancel: CancellationToken,
    ) -> LaunchResult<Self::Reader, Self::Error> {
        let _ = (command, behavior, cancel);
        Err(LaunchError::Unsupported(CommandKind::Reader))
    }
}
