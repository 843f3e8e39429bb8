// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-execution strategy seam.

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::CommandError;
use crate::traits::executor::CommandExecutor;
use crate::types::ReaderBehavior;

/// Terminal result of one command.
pub type CommandResult<T, E> = Result<T, CommandError<E>>;

/// Future returned by the non-blocking entry points.
pub type CommandFuture<T, E> = BoxFuture<'static, CommandResult<T, E>>;

/// The six entry points a data-access layer forwards its commands to.
///
/// Installing a processor as the sole execution strategy means routing
/// every scalar, non-query and reader call through one of these methods.
/// Non-blocking entry points must originate (or enqueue) the command when
/// called, not when the returned future is first polled.
pub trait CommandProcessor<X: CommandExecutor>: Send + Sync {
    fn execute_scalar(&self, command: X::Command) -> CommandResult<X::Scalar, X::Error>;

    fn execute_scalar_async(
        &self,
        command: X::Command,
        cancel: CancellationToken,
    ) -> CommandFuture<X::Scalar, X::Error>;

    fn execute_non_query(&self, command: X::Command) -> CommandResult<u64, X::Error>;

    fn execute_non_query_async(
        &self,
        command: X::Command,
        cancel: CancellationToken,
    ) -> CommandFuture<u64, X::Error>;

    fn execute_reader(
        &self,
        command: X::Command,
        behavior: ReaderBehavior,
    ) -> CommandResult<X::Reader, X::Error>;

    fn execute_reader_async(
        &self,
        command: X::Command,
        behavior: ReaderBehavior,
        cancel: CancellationToken,
    ) -> CommandFuture<X::Reader, X::Error>;
}
