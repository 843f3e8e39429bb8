// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide default processors, one per executor type.
//!
//! Applications build a [`QueueProcessor`] explicitly and install it at
//! their boundary; code deeper in the stack then reaches it through
//! [`QueuedCommand`] without threading the processor through every call.

use std::any::{Any, TypeId};
use std::sync::{Arc, LazyLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use dbq_core::{
    CommandError, CommandExecutor, CommandFuture, CommandProcessor, CommandResult, DbqError,
    ReaderBehavior,
};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::processor::QueueProcessor;

type AnyProcessor = Arc<dyn Any + Send + Sync>;

static DEFAULTS: LazyLock<DashMap<TypeId, AnyProcessor>> = LazyLock::new(DashMap::new);

/// Installs `processor` as the default for executor type `X`.
///
/// Fails if a default for `X` is already installed.
pub fn install_default<X: CommandExecutor>(
    processor: Arc<QueueProcessor<X>>,
) -> Result<(), DbqError> {
    match DEFAULTS.entry(TypeId::of::<X>()) {
        Entry::Occupied(_) => Err(DbqError::AlreadyInstalled {
            executor: std::any::type_name::<X>(),
        }),
        Entry::Vacant(slot) => {
            info!(
                executor = std::any::type_name::<X>(),
                "default command queue processor installed"
            );
            slot.insert(processor);
            Ok(())
        }
    }
}

/// Returns the default processor for executor type `X`, if installed.
pub fn default_processor<X: CommandExecutor>() -> Option<Arc<QueueProcessor<X>>> {
    let processor = DEFAULTS.get(&TypeId::of::<X>())?.value().clone();
    processor.downcast::<QueueProcessor<X>>().ok()
}

/// Removes and returns the default processor for executor type `X`.
///
/// The processor keeps running until its last handle is dropped or it is
/// disposed.
pub fn uninstall_default<X: CommandExecutor>() -> Option<Arc<QueueProcessor<X>>> {
    let (_, processor) = DEFAULTS.remove(&TypeId::of::<X>())?;
    processor.downcast::<QueueProcessor<X>>().ok()
}

/// Commands that can execute through their executor's default processor.
///
/// Each method fails with [`CommandError::NoDefaultProcessor`] when no
/// default is installed for `Self::Executor`.
pub trait QueuedCommand: Sized + Send + 'static {
    type Executor: CommandExecutor<Command = Self>;

    fn execute_scalar_queued(
        self,
    ) -> CommandResult<<Self::Executor as CommandExecutor>::Scalar, ExecutorError<Self>> {
        with_default::<Self::Executor, _>(|p| p.execute_scalar(self))
    }

    fn execute_scalar_queued_async(
        self,
        cancel: CancellationToken,
    ) -> CommandFuture<<Self::Executor as CommandExecutor>::Scalar, ExecutorError<Self>> {
        with_default_async::<Self::Executor, _, _>(|p| p.execute_scalar_async(self, cancel))
    }

    fn execute_non_query_queued(self) -> CommandResult<u64, ExecutorError<Self>> {
        with_default::<Self::Executor, _>(|p| p.execute_non_query(self))
    }

    fn execute_non_query_queued_async(
        self,
        cancel: CancellationToken,
    ) -> CommandFuture<u64, ExecutorError<Self>> {
        with_default_async::<Self::Executor, _, _>(|p| p.execute_non_query_async(self, cancel))
    }

    fn execute_reader_queued(
        self,
        behavior: ReaderBehavior,
    ) -> CommandResult<<Self::Executor as CommandExecutor>::Reader, ExecutorError<Self>> {
        with_default::<Self::Executor, _>(|p| p.execute_reader(self, behavior))
    }

    fn execute_reader_queued_async(
        self,
        behavior: ReaderBehavior,
        cancel: CancellationToken,
    ) -> CommandFuture<<Self::Executor as CommandExecutor>::Reader, ExecutorError<Self>> {
        with_default_async::<Self::Executor, _, _>(|p| {
            p.execute_reader_async(self, behavior, cancel)
        })
    }
}

/// Driver error type of a command's executor.
pub type ExecutorError<C> = <<C as QueuedCommand>::Executor as CommandExecutor>::Error;

fn with_default<X: CommandExecutor, T>(
    call: impl FnOnce(&QueueProcessor<X>) -> CommandResult<T, X::Error>,
) -> CommandResult<T, X::Error> {
    let processor = default_processor::<X>().ok_or(CommandError::NoDefaultProcessor)?;
    call(&processor)
}

fn with_default_async<X: CommandExecutor, T: Send + 'static, F>(call: F) -> CommandFuture<T, X::Error>
where
    F: FnOnce(&QueueProcessor<X>) -> CommandFuture<T, X::Error>,
{
    match default_processor::<X>() {
        Some(processor) => call(&processor),
        None => futures::future::ready(Err(CommandError::NoDefaultProcessor)).boxed(),
    }
}
