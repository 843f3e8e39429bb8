// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Suspending a synchronous caller until a completion resolves.

use std::future::Future;
use std::thread::{self, ThreadId};

use dbq_core::{CommandError, CommandKind};
use tokio::runtime::{Handle, RuntimeFlavor};

/// How a blocking entry point waits on the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Waiter {
    /// No runtime on this thread: park it.
    Park,
    /// Multi-thread runtime worker: hand its other tasks off first.
    BlockInPlace,
}

impl Waiter {
    /// Decides how the current thread may block, or why it must not.
    ///
    /// `operations` is the runtime launched operations and their
    /// continuations run on. A current-thread caller may park only when that
    /// is a multi-thread runtime, which is then necessarily a different one
    /// from the caller's. Checked before anything is enqueued so a refused
    /// call has no effect.
    pub(crate) fn for_current_thread<E>(
        kind: CommandKind,
        drain_worker: Option<ThreadId>,
        operations: Option<&Handle>,
    ) -> Result<Self, CommandError<E>> {
        if drain_worker == Some(thread::current().id()) {
            return Err(CommandError::WorkerReentry(kind));
        }
        let Ok(caller) = Handle::try_current() else {
            return Ok(Waiter::Park);
        };
        if caller.runtime_flavor() == RuntimeFlavor::MultiThread {
            return Ok(Waiter::BlockInPlace);
        }
        let runs_elsewhere = operations
            .is_some_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread);
        if runs_elsewhere {
            Ok(Waiter::Park)
        } else {
            Err(CommandError::BlockingInAsyncContext(kind))
        }
    }

    pub(crate) fn wait<F: Future>(self, future: F) -> F::Output {
        match self {
            Waiter::Park => futures::executor::block_on(future),
            Waiter::BlockInPlace => {
                tokio::task::block_in_place(|| futures::executor::block_on(future))
            }
        }
    }
}
