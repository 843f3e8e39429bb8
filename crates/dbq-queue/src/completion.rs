// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot completion handles.
//!
//! A [`CompletionSource`] is the producer half: cloneable, resolvable from any
//! thread, and first-resolver-wins. A [`Completion`] is the consumer half: a
//! future yielding the terminal result. The winning resolver is decided by a
//! single compare-and-swap on the state word, so a late cancellation racing a
//! successful completion can never produce two terminal states.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use dbq_core::{CommandError, CommandResult};
use tokio::sync::oneshot;

const PENDING: u8 = 0;
const VALUE: u8 = 1;
const CANCELLED: u8 = 2;
const FAILED: u8 = 3;

/// Observable state of a completion handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Pending,
    Value,
    Cancelled,
    Failed,
}

impl CompletionState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            PENDING => CompletionState::Pending,
            VALUE => CompletionState::Value,
            CANCELLED => CompletionState::Cancelled,
            _ => CompletionState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != CompletionState::Pending
    }
}

struct Shared<T, E> {
    state: AtomicU8,
    sources: AtomicUsize,
    sender: Mutex<Option<oneshot::Sender<CommandResult<T, E>>>>,
}

/// Creates a linked source/completion pair in the pending state.
pub fn completion<T, E>() -> (CompletionSource<T, E>, Completion<T, E>) {
    let (tx, rx) = oneshot::channel();
    let shared = Arc::new(Shared {
        state: AtomicU8::new(PENDING),
        sources: AtomicUsize::new(1),
        sender: Mutex::new(Some(tx)),
    });
    (
        CompletionSource {
            shared: Arc::clone(&shared),
        },
        Completion { rx, shared },
    )
}

/// Producer half of a completion handle.
pub struct CompletionSource<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for CompletionSource<T, E> {
    fn clone(&self) -> Self {
        self.shared.sources.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> Drop for CompletionSource<T, E> {
    fn drop(&mut self) {
        if self.shared.sources.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        // Last source gone while pending: close the channel so the awaiting
        // side observes `Abandoned`.
        if self
            .shared
            .state
            .compare_exchange(PENDING, FAILED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            drop(
                self.shared
                    .sender
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take(),
            );
        }
    }
}

impl<T, E> CompletionSource<T, E> {
    /// Resolves the handle with `result` if it is still pending.
    ///
    /// Returns `true` if this call performed the terminal transition. Later
    /// calls are no-ops returning `false`.
    pub fn try_resolve(&self, result: CommandResult<T, E>) -> bool {
        let next = match &result {
            Ok(_) => VALUE,
            Err(CommandError::Cancelled) => CANCELLED,
            Err(_) => FAILED,
        };
        if self
            .shared
            .state
            .compare_exchange(PENDING, next, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let sender = self
            .shared
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = sender {
            // The awaiting side may already be gone; the state still records the outcome.
            let _ = tx.send(result);
        }
        true
    }

    pub fn try_set_value(&self, value: T) -> bool {
        self.try_resolve(Ok(value))
    }

    pub fn try_set_cancelled(&self) -> bool {
        self.try_resolve(Err(CommandError::Cancelled))
    }

    pub fn try_set_error(&self, error: CommandError<E>) -> bool {
        self.try_resolve(Err(error))
    }

    pub fn state(&self) -> CompletionState {
        CompletionState::from_raw(self.shared.state.load(Ordering::Acquire))
    }

    /// Returns `true` once the consumer half has been dropped.
    pub fn is_orphaned(&self) -> bool {
        self.shared
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| tx.is_closed())
    }
}

/// Consumer half of a completion handle.
///
/// Resolves to [`CommandError::Abandoned`] if every source is dropped while
/// the handle is still pending.
#[must_use = "a completion does nothing unless awaited or waited on"]
pub struct Completion<T, E> {
    rx: oneshot::Receiver<CommandResult<T, E>>,
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Completion<T, E> {
    /// A completion that is already resolved with `result`.
    pub fn ready(result: CommandResult<T, E>) -> Self {
        let (source, completion) = completion();
        source.try_resolve(result);
        completion
    }

    pub fn state(&self) -> CompletionState {
        CompletionState::from_raw(self.shared.state.load(Ordering::Acquire))
    }
}

impl<T, E> Future for Completion<T, E> {
    type Output = CommandResult<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(CommandError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T, E> std::fmt::Debug for Completion<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("state", &self.state())
            .finish()
    }
}

impl<T, E> std::fmt::Debug for CompletionSource<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSource")
            .field("state", &self.state())
            .finish()
    }
}
