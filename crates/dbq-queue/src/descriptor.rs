// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command descriptors: one queued unit of work and where its result goes.

use std::time::Instant;

use dbq_core::{CommandError, CommandExecutor, CommandKind, ReaderBehavior};
use tokio_util::sync::CancellationToken;

use crate::completion::CompletionSource;

/// Kind-specific part of a descriptor: the completion source typed for the
/// operation's result, plus reader hints.
pub enum Payload<X: CommandExecutor> {
    Scalar(CompletionSource<X::Scalar, X::Error>),
    NonQuery(CompletionSource<u64, X::Error>),
    Reader {
        behavior: ReaderBehavior,
        source: CompletionSource<X::Reader, X::Error>,
    },
}

impl<X: CommandExecutor> Payload<X> {
    pub fn kind(&self) -> CommandKind {
        match self {
            Payload::Scalar(_) => CommandKind::Scalar,
            Payload::NonQuery(_) => CommandKind::NonQuery,
            Payload::Reader { .. } => CommandKind::Reader,
        }
    }
}

/// A queued command. Immutable once built; consumed by dispatch.
pub struct CommandDescriptor<X: CommandExecutor> {
    pub(crate) command: X::Command,
    pub(crate) cancel: CancellationToken,
    pub(crate) payload: Payload<X>,
    pub(crate) enqueued_at: Instant,
}

impl<X: CommandExecutor> CommandDescriptor<X> {
    pub fn new(command: X::Command, cancel: CancellationToken, payload: Payload<X>) -> Self {
        Self {
            command,
            cancel,
            payload,
            enqueued_at: Instant::now(),
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.payload.kind()
    }

    /// Resolves the descriptor's completion with an error without launching it.
    ///
    /// Returns `true` if the completion was still pending.
    pub fn reject(self, error: CommandError<X::Error>) -> bool {
        match self.payload {
            Payload::Scalar(source) => source.try_set_error(error),
            Payload::NonQuery(source) => source.try_set_error(error),
            Payload::Reader { source, .. } => source.try_set_error(error),
        }
    }
}

impl<X: CommandExecutor> std::fmt::Debug for CommandDescriptor<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("kind", &self.kind())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}
