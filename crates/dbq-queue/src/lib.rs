// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-origination command queue processor.
//!
//! A [`QueueProcessor`] funnels every database command through one dedicated
//! drain worker thread:
//! - Callers on any thread enqueue a descriptor and get a [`Completion`]
//! - The drain worker launches each operation in FIFO order without waiting
//! - A continuation on the tokio runtime resolves the caller's completion
//! - Disposal runs one last pass so nothing accepted is ever dropped
//!
//! [`DirectProcessor`] implements the same [`CommandProcessor`] seam without
//! the queue, originating on the calling thread.

pub mod completion;
pub mod descriptor;
pub mod direct;
pub mod global;
pub mod intake;
pub mod processor;
pub mod recording;
pub mod stats;

mod blocking;
mod dispatch;
mod worker;

pub use completion::{completion, Completion, CompletionSource, CompletionState};
pub use descriptor::{CommandDescriptor, Payload};
pub use direct::DirectProcessor;
pub use global::{
    default_processor, install_default, uninstall_default, ExecutorError, QueuedCommand,
};
pub use intake::{intake_queue, IntakeQueue, IntakeReceiver};
pub use processor::{QueueProcessor, QueueProcessorBuilder};
pub use stats::{QueueStats, QueueStatsSnapshot};

pub use dbq_core::{CommandError, CommandProcessor, ReaderBehavior, ResolveMode, WorkerState};
