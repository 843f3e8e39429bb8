// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams of the command queue.
//!
//! [`CommandExecutor`] is the downstream collaborator that knows how to start
//! an operation. [`CommandProcessor`] is the upstream seam a data-access
//! layer installs to route its commands through a chosen strategy.

pub mod executor;
pub mod processor;

pub use executor::{CommandExecutor, LaunchResult, OperationFuture};
pub use processor::{CommandFuture, CommandProcessor, CommandResult};
