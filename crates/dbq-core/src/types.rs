// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by executors, processors, and configuration.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The operation kind carried by a queued command.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    /// Fetch the first column of the first row.
    Scalar,
    /// Execute a statement and report the affected row count.
    NonQuery,
    /// Open a row stream.
    Reader,
}

/// Row materialization hints for reader operations.
///
/// Mirrors the flags most drivers accept when opening a result stream.
/// Executors are free to ignore hints they cannot honor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderBehavior {
    /// Only the first result set is wanted.
    pub single_result: bool,
    /// At most one row is wanted.
    pub single_row: bool,
    /// Column metadata only, no rows.
    pub schema_only: bool,
    /// Columns will be read in order, allowing the driver to stream large values.
    pub sequential_access: bool,
    /// Include primary key metadata.
    pub key_info: bool,
    /// Close the underlying connection when the reader is dropped.
    pub close_connection: bool,
}

impl ReaderBehavior {
    pub fn single_row() -> Self {
        Self {
            single_row: true,
            single_result: true,
            ..Self::default()
        }
    }

    pub fn schema_only() -> Self {
        Self {
            schema_only: true,
            ..Self::default()
        }
    }
}

/// How a completion handle is resolved once its operation finishes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Resolve on the task that finished the operation. Awaiting tasks are
    /// woken, never run inline.
    #[default]
    Inline,
    /// Hand the resolution to a freshly spawned runtime task.
    Deferred,
}

/// Observable state of the drain worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum WorkerState {
    /// Waiting for the next poll tick or an enqueue wake-up.
    Idle,
    /// Popping and dispatching descriptors.
    Draining,
    /// Final drain done; no further descriptors will be dispatched.
    Stopped,
}

impl WorkerState {
    pub fn as_u8(self) -> u8 {
        match self {
            WorkerState::Idle => 0,
            WorkerState::Draining => 1,
            WorkerState::Stopped => 2,
        }
    }

    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Idle,
            1 => WorkerState::Draining,
            _ => WorkerState::Stopped,
        }
    }
}
