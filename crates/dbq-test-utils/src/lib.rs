// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for dbq integration tests.
//!
//! Provides a scriptable executor and a queue harness for fast,
//! deterministic tests without a real database.
//!
//! # Components
//!
//! - [`MockExecutor`] - Executor whose operations follow per-command scripts
//! - [`QueueHarness`] - Running queue processor over a mock executor

pub mod harness;
pub mod mock_executor;

pub use harness::{QueueHarness, QueueHarnessBuilder};
pub use mock_executor::{
    LaunchRecord, MockBehavior, MockCommand, MockError, MockExecutor, MockReader,
};
