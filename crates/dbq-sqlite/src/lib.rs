// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite executor for the dbq command queue.
//!
//! Provides a [`CommandExecutor`](dbq_core::CommandExecutor) over a single
//! `tokio-rusqlite` connection: scalar fetches, non-query statements with
//! affected-row counts, and materialized row sets that honor the requested
//! [`ReaderBehavior`](dbq_core::ReaderBehavior).

pub mod error;
pub mod executor;
pub mod types;

pub use error::SqliteError;
pub use executor::SqliteExecutor;
pub use types::{RowSet, SqlCommand, SqlValue};
