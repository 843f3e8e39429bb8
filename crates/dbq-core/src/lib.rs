// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the dbq command queue.
//!
//! This crate provides the error types, shared types, and trait seams used
//! throughout the dbq workspace. Executors (database drivers) implement
//! [`CommandExecutor`]; processing strategies implement [`CommandProcessor`].

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CommandError, DbqError, LaunchError, OperationError};
pub use types::{CommandKind, ReaderBehavior, ResolveMode, WorkerState};

pub use traits::{
    CommandExecutor, CommandFuture, CommandProcessor, CommandResult, LaunchResult,
    OperationFuture,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("driver: {0}")]
    struct DriverError(&'static str);

    #[test]
    fn dbq_error_has_all_variants() {
        let _config = DbqError::Config("test".into());
        let _runtime = DbqError::Runtime("test".into());
        let _spawn = DbqError::WorkerSpawn {
            source: std::io::Error::other("test"),
        };
        let _installed = DbqError::AlreadyInstalled { executor: "mock" };
        let _storage = DbqError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _internal = DbqError::Internal("test".into());
    }

    #[test]
    fn driver_error_display_is_transparent() {
        let err: CommandError<DriverError> = CommandError::Driver(DriverError("no such table"));
        assert_eq!(err.to_string(), "driver: no such table");
        assert_eq!(err.into_driver(), Some(DriverError("no such table")));
    }

    #[test]
    fn operation_error_maps_onto_command_error() {
        let cancelled: CommandError<DriverError> = OperationError::Cancelled.into();
        assert!(cancelled.is_cancelled());

        let failed: CommandError<DriverError> =
            OperationError::Failed(DriverError("boom")).into();
        assert_eq!(failed.driver(), Some(&DriverError("boom")));
    }

    #[test]
    fn launch_error_maps_onto_command_error() {
        let unsupported: CommandError<DriverError> =
            LaunchError::Unsupported(CommandKind::Reader).into();
        assert!(matches!(unsupported, CommandError::Unsupported(CommandKind::Reader)));
        assert_eq!(
            unsupported.to_string(),
            "command kind `reader` is not supported by this executor"
        );
    }

    #[test]
    fn command_kind_round_trips_through_strings() {
        use std::str::FromStr;

        for kind in [CommandKind::Scalar, CommandKind::NonQuery, CommandKind::Reader] {
            let parsed = CommandKind::from_str(&kind.to_string()).expect("should parse back");
            assert_eq!(kind, parsed);
        }
        assert_eq!(CommandKind::NonQuery.to_string(), "non-query");
    }

    #[test]
    fn resolve_mode_serialization() {
        let json = serde_json::to_string(&ResolveMode::Deferred).expect("should serialize");
        assert_eq!(json, "\"deferred\"");
        let parsed: ResolveMode = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(parsed, ResolveMode::Deferred);
        assert_eq!(ResolveMode::default(), ResolveMode::Inline);
    }

    #[test]
    fn worker_state_u8_encoding() {
        for state in [WorkerState::Idle, WorkerState::Draining, WorkerState::Stopped] {
            assert_eq!(WorkerState::from_u8(state.as_u8()), state);
        }
    }

    #[test]
    fn reader_behavior_presets() {
        assert!(ReaderBehavior::single_row().single_row);
        assert!(ReaderBehavior::schema_only().schema_only);
        assert_eq!(ReaderBehavior::default(), ReaderBehavior {
            single_result: false,
            single_row: false,
            schema_only: false,
            sequential_access: false,
            key_info: false,
            close_connection: false,
        });
    }
}
