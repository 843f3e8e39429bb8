// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as interval bounds, known log levels, and non-empty names.

use crate::diagnostic::ConfigError;
use crate::model::DbqConfig;

/// Longest idle interval the drain worker may be configured with.
const MAX_POLL_INTERVAL_MS: u64 = 1_000;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &DbqConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let interval = config.queue.poll_interval_ms;
    if interval == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.poll_interval_ms must be at least 1 to avoid busy-spinning"
                .to_string(),
        });
    } else if interval > MAX_POLL_INTERVAL_MS {
        errors.push(ConfigError::Validation {
            message: format!(
                "queue.poll_interval_ms must be at most {MAX_POLL_INTERVAL_MS}, got {interval}"
            ),
        });
    }

    if config.queue.worker_thread_name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "queue.worker_thread_name must not be empty".to_string(),
        });
    }

    // Thread names are passed to the OS and may not contain NUL.
    if config.queue.worker_thread_name.contains('\0') {
        errors.push(ConfigError::Validation {
            message: "queue.worker_thread_name must not contain NUL bytes".to_string(),
        });
    }

    let level = config.log.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{}` is not one of {}",
                config.log.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.sqlite.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "sqlite.database_path must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
