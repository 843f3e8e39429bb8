// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./dbq.toml` > `~/.config/dbq/dbq.toml` > `/etc/dbq/dbq.toml`
//! with environment variable overrides via `DBQ_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::DbqConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/dbq/dbq.toml` (system-wide)
/// 3. `~/.config/dbq/dbq.toml` (user XDG config)
/// 4. `./dbq.toml` (local directory)
/// 5. `DBQ_*` environment variables
pub fn load_config() -> Result<DbqConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<DbqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DbqConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DbqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DbqConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DbqConfig::default()))
        .merge(Toml::file("/etc/dbq/dbq.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("dbq/dbq.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("dbq.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `DBQ_QUEUE_POLL_INTERVAL_MS` must map to `queue.poll_interval_ms`.
fn env_provider() -> Env {
    Env::prefixed("DBQ_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("queue_", "queue.", 1)
            .replacen("log_", "log.", 1)
            .replacen("sqlite_", "sqlite.", 1);
        mapped.into()
    })
}
