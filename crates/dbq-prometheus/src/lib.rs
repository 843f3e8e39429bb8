// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus exporter for dbq queue metrics.
//!
//! The queue records through the metrics-rs facade (see
//! [`dbq_queue::recording`]); this crate installs the Prometheus recorder
//! that collects those series and renders them in text exposition format.

use dbq_core::DbqError;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

pub use dbq_queue::recording::register_metrics;

/// Process-wide Prometheus recorder for dbq metrics.
pub struct PrometheusExporter {
    handle: PrometheusHandle,
}

impl PrometheusExporter {
    /// Installs the Prometheus recorder globally and registers metric
    /// descriptions.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn install() -> Result<Self, DbqError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            DbqError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Get a reference to the Prometheus handle for rendering.
    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Builds a recorder without installing it, for scoped recording with
/// [`metrics::with_local_recorder`].
pub fn build_recorder() -> PrometheusRecorder {
    PrometheusBuilder::new().build_recorder()
}
