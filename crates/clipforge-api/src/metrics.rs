//! Prometheus metrics bootstrap.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global recorder and return the render handle.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}
