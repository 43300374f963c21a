use metrics::{register_counter, register_histogram, Counter, Histogram};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

/// Handles for every metric the checker records.
///
/// Handles resolve against whichever recorder is installed when `Metrics::new` runs,
/// so the Prometheus exporter has to be started first.
#[derive(Clone)]
pub struct Metrics {
    pub links_checked: Counter,
    pub links_unavailable: Counter,
    pub probe_duration: Histogram,
    pub groups_inserted: Counter,
    pub dispatches_cancelled: Counter,
    pub reports_rendered: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            links_checked: register_counter!("linkchecker_links_checked_total"),
            links_unavailable: register_counter!("linkchecker_links_unavailable_total"),
            probe_duration: register_histogram!("linkchecker_probe_duration_seconds"),
            groups_inserted: register_counter!("linkchecker_groups_inserted_total"),
            dispatches_cancelled: register_counter!("linkchecker_dispatches_cancelled_total"),
            reports_rendered: register_counter!("linkchecker_reports_rendered_total"),
        }
    }

    pub fn record_probe(&self, duration: Duration, available: bool) {
        self.links_checked.increment(1);
        if !available {
            self.links_unavailable.increment(1);
        }
        self.probe_duration.record(duration.as_secs_f64());
    }

    pub fn record_group(&self) {
        self.groups_inserted.increment(1);
    }

    pub fn record_cancellation(&self) {
        self.dispatches_cancelled.increment(1);
    }

    pub fn record_report(&self) {
        self.reports_rendered.increment(1);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PrometheusExporter {
    port: u16,
}

impl PrometheusExporter {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// Installs the global recorder and serves `/metrics` on the configured port.
    /// Must run inside the tokio runtime.
    pub fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;

        info!(%addr, "Prometheus metrics exporter listening");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let metrics = Metrics::new();
        metrics.record_probe(Duration::from_millis(30), true);
        metrics.record_probe(Duration::from_millis(30), false);
        metrics.record_group();
        metrics.record_cancellation();
        metrics.record_report();
    }
}
