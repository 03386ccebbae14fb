//! Prometheus metrics for host health
//!
//! Owns a private registry rather than the process-global default one, so
//! the poller and the HTTP exporter share exactly the state handed to them.
//! The poller is the only writer; scrapes only read.

use prometheus::core::Collector;
use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Label carrying the target name on `pingz_host_up`
pub const HOST_LABEL: &str = "host";

/// Last observed state of a single host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    /// Never checked yet
    Unknown,
    Up,
    Down,
}

/// Metrics registry shared between the poller and the metrics endpoint
pub struct HealthMetrics {
    registry: Registry,
    host_up: GaugeVec,
    poll_cycles: IntCounter,
    poll_cycle_duration: Histogram,
}

/// Cheaply cloneable handle to [`HealthMetrics`]
pub type SharedMetrics = Arc<HealthMetrics>;

/// Create the metrics registry with all pingz metrics registered
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    HealthMetrics::new().map(Arc::new)
}

impl HealthMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let host_up = GaugeVec::new(
            Opts::new("pingz_host_up", "1 if the host is up, 0 otherwise"),
            &[HOST_LABEL],
        )?;
        registry.register(Box::new(host_up.clone()))?;

        let poll_cycles = IntCounter::new(
            "pingz_poll_cycles_total",
            "Number of completed polling cycles",
        )?;
        registry.register(Box::new(poll_cycles.clone()))?;

        let poll_cycle_duration = Histogram::with_opts(
            HistogramOpts::new(
                "pingz_poll_cycle_duration_seconds",
                "Time taken to check every configured host once",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )?;
        registry.register(Box::new(poll_cycle_duration.clone()))?;

        Ok(Self {
            registry,
            host_up,
            poll_cycles,
            poll_cycle_duration,
        })
    }

    /// Set the gauge for `host` to 1 (up) or 0 (down)
    ///
    /// Each gauge is a single atomic value, so a concurrent scrape sees
    /// either the old or the new value, never a torn one.
    pub fn set_host_up(&self, host: &str, up: bool) {
        let value = if up { 1.0 } else { 0.0 };
        self.host_up.with_label_values(&[host]).set(value);
    }

    /// Read back the recorded state of `host`
    pub fn host_state(&self, host: &str) -> HostState {
        let value = self
            .host_up
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|label| label.get_name() == HOST_LABEL && label.get_value() == host)
            })
            .map(|metric| metric.get_gauge().get_value());

        match value {
            None => HostState::Unknown,
            Some(v) if v == 1.0 => HostState::Up,
            Some(_) => HostState::Down,
        }
    }

    /// Record one completed polling cycle
    pub fn record_cycle(&self, elapsed: Duration) {
        self.poll_cycles.inc();
        self.poll_cycle_duration.observe(elapsed.as_secs_f64());
    }

    /// Number of completed polling cycles
    pub fn cycles(&self) -> u64 {
        self.poll_cycles.get()
    }

    /// Encode all metrics in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
