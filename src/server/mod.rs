//! HTTP exporter for host health
//!
//! Serves the shared [`HealthMetrics`] for Prometheus scraping:
//! - `/metrics` - `pingz_host_up{host="..."}` gauges and poller metrics
//! - `/healthz` - Liveness probe (process is running)
//! - `/readyz` - Readiness probe (first polling cycle completed)
//!
//! Also provides termination signal handling for the binary.

mod health;
pub mod metrics;
pub mod shutdown;

pub use health::{bind, build_router, serve, ReadinessState, ServerState};
pub use metrics::{create_metrics, HealthMetrics, HostState, SharedMetrics, HOST_LABEL};
pub use shutdown::wait_for_signal;

#[cfg(test)]
#[path = "health_test.rs"]
mod health_tests;
