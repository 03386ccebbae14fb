//! Polling loop
//!
//! Every `interval`, checks each configured host in config order and writes
//! the outcome into the shared metrics. Checks are sequential, so a host that
//! hangs until its timeout delays the hosts after it in the same cycle.
//!
//! Cadence: the loop sleeps for `interval - elapsed`. When a cycle overruns
//! the interval, the next one starts immediately. Cycles are never skipped
//! and never queued.

mod checker;

pub use checker::{classify_status, CheckError, HostChecker, HttpChecker};

use crate::config::{PollConfig, Target};
use crate::server::{ReadinessState, SharedMetrics};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How long to pause after a cycle that took `elapsed`
///
/// Saturates at zero: an overrunning cycle gets no pause at all.
pub fn sleep_for(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

/// Periodically checks every target and records up/down gauges
pub struct Poller {
    config: PollConfig,
    metrics: SharedMetrics,
    readiness: ReadinessState,
    checker: Arc<dyn HostChecker>,
}

impl Poller {
    pub fn new(
        config: PollConfig,
        metrics: SharedMetrics,
        readiness: ReadinessState,
        checker: Arc<dyn HostChecker>,
    ) -> Self {
        Self {
            config,
            metrics,
            readiness,
            checker,
        }
    }

    /// Check one target and record the result. Returns whether it is up.
    pub async fn check_target(&self, target: &Target) -> bool {
        match self.checker.check(target).await {
            Ok(()) => {
                self.metrics.set_host_up(&target.name, true);
                true
            }
            Err(e) => {
                self.metrics.set_host_up(&target.name, false);
                warn!(
                    host = %target.name,
                    url = %target.url,
                    error = %e,
                    "Host is down"
                );
                false
            }
        }
    }

    /// Check every target once, in order. Returns the cycle duration.
    pub async fn run_cycle(&self) -> Duration {
        let start = Instant::now();

        let mut up = 0usize;
        for target in &self.config.targets {
            if self.check_target(target).await {
                up += 1;
            }
        }

        let elapsed = start.elapsed();
        self.metrics.record_cycle(elapsed);
        self.readiness.set_ready();

        debug!(
            hosts = self.config.targets.len(),
            up,
            elapsed_ms = elapsed.as_millis() as u64,
            "Polling cycle complete"
        );
        elapsed
    }

    /// Poll forever. Never returns; the loop ends only with the process.
    pub async fn run(&self) {
        info!(
            interval = ?self.config.interval,
            timeout = ?self.config.timeout,
            hosts = self.config.targets.len(),
            "Polling hosts"
        );

        loop {
            let elapsed = self.run_cycle().await;
            let pause = sleep_for(self.config.interval, elapsed);

            if pause.is_zero() {
                debug!(
                    interval = ?self.config.interval,
                    elapsed = ?elapsed,
                    "Polling cycle overran interval, starting next cycle immediately"
                );
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(pause).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "poller_test.rs"]
mod tests;
