//! pingz - periodic HTTP reachability checks exported as Prometheus gauges
//!
//! - [`config`] loads the YAML config into a [`config::PollConfig`]
//! - [`poller`] checks every host on a fixed cadence
//! - [`server`] owns the shared metrics state and serves `/metrics`

pub mod config;
pub mod poller;
pub mod server;
