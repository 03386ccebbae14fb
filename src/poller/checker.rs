//! Reachability checks for a single host
//!
//! A host is up iff the GET succeeds at the transport level and the
//! response status is exactly 200. Everything else is down; the reason
//! is kept only as diagnostic text.

use crate::config::Target;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckError {
    /// DNS failure, connection refused, TLS error, timeout, ...
    #[error("request failed: {0}")]
    Transport(String),

    #[error("response code was not '200' (got {0})")]
    Status(u16),
}

/// Trait for checking whether a host is reachable
///
/// Production code uses `HttpChecker`. Tests script outcomes per host.
#[async_trait]
pub trait HostChecker: Send + Sync {
    async fn check(&self, target: &Target) -> Result<(), CheckError>;
}

/// Classify a response status: only 200 counts as up
pub fn classify_status(status: StatusCode) -> Result<(), CheckError> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(CheckError::Status(status.as_u16()))
    }
}

/// Checker that issues a plain HTTP GET per host
#[derive(Debug, Clone)]
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    /// Build a checker whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HostChecker for HttpChecker {
    async fn check(&self, target: &Target) -> Result<(), CheckError> {
        let response = self
            .client
            .get(&target.url)
            .send()
            .await
            .map_err(|e| CheckError::Transport(error_chain(&e)))?;

        classify_status(response.status())
    }
}

/// Flatten an error and its sources into one line
///
/// reqwest's top-level message rarely names the actual cause
/// (e.g. "connection refused"), which lives further down the chain.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
#[path = "checker_test.rs"]
mod tests;
