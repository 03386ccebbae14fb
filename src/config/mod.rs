//! Configuration file loading
//!
//! The config file is YAML:
//!
//! ```yaml
//! port: 3000        # metrics listener port
//! frequency: 30s    # how often every host is checked
//! timeout: 10s      # per-check request timeout
//! hosts:
//!   - name: example
//!     url: https://example.com/healthz
//! ```
//!
//! Every field is optional. A config that fails to read, parse or validate
//! is rejected as a whole at startup.

mod duration;

pub use duration::{parse_duration, DurationError};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Default port for the metrics endpoint
pub const DEFAULT_PORT: u16 = 3000;

/// Default polling frequency
pub const DEFAULT_FREQUENCY: &str = "1s";

/// Default per-check request timeout
pub const DEFAULT_TIMEOUT: &str = "10s";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid {field} {value:?}: {source}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: DurationError,
    },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("invalid URL: name={name} url={url} err={reason}")]
    InvalidUrl {
        name: String,
        url: String,
        reason: String,
    },
}

/// A monitored host
///
/// `name` becomes the `host` label of the exported gauge. Two targets
/// sharing a name write to the same series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub url: String,
}

/// Raw config file contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub frequency: String,
    pub timeout: String,
    pub hosts: Vec<Target>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            frequency: DEFAULT_FREQUENCY.to_string(),
            timeout: DEFAULT_TIMEOUT.to_string(),
            hosts: Vec::new(),
        }
    }
}

/// What the poller needs, with durations already parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
    pub targets: Vec<Target>,
}

impl Config {
    /// Read, parse and validate the config file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        trace!(path = %path.display(), "Reading config file");

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&contents)
    }

    /// Parse and validate YAML config contents
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to null, which serde rejects for a struct.
        let config = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(contents)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every host URL is an absolute http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        for host in &self.hosts {
            validate_url(host)?;
        }
        Ok(())
    }

    /// Parse durations into the poller's view of the config
    pub fn poll_config(&self) -> Result<PollConfig, ConfigError> {
        Ok(PollConfig {
            interval: parse_field("frequency", &self.frequency)?,
            timeout: parse_field("timeout", &self.timeout)?,
            targets: self.hosts.clone(),
        })
    }
}

fn parse_field(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let parsed = parse_duration(value).map_err(|source| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
        source,
    })?;

    if parsed.is_zero() {
        return Err(ConfigError::ZeroDuration { field });
    }
    Ok(parsed)
}

fn validate_url(host: &Target) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        name: host.name.clone(),
        url: host.url.clone(),
        reason,
    };

    let url = Url::parse(&host.url).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {:?}", other))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
