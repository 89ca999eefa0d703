//! Registry configuration
//!
//! Bind address and the retention windows of the background cleaner.

use std::time::Duration;

/// Registry configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API listens on (e.g., "0.0.0.0:8080")
    pub bind_addr: String,

    /// How often the cleaner runs
    pub cleanup_interval: Duration,

    /// How long DONE jobs are kept after they finished
    pub job_retention: Duration,

    /// How long DISCONNECTED runners are kept after their last ping
    pub runner_retention: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(bind_addr: String) -> Self {
        Self {
            bind_addr,
            cleanup_interval: Duration::from_secs(60),
            job_retention: Duration::from_secs(24 * 60 * 60),
            runner_retention: Duration::from_secs(60 * 60),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - REGISTRY_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - CLEANUP_INTERVAL (optional, seconds, default: 60)
    /// - JOB_RETENTION (optional, seconds, default: 86400)
    /// - RUNNER_RETENTION (optional, seconds, default: 3600)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = std::env::var("REGISTRY_BIND_ADDR").unwrap_or(defaults.bind_addr);

        Ok(Self {
            bind_addr,
            cleanup_interval: secs_from_env("CLEANUP_INTERVAL")?
                .unwrap_or(defaults.cleanup_interval),
            job_retention: secs_from_env("JOB_RETENTION")?.unwrap_or(defaults.job_retention),
            runner_retention: secs_from_env("RUNNER_RETENTION")?
                .unwrap_or(defaults.runner_retention),
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.cleanup_interval.is_zero() {
            anyhow::bail!("cleanup_interval must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("0.0.0.0:8080".to_string())
    }
}

fn secs_from_env(key: &str) -> anyhow::Result<Option<Duration>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| anyhow::anyhow!("{} must be a number of seconds, got '{}'", key, raw)),
        Err(_) => Ok(None),
    }
}
