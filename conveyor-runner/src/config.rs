//! Runner configuration
//!
//! Defines all configurable parameters for the runner: registry connection,
//! the competencies it registers, pool sizing, and the timings of polling,
//! heartbeats and job update retries.

use std::time::Duration;

/// Runner configuration
///
/// All timeouts and intervals are configurable to allow tuning
/// for different deployment scenarios (dev vs prod, fast vs slow networks).
#[derive(Debug, Clone)]
pub struct Config {
    /// Registry base URL (e.g., "http://localhost:8080")
    pub registry_url: String,

    /// Address this runner registers as reachable at
    pub callback: String,

    /// Account whose jobs this runner executes
    pub account_id: String,

    /// Job category this runner executes
    pub category: String,

    /// Job names this runner executes
    pub job_names: Vec<String>,

    /// Seconds without a heartbeat before the registry considers the runner gone
    pub time_to_live: i64,

    /// Number of worker threads, i.e. jobs processed concurrently
    pub worker_count: usize,

    /// How often to poll the registry for pending jobs
    pub poll_interval: Duration,

    /// How often to push the runner status to the registry
    pub heartbeat_interval: Duration,

    /// How many pending candidates to fetch per reservation attempt
    pub candidate_window: usize,

    /// Attempts at reporting a job back before giving up
    pub update_max_attempts: u32,

    /// Delay between two attempts at reporting a job back
    pub update_retry_delay: Duration,

    /// How long an idle worker blocks before re-checking for a stop request
    pub worker_wait_timeout: Duration,

    /// How long to wait for in-flight jobs on shutdown
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(
        registry_url: String,
        account_id: String,
        category: String,
        job_names: Vec<String>,
    ) -> Self {
        Self {
            registry_url,
            callback: format!("conveyor-runner-{}", uuid::Uuid::new_v4()),
            account_id,
            category,
            job_names,
            time_to_live: 60,
            worker_count: 2,
            poll_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(20),
            candidate_window: 10,
            update_max_attempts: 5,
            update_retry_delay: Duration::from_millis(2000),
            worker_wait_timeout: Duration::from_millis(500),
            shutdown_timeout: Duration::from_secs(30),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - REGISTRY_URL (required)
    /// - RUNNER_ACCOUNT_ID (required)
    /// - RUNNER_CATEGORY (required)
    /// - RUNNER_JOB_NAMES (required, comma-separated)
    /// - RUNNER_CALLBACK (optional, default: generated)
    /// - RUNNER_TTL (optional, seconds, default: 60)
    /// - WORKER_COUNT (optional, default: 2)
    /// - POLL_INTERVAL (optional, seconds, default: 5)
    /// - HEARTBEAT_INTERVAL (optional, seconds, default: 20)
    /// - CANDIDATE_WINDOW (optional, default: 10)
    /// - UPDATE_MAX_ATTEMPTS (optional, default: 5)
    /// - UPDATE_RETRY_DELAY (optional, milliseconds, default: 2000)
    /// - WORKER_WAIT_TIMEOUT (optional, milliseconds, default: 500)
    /// - SHUTDOWN_TIMEOUT (optional, seconds, default: 30)
    pub fn from_env() -> anyhow::Result<Self> {
        let registry_url = required("REGISTRY_URL")?;
        let account_id = required("RUNNER_ACCOUNT_ID")?;
        let category = required("RUNNER_CATEGORY")?;
        let job_names = parse_names(&required("RUNNER_JOB_NAMES")?);

        let mut config = Self::new(registry_url, account_id, category, job_names);

        if let Ok(callback) = std::env::var("RUNNER_CALLBACK") {
            config.callback = callback;
        }
        if let Some(ttl) = parsed::<i64>("RUNNER_TTL")? {
            config.time_to_live = ttl;
        }
        if let Some(count) = parsed::<usize>("WORKER_COUNT")? {
            config.worker_count = count;
        }
        if let Some(secs) = parsed::<u64>("POLL_INTERVAL")? {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parsed::<u64>("HEARTBEAT_INTERVAL")? {
            config.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(window) = parsed::<usize>("CANDIDATE_WINDOW")? {
            config.candidate_window = window;
        }
        if let Some(attempts) = parsed::<u32>("UPDATE_MAX_ATTEMPTS")? {
            config.update_max_attempts = attempts;
        }
        if let Some(ms) = parsed::<u64>("UPDATE_RETRY_DELAY")? {
            config.update_retry_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parsed::<u64>("WORKER_WAIT_TIMEOUT")? {
            config.worker_wait_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = parsed::<u64>("SHUTDOWN_TIMEOUT")? {
            config.shutdown_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.registry_url.is_empty() {
            anyhow::bail!("registry_url cannot be empty");
        }

        if !self.registry_url.starts_with("http://") && !self.registry_url.starts_with("https://")
        {
            anyhow::bail!("registry_url must start with http:// or https://");
        }

        if self.callback.is_empty() {
            anyhow::bail!("callback cannot be empty");
        }

        if self.account_id.is_empty() {
            anyhow::bail!("account_id cannot be empty");
        }

        if self.category.is_empty() {
            anyhow::bail!("category cannot be empty");
        }

        if self.job_names.is_empty() {
            anyhow::bail!("job_names must name at least one job");
        }

        if self.time_to_live <= 0 {
            anyhow::bail!("time_to_live must be greater than 0");
        }

        if self.worker_count == 0 {
            anyhow::bail!("worker_count must be greater than 0");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.heartbeat_interval.is_zero() {
            anyhow::bail!("heartbeat_interval must be greater than 0");
        }

        if self.candidate_window == 0 {
            anyhow::bail!("candidate_window must be greater than 0");
        }

        if self.update_max_attempts == 0 {
            anyhow::bail!("update_max_attempts must be greater than 0");
        }

        if self.worker_wait_timeout.is_zero() {
            anyhow::bail!("worker_wait_timeout must be greater than 0");
        }

        if self.heartbeat_interval.as_secs() >= self.time_to_live as u64 {
            tracing::warn!(
                "heartbeat_interval ({:?}) is not shorter than time_to_live ({}s); the registry may mark this runner stale",
                self.heartbeat_interval,
                self.time_to_live
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            "http://localhost:8080".to_string(),
            "default".to_string(),
            "default".to_string(),
            vec!["default".to_string()],
        )
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("{} environment variable not set", key))
}

fn parsed<T: std::str::FromStr>(key: &str) -> anyhow::Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: '{}'", key, raw)),
        Err(_) => Ok(None),
    }
}

fn parse_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
