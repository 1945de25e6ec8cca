//! Scheduler configuration: admission caps, pool size and request timeout.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::WorkerPoolConfig;

/// Environment variable prefix read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "TICK_LLM_";

/// Process-wide scheduler configuration.
///
/// Set once when the scheduler is built and read by every tick afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum new requests admitted in a single tick.
    pub max_requests_per_tick: u32,
    /// Maximum requests admitted in any trailing one-second wall-clock window.
    pub max_requests_per_second: u32,
    /// Number of worker threads executing client calls.
    pub worker_pool_size: usize,
    /// Wall-clock seconds before an in-flight request is abandoned.
    pub request_timeout_secs: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_requests_per_tick: 1,
            max_requests_per_second: 5,
            worker_pool_size: 4,
            request_timeout_secs: 30.0,
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_requests_per_tick == 0 {
            return Err("max_requests_per_tick must be greater than 0".into());
        }
        if self.max_requests_per_second == 0 {
            return Err("max_requests_per_second must be greater than 0".into());
        }
        if self.worker_pool_size == 0 {
            return Err("worker_pool_size must be greater than 0".into());
        }
        if !self.request_timeout_secs.is_finite() || self.request_timeout_secs <= 0.0 {
            return Err("request_timeout_secs must be a positive number of seconds".into());
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `TICK_LLM_*` environment variables.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    /// Unset variables keep their default values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first unparsable variable or validation failure.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary `TICK_LLM_*` key lookup.
    fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = read_var(&lookup, "MAX_REQUESTS_PER_TICK")? {
            cfg.max_requests_per_tick = v;
        }
        if let Some(v) = read_var(&lookup, "MAX_REQUESTS_PER_SECOND")? {
            cfg.max_requests_per_second = v;
        }
        if let Some(v) = read_var(&lookup, "WORKER_POOL_SIZE")? {
            cfg.worker_pool_size = v;
        }
        if let Some(v) = read_var(&lookup, "REQUEST_TIMEOUT_SECS")? {
            cfg.request_timeout_secs = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// The request timeout as a [`Duration`]. Saturates on values that do
    /// not fit; [`validate`](Self::validate) rejects the rest.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_timeout_secs).unwrap_or(Duration::MAX)
    }

    /// Worker pool configuration derived from this scheduler configuration.
    #[must_use]
    pub fn worker_pool_config(&self) -> WorkerPoolConfig {
        WorkerPoolConfig::new().with_worker_count(self.worker_pool_size)
    }
}

fn read_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>, String>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let key = format!("{ENV_PREFIX}{name}");
    match lookup(&key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{key}: {e}")),
    }
}
