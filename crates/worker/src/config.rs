//! Configuration for worker process
//!
//! Loads configuration from environment variables

use anyhow::{Context, Result};
use integrations::IntegrationsConfig;
use std::env;
use std::ops::Deref;
use urbanova_core::config::CoreConfig;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Core configuration
    pub core: CoreConfig,

    /// Provider configuration
    pub integrations: IntegrationsConfig,

    /// Poll interval in seconds
    pub poll_interval_secs: u64,

    /// Delivery attempts per reminder before it is marked failed
    pub max_retry_count: u32,

    /// Reminders processed per poll
    pub batch_size: usize,

    /// Interval in seconds for logging queue status
    pub status_log_interval_secs: u64,

    /// Interval in seconds between expired calendar file sweeps
    pub purge_interval_secs: u64,

    /// Days sent, failed and cancelled reminders are kept before deletion
    pub reminder_retention_days: u32,
}

fn parse_env<T: std::str::FromStr>(name: &str, default: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("{name} must be a valid integer"))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            core: CoreConfig::from_env()?,
            integrations: IntegrationsConfig::from_env()?,
            poll_interval_secs: parse_env("WORKER_POLL_INTERVAL_SECS", "10")?,
            max_retry_count: parse_env("WORKER_MAX_RETRY_COUNT", "5")?,
            batch_size: parse_env("WORKER_BATCH_SIZE", "10")?,
            status_log_interval_secs: parse_env("WORKER_STATUS_LOG_INTERVAL_SECS", "60")?,
            purge_interval_secs: parse_env("WORKER_PURGE_INTERVAL_SECS", "3600")?,
            reminder_retention_days: parse_env("WORKER_REMINDER_RETENTION_DAYS", "30")?,
        })
    }
}

impl Deref for Config {
    type Target = CoreConfig;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}
