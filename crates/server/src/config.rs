use anyhow::{Context, Result};
use integrations::IntegrationsConfig;
use std::env;
use urbanova_core::config::CoreConfig;

#[derive(Debug, Clone)]
pub struct UnifiedConfig {
    pub core: CoreConfig,
    pub integrations: IntegrationsConfig,
    pub api: ApiConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origin: String,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval_secs: u64,
    pub max_retry_count: u32,
    pub batch_size: usize,
    pub status_log_interval_secs: u64,
    pub purge_interval_secs: u64,
    pub reminder_retention_days: u32,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl UnifiedConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            core: CoreConfig::from_env()?,
            integrations: IntegrationsConfig::from_env()?,
            api: ApiConfig {
                host: var_or("API_HOST", "0.0.0.0"),
                port: var_or("API_PORT", "3000")
                    .parse()
                    .context("API_PORT must be a valid port number")?,
                cors_allowed_origin: var_or("CORS_ALLOWED_ORIGIN", "*"),
            },
            worker: WorkerConfig {
                poll_interval_secs: var_or("WORKER_POLL_INTERVAL_SECS", "10")
                    .parse()
                    .context("WORKER_POLL_INTERVAL_SECS must be a valid integer")?,
                max_retry_count: var_or("WORKER_MAX_RETRY_COUNT", "5")
                    .parse()
                    .context("WORKER_MAX_RETRY_COUNT must be a valid integer")?,
                batch_size: var_or("WORKER_BATCH_SIZE", "10")
                    .parse()
                    .context("WORKER_BATCH_SIZE must be a valid integer")?,
                status_log_interval_secs: var_or("WORKER_STATUS_LOG_INTERVAL_SECS", "60")
                    .parse()
                    .context("WORKER_STATUS_LOG_INTERVAL_SECS must be a valid integer")?,
                purge_interval_secs: var_or("WORKER_PURGE_INTERVAL_SECS", "3600")
                    .parse()
                    .context("WORKER_PURGE_INTERVAL_SECS must be a valid integer")?,
                reminder_retention_days: var_or("WORKER_REMINDER_RETENTION_DAYS", "30")
                    .parse()
                    .context("WORKER_REMINDER_RETENTION_DAYS must be a valid integer")?,
            },
        })
    }

    pub fn to_api_config(&self) -> api::config::Config {
        api::config::Config {
            core: self.core.clone(),
            host: self.api.host.clone(),
            port: self.api.port,
            cors_allowed_origin: self.api.cors_allowed_origin.clone(),
        }
    }

    pub fn to_worker_config(&self) -> worker::Config {
        worker::Config {
            core: self.core.clone(),
            integrations: self.integrations.clone(),
            poll_interval_secs: self.worker.poll_interval_secs,
            max_retry_count: self.worker.max_retry_count,
            batch_size: self.worker.batch_size,
            status_log_interval_secs: self.worker.status_log_interval_secs,
            purge_interval_secs: self.worker.purge_interval_secs,
            reminder_retention_days: self.worker.reminder_retention_days,
        }
    }
}
