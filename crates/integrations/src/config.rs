//! Provider configuration
//!
//! Every provider is optional: when its credentials are missing the
//! corresponding logging fallback is wired instead.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number in E.164 form
    pub from_number: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocHunterConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Gcs {
        base_url: String,
        access_token: String,
        public_base_url: String,
    },
    Filesystem {
        root: PathBuf,
        public_base_url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationsConfig {
    pub smtp: Option<SmtpConfig>,
    pub twilio: Option<TwilioConfig>,
    pub doc_hunter: Option<DocHunterConfig>,
    pub storage: StorageConfig,
}

impl IntegrationsConfig {
    /// Load provider configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            smtp: smtp_from_env()?,
            twilio: twilio_from_env(),
            doc_hunter: doc_hunter_from_env(),
            storage: storage_from_env()?,
        })
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn smtp_from_env() -> Result<Option<SmtpConfig>> {
    let Some(host) = optional("SMTP_HOST") else {
        return Ok(None);
    };

    Ok(Some(SmtpConfig {
        host,
        port: env::var("SMTP_PORT")
            .unwrap_or_else(|_| "1025".to_string())
            .parse()
            .context("SMTP_PORT must be a valid integer")?,
        username: optional("SMTP_USERNAME"),
        password: optional("SMTP_PASSWORD"),
        from: env::var("SMTP_FROM").unwrap_or_else(|_| "concierge@urbanova.app".to_string()),
        pool_size: env::var("SMTP_POOL_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("SMTP_POOL_SIZE must be a valid integer")?,
    }))
}

fn twilio_from_env() -> Option<TwilioConfig> {
    Some(TwilioConfig {
        account_sid: optional("TWILIO_ACCOUNT_SID")?,
        auth_token: optional("TWILIO_AUTH_TOKEN")?,
        from_number: optional("TWILIO_WHATSAPP_FROM")?,
        base_url: env::var("TWILIO_BASE_URL")
            .unwrap_or_else(|_| "https://api.twilio.com".to_string()),
    })
}

fn doc_hunter_from_env() -> Option<DocHunterConfig> {
    Some(DocHunterConfig {
        base_url: optional("DOC_HUNTER_BASE_URL")?,
        api_key: optional("DOC_HUNTER_API_KEY")?,
    })
}

fn storage_from_env() -> Result<StorageConfig> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "filesystem".to_string());

    match backend.as_str() {
        "gcs" => Ok(StorageConfig::Gcs {
            base_url: env::var("STORAGE_GCS_BASE_URL")
                .unwrap_or_else(|_| "https://storage.googleapis.com".to_string()),
            access_token: optional("STORAGE_GCS_ACCESS_TOKEN")
                .context("STORAGE_GCS_ACCESS_TOKEN is required for the gcs backend")?,
            public_base_url: env::var("STORAGE_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "https://storage.googleapis.com".to_string()),
        }),
        "filesystem" => Ok(StorageConfig::Filesystem {
            root: PathBuf::from(
                env::var("STORAGE_ROOT").unwrap_or_else(|_| "data/storage".to_string()),
            ),
            public_base_url: env::var("STORAGE_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000/files".to_string()),
        }),
        other => anyhow::bail!("STORAGE_BACKEND must be 'gcs' or 'filesystem', got '{other}'"),
    }
}
