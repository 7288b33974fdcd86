//! API server configuration from environment variables

use anyhow::{Context, Result};
use std::env;
use std::ops::Deref;
use urbanova_core::config::CoreConfig;

/// API server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub core: CoreConfig,
    pub host: String,
    pub port: u16,
    /// `*` or a single origin
    pub cors_allowed_origin: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let core = CoreConfig::from_env()?;

        Ok(Self {
            core,
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("Failed to parse API_PORT as u16")?,
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }
}

impl Deref for Config {
    type Target = CoreConfig;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        unsafe {
            env::remove_var("API_HOST");
            env::remove_var("API_PORT");
            env::remove_var("CORS_ALLOWED_ORIGIN");
            env::remove_var("DATABASE_URL");
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env_with_defaults() {
        clear();
        let config = Config::from_env().unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_allowed_origin, "*");
        // Deref to the shared configuration
        assert!(config.database_url.is_none());
        assert_eq!(config.ics_link_ttl_hours, 24);
    }

    #[test]
    #[serial]
    fn test_config_from_env_with_custom_values() {
        clear();
        unsafe {
            env::set_var("API_HOST", "127.0.0.1");
            env::set_var("API_PORT", "8080");
            env::set_var("CORS_ALLOWED_ORIGIN", "https://app.urbanova.app");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_allowed_origin, "https://app.urbanova.app");
        clear();
    }

    #[test]
    #[serial]
    fn test_config_invalid_port() {
        clear();
        unsafe {
            env::set_var("API_PORT", "invalid");
        }
        assert!(Config::from_env().is_err());
        clear();
    }
}
