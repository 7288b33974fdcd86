//! Shared configuration logic
//!
//! Handles loading of common environment variables.

use crate::error::ConfigError;
use crate::ics::Organizer;
use crate::timezone::{DEFAULT_TIMEZONE, Timezone};
use chrono::Duration;
use std::env;

/// Upper bound for `ICS_LINK_TTL_HOURS` (one year)
pub const MAX_ICS_LINK_TTL_HOURS: i64 = 24 * 365;

/// Common configuration used across services
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Database connection URL; the in-memory store is used when absent
    pub database_url: Option<String>,

    /// Maximum database connections (default: 20)
    pub db_max_connections: u32,

    /// Timezone for appointments that do not specify one
    pub default_timezone: Timezone,

    /// Bucket that generated calendar files are uploaded to
    pub ics_bucket: String,

    /// Lifetime of a generated calendar download link, in hours (default: 24)
    pub ics_link_ttl_hours: i64,

    /// ORGANIZER written into calendar files
    pub organizer: Organizer,
}

impl CoreConfig {
    /// Load common configuration from environment variables
    ///
    /// This will also initialize dotenv if it hasn't been done yet.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let default_timezone = env::var("DEFAULT_TIMEZONE")
            .unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string());
        let default_timezone =
            Timezone::new(&default_timezone).map_err(|_| ConfigError::InvalidValue {
                name: "DEFAULT_TIMEZONE".to_string(),
                value: default_timezone.clone(),
            })?;

        let defaults = Organizer::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 20)?,
            default_timezone,
            ics_bucket: env::var("ICS_BUCKET").unwrap_or_else(|_| "urbanova-calendars".to_string()),
            ics_link_ttl_hours: parse_ttl_hours()?,
            organizer: Organizer {
                name: env::var("ORGANIZER_NAME").unwrap_or(defaults.name),
                email: env::var("ORGANIZER_EMAIL").unwrap_or(defaults.email),
            },
        })
    }
}

impl CoreConfig {
    /// Lifetime of a download link, kept within `1..=MAX_ICS_LINK_TTL_HOURS`
    pub fn ics_link_ttl(&self) -> Duration {
        Duration::hours(self.ics_link_ttl_hours.clamp(1, MAX_ICS_LINK_TTL_HOURS))
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: 20,
            default_timezone: Timezone::default(),
            ics_bucket: "urbanova-calendars".to_string(),
            ics_link_ttl_hours: 24,
            organizer: Organizer::default(),
        }
    }
}

fn parse_ttl_hours() -> Result<i64, ConfigError> {
    let hours = parse_or("ICS_LINK_TTL_HOURS", 24_i64)?;
    if !(1..=MAX_ICS_LINK_TTL_HOURS).contains(&hours) {
        return Err(ConfigError::InvalidValue {
            name: "ICS_LINK_TTL_HOURS".to_string(),
            value: hours.to_string(),
        });
    }
    Ok(hours)
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}
