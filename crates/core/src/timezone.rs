//! Timezone handling utilities
//!
//! Provides functions for parsing and converting timezones safely.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ConciergeError, ConciergeResult};

/// Timezone used when neither the appointment nor the caller specifies one
pub const DEFAULT_TIMEZONE: &str = "Europe/Rome";

/// Parse an IANA timezone string (e.g., "Europe/Rome", "Europe/London")
///
/// # Examples
///
/// ```
/// use urbanova_core::timezone::parse_timezone;
///
/// let tz = parse_timezone("Europe/Rome").unwrap();
/// assert_eq!(tz.name(), "Europe/Rome");
/// ```
pub fn parse_timezone(tz_str: &str) -> ConciergeResult<Tz> {
    tz_str
        .parse::<Tz>()
        .map_err(|_| ConciergeError::InvalidTimezone(tz_str.to_string()))
}

/// Convert UTC time to a specific timezone
pub fn to_timezone<Tz2: TimeZone>(utc_time: &DateTime<Utc>, tz: &Tz2) -> DateTime<Tz2> {
    utc_time.with_timezone(tz)
}

/// Wall-clock time of `utc_time` in `tz`, without offset information
pub fn to_local_naive(utc_time: &DateTime<Utc>, tz: &Tz) -> NaiveDateTime {
    utc_time.with_timezone(tz).naive_local()
}

/// Validate that a timezone string is valid
pub fn validate_timezone(tz_str: &str) -> ConciergeResult<()> {
    parse_timezone(tz_str)?;
    Ok(())
}

/// A validated IANA timezone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Timezone(String);

impl Timezone {
    /// Create a new Timezone if valid
    pub fn new(tz: &str) -> ConciergeResult<Self> {
        validate_timezone(tz)?;
        Ok(Self(tz.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The parsed `chrono_tz` zone. Construction guarantees validity.
    pub fn tz(&self) -> Tz {
        self.0.parse().unwrap_or(Tz::UTC)
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(DEFAULT_TIMEZONE.to_string())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Timezone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_timezone_valid() {
        let tz = parse_timezone("Europe/Rome");
        assert!(tz.is_ok());
        assert_eq!(tz.unwrap().name(), "Europe/Rome");
    }

    #[test]
    fn test_parse_timezone_invalid() {
        match parse_timezone("Invalid/Timezone") {
            Err(ConciergeError::InvalidTimezone(s)) => assert_eq!(s, "Invalid/Timezone"),
            _ => panic!("Expected InvalidTimezone error"),
        }
    }

    #[test]
    fn test_utc_to_rome_winter() {
        let rome = parse_timezone("Europe/Rome").unwrap();
        let utc_time = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let local = to_timezone(&utc_time, &rome);
        assert_eq!(local.hour(), 10);
    }

    #[test]
    fn test_to_local_naive_summer() {
        let rome = parse_timezone("Europe/Rome").unwrap();
        let utc_time = Utc.with_ymd_and_hms(2025, 7, 1, 8, 30, 0).unwrap();
        let naive = to_local_naive(&utc_time, &rome);
        assert_eq!(naive.format("%Y%m%dT%H%M%S").to_string(), "20250701T103000");
    }

    #[test]
    fn test_timezone_newtype() {
        assert!(Timezone::new("Europe/London").is_ok());
        assert!(Timezone::new("Mars/Olympus").is_err());
        assert_eq!(Timezone::default().as_str(), "Europe/Rome");
    }

    #[test]
    fn test_timezone_deserialize_rejects_invalid() {
        let ok: Timezone = serde_json::from_str("\"Europe/Rome\"").unwrap();
        assert_eq!(ok.tz(), chrono_tz::Europe::Rome);
        assert!(serde_json::from_str::<Timezone>("\"Nowhere/City\"").is_err());
    }
}
