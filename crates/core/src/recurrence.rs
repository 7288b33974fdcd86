//! Recurrence rule handling and validation
//!
//! Appointments only ever recur on a fixed weekly cadence, so this module
//! builds that one rule and performs basic RRULE sanity checks for the validator.

use chrono::{DateTime, Duration, Utc};

use crate::error::ConciergeError;

/// Number of weeks a recurring appointment repeats for
pub const RECURRENCE_WEEKS: i64 = 4;

/// Supported FREQ values
const VALID_FREQS: [&str; 4] = ["DAILY", "WEEKLY", "MONTHLY", "YEARLY"];

/// UNTIL bound of the weekly rule generated at `now`
pub fn weekly_until(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::weeks(RECURRENCE_WEEKS)
}

/// Weekly rule value (without the `RRULE:` prefix), ending 28 days after `now`
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use urbanova_core::recurrence::weekly_rule;
///
/// let now = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
/// assert_eq!(weekly_rule(now), "FREQ=WEEKLY;INTERVAL=1;UNTIL=20250329T080000Z");
/// ```
pub fn weekly_rule(now: DateTime<Utc>) -> String {
    format!(
        "FREQ=WEEKLY;INTERVAL=1;UNTIL={}",
        weekly_until(now).format("%Y%m%dT%H%M%SZ")
    )
}

/// Parse RRULE string and validate basic format
///
/// Returns an error if the RRULE is obviously malformed
pub fn validate_rrule(rrule_str: &str) -> Result<(), ConciergeError> {
    let freq = rrule_str
        .split(';')
        .find_map(|part| part.strip_prefix("FREQ="))
        .ok_or_else(|| ConciergeError::validation("RRULE must contain FREQ parameter"))?;

    if !VALID_FREQS.contains(&freq) {
        return Err(ConciergeError::validation(
            "RRULE FREQ must be one of: DAILY, WEEKLY, MONTHLY, YEARLY",
        ));
    }

    Ok(())
}

/// Parse the UNTIL part of a rule in UTC form
pub fn rule_until(rrule_str: &str) -> Option<DateTime<Utc>> {
    let raw = rrule_str
        .split(';')
        .find_map(|part| part.strip_prefix("UNTIL="))?;
    chrono::NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%SZ")
        .ok()
        .map(|dt| dt.and_utc())
}
