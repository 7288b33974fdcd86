//! Participant contact addresses
//!
//! Turns participant e-mail/phone data into the URIs used by calendar
//! ATTENDEE lines and by the messaging providers.

use thiserror::Error;

use crate::models::{Participant, ReminderChannel};

/// Prefix Twilio expects on WhatsApp recipients
pub const WHATSAPP_PREFIX: &str = "whatsapp:";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContactError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("Participant '{0}' has neither email nor phone")]
    Unreachable(String),
}

/// Minimal structural check: one `@`, non-empty local part, dotted domain
///
/// # Examples
///
/// ```
/// use urbanova_core::contact::is_valid_email;
///
/// assert!(is_valid_email("buyer@example.com"));
/// assert!(!is_valid_email("buyer@localhost"));
/// ```
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Normalize a phone number to E.164 (`+` followed by 8 to 15 digits)
///
/// Spaces, dashes, dots and parentheses are dropped. A leading `00` is
/// treated as the international prefix.
///
/// # Examples
///
/// ```
/// use urbanova_core::contact::normalize_phone;
///
/// assert_eq!(normalize_phone("+39 333 123-4567").unwrap(), "+393331234567");
/// assert_eq!(normalize_phone("0039 3331234567").unwrap(), "+393331234567");
/// ```
pub fn normalize_phone(phone: &str) -> Result<String, ContactError> {
    let compact: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    let digits = if let Some(rest) = compact.strip_prefix('+') {
        rest
    } else if let Some(rest) = compact.strip_prefix("00") {
        rest
    } else {
        return Err(ContactError::InvalidPhone(phone.to_string()));
    };

    if !(8..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ContactError::InvalidPhone(phone.to_string()));
    }

    Ok(format!("+{digits}"))
}

/// Calendar user address for an ATTENDEE line
///
/// E-mail participants get a `mailto:` URI, phone-only participants a `tel:` URI.
pub fn calendar_address(participant: &Participant) -> Result<String, ContactError> {
    if let Some(email) = participant.email.as_deref().filter(|e| !e.is_empty()) {
        if !is_valid_email(email) {
            return Err(ContactError::InvalidEmail(email.to_string()));
        }
        return Ok(format!("mailto:{email}"));
    }

    if let Some(phone) = participant.phone.as_deref().filter(|p| !p.is_empty()) {
        return Ok(format!("tel:{}", normalize_phone(phone)?));
    }

    Err(ContactError::Unreachable(participant.name.clone()))
}

/// WhatsApp recipient address (`whatsapp:+<digits>`)
pub fn whatsapp_address(phone: &str) -> Result<String, ContactError> {
    Ok(format!("{WHATSAPP_PREFIX}{}", normalize_phone(phone)?))
}

/// Channel and recipient used to remind a participant
///
/// WhatsApp is preferred when a phone number is present.
pub fn preferred_channel(participant: &Participant) -> Result<(ReminderChannel, String), ContactError> {
    if let Some(phone) = participant.phone.as_deref().filter(|p| !p.is_empty()) {
        return Ok((ReminderChannel::Whatsapp, normalize_phone(phone)?));
    }
    if let Some(email) = participant.email.as_deref().filter(|e| !e.is_empty()) {
        if !is_valid_email(email) {
            return Err(ContactError::InvalidEmail(email.to_string()));
        }
        return Ok((ReminderChannel::Email, email.to_string()));
    }
    Err(ContactError::Unreachable(participant.name.clone()))
}
