//! Structural checks for ICS text
//!
//! A flat sequence of marker checks over unfolded content lines. This is not a
//! full RFC 5545 parser: it catches the mistakes that make calendar clients
//! reject a file outright.

use serde::Serialize;

use super::writer::{split_content_line, unfold_lines};
use crate::recurrence::validate_rrule;

/// Outcome of [`validate_ics`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validate raw ICS text
///
/// Errors: missing or unbalanced `VCALENDAR`/`VEVENT` markers, missing
/// `VERSION:2.0`, missing or empty `UID`/`DTSTART`.
/// Warnings: missing `SUMMARY`, unsupported `RRULE`.
pub fn validate_ics(content: &str) -> ValidationReport {
    let lines = unfold_lines(content);
    let lines: Vec<&str> = lines.iter().map(|l| l.trim_end()).collect();

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_block(&lines, "VCALENDAR", &mut errors);
    check_block(&lines, "VEVENT", &mut errors);

    if !lines.iter().any(|l| *l == "VERSION:2.0") {
        errors.push("Missing VERSION:2.0".to_string());
    }

    for required in ["UID", "DTSTART"] {
        match property_value(&lines, required) {
            None => errors.push(format!("Missing {required}")),
            Some(value) if value.trim().is_empty() => errors.push(format!("Empty {required}")),
            Some(_) => {}
        }
    }

    if property_value(&lines, "SUMMARY").is_none() {
        warnings.push("Missing SUMMARY".to_string());
    }

    if let Some(rule) = property_value(&lines, "RRULE")
        && let Err(e) = validate_rrule(rule)
    {
        warnings.push(format!("Unsupported RRULE: {e}"));
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn check_block(lines: &[&str], component: &str, errors: &mut Vec<String>) {
    let begin = format!("BEGIN:{component}");
    let end = format!("END:{component}");
    let begins = lines.iter().filter(|l| **l == begin).count();
    let ends = lines.iter().filter(|l| **l == end).count();

    if begins == 0 {
        errors.push(format!("Missing {begin}"));
    }
    if ends == 0 {
        errors.push(format!("Missing {end}"));
    }
    if begins > 0 && ends > 0 && begins != ends {
        errors.push(format!(
            "Unbalanced {component}: {begins} BEGIN vs {ends} END"
        ));
    }
}

fn property_value<'a>(lines: &[&'a str], name: &str) -> Option<&'a str> {
    lines.iter().find_map(|line| match split_content_line(line) {
        Some((prop, value)) if prop.eq_ignore_ascii_case(name) => Some(value),
        _ => None,
    })
}
