//! iCalendar text escaping utilities.

/// Escapes text for iCalendar TEXT values (RFC 5545 §3.3.11).
///
/// Raw backslashes, commas, semicolons and line breaks are escaped. A
/// backslash that already introduces a valid escape sequence (`\\`, `\;`,
/// `\,`, `\n`, `\N`) is kept as is, so escaping twice yields the same text
/// as escaping once.
#[must_use]
pub fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 10);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek().copied() {
                Some(next @ ('\\' | ';' | ',' | 'n' | 'N')) => {
                    result.push('\\');
                    result.push(next);
                    chars.next();
                }
                _ => result.push_str("\\\\"),
            },
            ',' => result.push_str("\\,"),
            ';' => result.push_str("\\;"),
            '\n' => result.push_str("\\n"),
            '\r' => {
                // CRLF collapses into the single `\n` emitted for the LF
                if chars.peek() != Some(&'\n') {
                    result.push_str("\\n");
                }
            }
            _ => result.push(c),
        }
    }
    result
}

/// Reverses [`escape_text`].
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => result.push('\n'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}

/// Escapes a parameter value if needed.
///
/// Returns the value quoted if it contains special characters. Double quotes
/// cannot appear inside a quoted value and are replaced by apostrophes.
#[must_use]
pub fn escape_param_value(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n'))
        .map(|c| if c == '"' { '\'' } else { c })
        .collect();

    if needs_quoting(s) {
        format!("\"{cleaned}\"")
    } else {
        cleaned
    }
}

fn needs_quoting(s: &str) -> bool {
    s.chars().any(|c| matches!(c, ':' | ';' | ',' | '"'))
}
