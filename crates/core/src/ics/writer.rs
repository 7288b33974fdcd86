//! Content-line writer with RFC 5545 line folding

use super::escape::escape_text;

/// Maximum content line length in octets, excluding the CRLF
pub const MAX_LINE_OCTETS: usize = 75;

/// Writes CRLF-terminated content lines, folding anything longer than
/// [`MAX_LINE_OCTETS`] onto continuation lines that start with a space.
pub struct FoldedWriter<'a> {
    buf: &'a mut String,
    current_line_len: usize,
}

impl<'a> FoldedWriter<'a> {
    pub fn new(buf: &'a mut String) -> Self {
        Self {
            buf,
            current_line_len: 0,
        }
    }

    pub fn write_str(&mut self, s: &str) {
        for c in s.chars() {
            self.write_char(c);
        }
    }

    pub fn write_char(&mut self, c: char) {
        let len = c.len_utf8();
        if self.current_line_len + len > MAX_LINE_OCTETS {
            self.buf.push_str("\r\n ");
            self.current_line_len = 1 + len;
        } else {
            self.current_line_len += len;
        }
        self.buf.push(c);
    }

    pub fn end_line(&mut self) {
        self.buf.push_str("\r\n");
        self.current_line_len = 0;
    }

    /// Write a complete line verbatim
    pub fn line(&mut self, s: &str) {
        self.write_str(s);
        self.end_line();
    }

    /// Write `NAME:value` with the value escaped as TEXT
    pub fn text_property(&mut self, name: &str, value: &str) {
        self.write_str(name);
        self.write_char(':');
        self.write_str(&escape_text(value));
        self.end_line();
    }

    /// Write `NAME;PARAMS:value` with the value passed through unchanged
    pub fn property(&mut self, name: &str, params: &[(&str, String)], value: &str) {
        self.write_str(name);
        for (key, param) in params {
            self.write_char(';');
            self.write_str(key);
            self.write_char('=');
            self.write_str(param);
        }
        self.write_char(':');
        self.write_str(value);
        self.end_line();
    }
}

/// Split ICS text into logical content lines, joining folded continuations
///
/// Accepts both CRLF and bare LF line endings.
pub fn unfold_lines(ics: &str) -> Vec<String> {
    let mut unfolded_lines = Vec::new();
    let mut current_line = String::new();

    for line in ics.lines() {
        if let Some(rest) = line.strip_prefix(' ').or_else(|| line.strip_prefix('\t')) {
            current_line.push_str(rest);
        } else {
            if !current_line.is_empty() {
                unfolded_lines.push(std::mem::take(&mut current_line));
            }
            current_line.push_str(line);
        }
    }
    if !current_line.is_empty() {
        unfolded_lines.push(current_line);
    }

    unfolded_lines
}

/// Split a content line into property name and value
///
/// The value starts after the first colon that is not inside a quoted
/// parameter value.
pub fn split_content_line(line: &str) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    let mut colon = None;
    for (idx, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                colon = Some(idx);
                break;
            }
            _ => {}
        }
    }
    let colon = colon?;
    let head = &line[..colon];
    let name = head.split(';').next().unwrap_or(head);
    Some((name, &line[colon + 1..]))
}
