//! iCalendar (RFC 5545) generation and validation for appointments

pub mod escape;
pub mod generator;
pub mod validator;
pub mod writer;

pub use escape::{escape_param_value, escape_text, unescape_text};
pub use generator::{
    GenerationOptions, Organizer, appointment_uid, generate_ics_content, generate_ics_content_at,
};
pub use validator::{ValidationReport, validate_ics};
pub use writer::unfold_lines;
