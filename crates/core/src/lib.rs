//! Urbanova Core - Domain logic and models
//!
//! Models, the calendar generator and validator, and the concierge
//! services. Services reach storage and providers only through the
//! traits in [`ports`].

pub mod config;
pub mod contact;
pub mod error;
pub mod ics;
pub mod models;
pub mod ports;
pub mod recurrence;
pub mod services;
pub mod store;
pub mod timezone;
pub mod types;

pub use error::{ConciergeError, ConciergeResult, ConfigError};
pub use timezone::{Timezone, parse_timezone, to_timezone, validate_timezone};
