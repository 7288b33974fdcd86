//! API route modules

pub mod appointments;
pub mod health;
pub mod ics;
pub mod kyc;
