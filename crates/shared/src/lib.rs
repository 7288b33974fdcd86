//! Process bootstrap shared by the API, worker and unified server binaries

pub mod bootstrap;

pub use bootstrap::{build_services, init_db, init_env, init_tracing};
