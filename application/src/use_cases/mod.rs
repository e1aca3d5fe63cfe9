//! Use cases (application services)

pub mod fallback;
pub mod run_session;
