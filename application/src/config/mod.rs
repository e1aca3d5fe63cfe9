//! Application-level configuration.
//!
//! - [`SessionConfig`] - agent loop bounds and timeouts

pub mod session_config;

pub use session_config::SessionConfig;
