//! Presentation layer for webpilot
//!
//! This crate contains the CLI definition, the session report formatter,
//! and console progress reporters.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::Cli;
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{ProgressReporter, SimpleProgress};
