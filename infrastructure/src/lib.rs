//! Infrastructure layer for webpilot
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the OpenRouter chat client, the Chrome
//! controller, the JSONL transcript logger, and configuration file loading.

pub mod browser;
pub mod config;
pub mod logging;
pub mod providers;

// Re-export commonly used types
pub use browser::{ChromeController, ChromeOptions};
pub use config::{
    ConfigError, ConfigLoader, FileAgentConfig, FileBrowserConfig, FileConfig, FileLoggingConfig,
    FileModelsConfig, FileOutputConfig, FileProviderConfig,
};
pub use logging::JsonlConversationLogger;
pub use providers::{OpenRouterConfig, OpenRouterGateway};
