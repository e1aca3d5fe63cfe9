//! Configuration file loading for webpilot
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables `WEBPILOT_<SECTION>__<KEY>`
//! 2. `--config <path>` specified file
//! 3. Project root: `./webpilot.toml` or `./.webpilot.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/webpilot/config.toml`
//! 5. Fallback: `~/.config/webpilot/config.toml`
//! 6. Default values
//!
//! Command-line flags are applied on top by the binary.

mod file_config;
mod loader;

pub use file_config::{
    ConfigError, FileAgentConfig, FileBrowserConfig, FileConfig, FileLoggingConfig,
    FileModelsConfig, FileOutputConfig, FileProviderConfig,
};
pub use loader::ConfigLoader;
