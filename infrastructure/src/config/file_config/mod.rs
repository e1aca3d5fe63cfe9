//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted to application types
//! (`SessionConfig`, candidates, adapter options) after validation.

mod agent;
mod browser;
mod logging;
mod models;
mod output;
mod provider;

pub use agent::FileAgentConfig;
pub use browser::FileBrowserConfig;
pub use logging::FileLoggingConfig;
pub use models::FileModelsConfig;
pub use output::FileOutputConfig;
pub use provider::FileProviderConfig;

use crate::browser::ChromeOptions;
use crate::providers::OpenRouterConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use webpilot_application::SessionConfig;
use webpilot_domain::ModelCandidate;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Config file not found: {}", .0.display())]
    NotFound(std::path::PathBuf),

    #[error("Invalid configuration value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Longest bound accepted for a single model call, action or browser start
pub const MAX_STEP_TIMEOUT_SECS: u64 = 60 * 60;

/// Longest accepted overall session deadline
pub const MAX_SESSION_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Ordered fallback models
    pub models: FileModelsConfig,
    /// Chat completions endpoint
    pub provider: FileProviderConfig,
    /// Agent loop limits
    pub agent: FileAgentConfig,
    /// Launch or attach settings
    pub browser: FileBrowserConfig,
    pub logging: FileLoggingConfig,
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the whole configuration, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.models.to_candidates()?;

        let positive: [(&str, u64); 6] = [
            ("agent.max_cycles", self.agent.max_cycles as u64),
            (
                "agent.max_action_failures",
                self.agent.max_action_failures as u64,
            ),
            ("agent.call_timeout_secs", self.agent.call_timeout_secs),
            ("agent.action_timeout_secs", self.agent.action_timeout_secs),
            (
                "browser.max_observation_chars",
                self.browser.max_observation_chars as u64,
            ),
            (
                "browser.startup_timeout_secs",
                self.browser.startup_timeout_secs,
            ),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }

        let step_timeouts = [
            ("agent.call_timeout_secs", self.agent.call_timeout_secs),
            ("agent.action_timeout_secs", self.agent.action_timeout_secs),
            (
                "browser.startup_timeout_secs",
                self.browser.startup_timeout_secs,
            ),
        ];
        for (field, value) in step_timeouts {
            if value > MAX_STEP_TIMEOUT_SECS {
                return Err(invalid(
                    field,
                    &format!("must be at most {} seconds", MAX_STEP_TIMEOUT_SECS),
                ));
            }
        }

        match self.agent.session_timeout_secs {
            Some(0) => {
                return Err(invalid(
                    "agent.session_timeout_secs",
                    "must be greater than 0 (omit it for no deadline)",
                ));
            }
            Some(secs) if secs > MAX_SESSION_TIMEOUT_SECS => {
                return Err(invalid(
                    "agent.session_timeout_secs",
                    &format!("must be at most {} seconds", MAX_SESSION_TIMEOUT_SECS),
                ));
            }
            _ => {}
        }
        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(invalid("browser.window_width/window_height", "must be non-zero"));
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(invalid("provider.temperature", "must be between 0.0 and 2.0"));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(invalid("provider.base_url", "must not be empty"));
        }

        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        self.agent
            .to_session_config(self.browser.max_observation_chars)
    }

    pub fn candidates(&self) -> Result<Vec<ModelCandidate>, ConfigError> {
        self.models.to_candidates()
    }

    pub fn openrouter_config(&self) -> OpenRouterConfig {
        self.provider
            .to_openrouter_config(self.agent.call_timeout())
    }

    pub fn chrome_options(&self) -> ChromeOptions {
        self.browser.to_chrome_options(self.agent.action_timeout())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use webpilot_domain::OutputFormat;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[models]
candidates = ["qwen/qwen-2-7b-instruct:free", "mistralai/mistral-7b-instruct:free"]

[provider]
base_url = "http://localhost:8080/v1"
temperature = 0.2
max_tokens = 1000

[agent]
max_cycles = 10
action_timeout_secs = 5
session_timeout_secs = 300

[browser]
endpoint = "ws://127.0.0.1:9222/devtools/browser/abc"
headless = false
start_url = "https://example.com"
max_observation_chars = 2000

[logging]
transcript_dir = "/tmp/webpilot"

[output]
format = "json"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();

        assert_eq!(config.models.candidates.len(), 2);
        assert_eq!(config.provider.base_url, "http://localhost:8080/v1");
        assert_eq!(config.provider.max_tokens, 1000);
        assert_eq!(config.output.format, Some(OutputFormat::Json));

        let session = config.session_config();
        assert_eq!(session.max_cycles, 10);
        assert_eq!(session.max_observation_chars, 2000);
        assert_eq!(session.session_timeout, Some(Duration::from_secs(300)));

        let chrome = config.chrome_options();
        assert!(!chrome.headless);
        assert_eq!(chrome.action_timeout, Duration::from_secs(5));
        assert_eq!(chrome.start_url, "https://example.com");
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[agent]
max_cycles = 3
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.max_cycles, 3);
        // Defaults should apply
        assert_eq!(config.agent.max_action_failures, 3);
        assert_eq!(config.models, FileModelsConfig::default());
        assert!(config.browser.headless);
        assert!(config.logging.transcript_dir.is_none());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = FileConfig::default();
        config.validate().unwrap();
        assert_eq!(config.session_config(), SessionConfig::default());
        assert_eq!(config.candidates().unwrap().len(), 6);
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = FileConfig::default();
        config.agent.max_cycles = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("agent.max_cycles"));

        let mut config = FileConfig::default();
        config.agent.session_timeout_secs = Some(0);
        assert!(config.validate().is_err());

        let mut config = FileConfig::default();
        config.models.candidates.clear();
        assert!(config.validate().is_err());

        let mut config = FileConfig::default();
        config.provider.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unbounded_timeouts() {
        let mut config = FileConfig::default();
        config.agent.session_timeout_secs = Some(u64::MAX);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("agent.session_timeout_secs"));

        let mut config = FileConfig::default();
        config.agent.action_timeout_secs = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("agent.action_timeout_secs"));

        let mut config = FileConfig::default();
        config.browser.startup_timeout_secs = MAX_STEP_TIMEOUT_SECS + 1;
        assert!(config.validate().is_err());

        let mut config = FileConfig::default();
        config.agent.call_timeout_secs = MAX_STEP_TIMEOUT_SECS;
        config.agent.session_timeout_secs = Some(MAX_SESSION_TIMEOUT_SECS);
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_sections_are_ignored() {
        let config: FileConfig = toml::from_str("[telemetry]\nenabled = true\n").unwrap();
        assert_eq!(config, FileConfig::default());
    }
}
