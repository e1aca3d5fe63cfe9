//! Agent loop configuration from TOML (`[agent]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use webpilot_application::SessionConfig;

/// Raw agent loop limits from TOML
///
/// # Example
///
/// ```toml
/// [agent]
/// max_cycles = 25
/// max_action_failures = 3
/// max_parse_retries = 2
/// history_window = 6
/// call_timeout_secs = 30
/// action_timeout_secs = 20
/// session_timeout_secs = 600   # optional
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    pub max_cycles: usize,
    pub max_action_failures: usize,
    pub max_parse_retries: usize,
    pub history_window: usize,
    pub call_timeout_secs: u64,
    pub action_timeout_secs: u64,
    pub session_timeout_secs: Option<u64>,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        Self {
            max_cycles: 25,
            max_action_failures: 3,
            max_parse_retries: 2,
            history_window: 6,
            call_timeout_secs: 30,
            action_timeout_secs: 20,
            session_timeout_secs: None,
        }
    }
}

impl FileAgentConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }

    /// Loop limits; the page text budget lives in `[browser]`.
    pub fn to_session_config(&self, max_observation_chars: usize) -> SessionConfig {
        SessionConfig::default()
            .with_max_cycles(self.max_cycles)
            .with_max_action_failures(self.max_action_failures)
            .with_max_parse_retries(self.max_parse_retries)
            .with_history_window(self.history_window)
            .with_max_observation_chars(max_observation_chars)
            .with_call_timeout(Some(self.call_timeout()))
            .with_action_timeout(self.action_timeout())
            .with_session_timeout(self.session_timeout_secs.map(Duration::from_secs))
    }
}
