//! Browser configuration from TOML (`[browser]` section)

use crate::browser::ChromeOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Raw browser settings from TOML
///
/// # Example
///
/// ```toml
/// [browser]
/// # Attach to a running Chrome instead of launching one
/// endpoint = "ws://127.0.0.1:9222/devtools/browser/<id>"
/// headless = true
/// start_url = "https://duckduckgo.com"
/// screenshot_dir = "./screenshots"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBrowserConfig {
    /// DevTools WebSocket URL; when set the session attaches instead of launching
    pub endpoint: Option<String>,
    pub headless: bool,
    /// Chrome's sandbox; containers running as root usually need it off
    pub sandbox: bool,
    pub chrome_path: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub start_url: String,
    pub screenshot_dir: Option<PathBuf>,
    /// Page text kept per observation
    pub max_observation_chars: usize,
    pub startup_timeout_secs: u64,
}

impl Default for FileBrowserConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            headless: true,
            sandbox: true,
            chrome_path: None,
            user_data_dir: None,
            window_width: 1280,
            window_height: 800,
            start_url: "about:blank".to_string(),
            screenshot_dir: None,
            max_observation_chars: 4000,
            startup_timeout_secs: 20,
        }
    }
}

impl FileBrowserConfig {
    /// Chrome options; `action_timeout` comes from `[agent]`.
    pub fn to_chrome_options(&self, action_timeout: Duration) -> ChromeOptions {
        ChromeOptions {
            endpoint: self.endpoint.clone().filter(|e| !e.trim().is_empty()),
            headless: self.headless,
            sandbox: self.sandbox,
            chrome_path: self.chrome_path.clone(),
            user_data_dir: self.user_data_dir.clone(),
            window_width: self.window_width,
            window_height: self.window_height,
            start_url: self.start_url.clone(),
            screenshot_dir: self.screenshot_dir.clone(),
            max_observation_chars: self.max_observation_chars,
            startup_timeout: Duration::from_secs(self.startup_timeout_secs),
            action_timeout,
        }
    }
}
