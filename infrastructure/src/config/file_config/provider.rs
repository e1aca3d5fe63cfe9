//! Chat provider configuration from TOML (`[provider]` section)

use crate::providers::openrouter::{DEFAULT_BASE_URL, OpenRouterConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenRouter (or any OpenAI-compatible) endpoint settings.
///
/// # Example
///
/// ```toml
/// [provider]
/// base_url = "https://openrouter.ai/api/v1"
/// api_key_env = "OPENROUTER_API_KEY"
/// temperature = 0.7
/// max_tokens = 4000
/// title = "webpilot"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Base URL of the chat completions API.
    pub base_url: String,
    /// Environment variable name for the API key (default: "OPENROUTER_API_KEY").
    pub api_key_env: String,
    /// Direct API key (not recommended; use the env var instead).
    pub api_key: Option<String>,
    pub temperature: f32,
    /// Max tokens per response.
    pub max_tokens: u32,
    /// `HTTP-Referer` attribution header.
    pub referer: Option<String>,
    /// `X-Title` attribution header.
    pub title: Option<String>,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 4000,
            referer: None,
            title: Some("webpilot".to_string()),
        }
    }
}

impl FileProviderConfig {
    /// The direct key if set, otherwise the value of `api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }

    pub fn to_openrouter_config(&self, request_timeout: Duration) -> OpenRouterConfig {
        OpenRouterConfig {
            base_url: self.base_url.clone(),
            api_key: self.resolve_api_key(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            referer: self.referer.clone(),
            title: self.title.clone(),
            request_timeout,
            ..OpenRouterConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileProviderConfig::default();
        assert_eq!(config.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(config.max_tokens, 4000);
    }

    #[test]
    fn test_direct_key_wins() {
        let config = FileProviderConfig {
            api_key: Some("direct".to_string()),
            api_key_env: "WEBPILOT_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..FileProviderConfig::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("direct"));

        let openrouter = config.to_openrouter_config(Duration::from_secs(12));
        assert_eq!(openrouter.api_key.as_deref(), Some("direct"));
        assert_eq!(openrouter.request_timeout, Duration::from_secs(12));
        assert_eq!(openrouter.title.as_deref(), Some("webpilot"));
    }

    #[test]
    fn test_missing_key_resolves_to_none() {
        let config = FileProviderConfig {
            api_key: Some("  ".to_string()),
            api_key_env: "WEBPILOT_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..FileProviderConfig::default()
        };
        assert_eq!(config.resolve_api_key(), None);
    }
}
