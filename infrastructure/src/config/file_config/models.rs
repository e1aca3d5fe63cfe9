//! Fallback model list from TOML (`[models]` section)

use super::ConfigError;
use serde::{Deserialize, Serialize};
use webpilot_domain::{ModelCandidate, ModelId};

/// Ordered model candidates
///
/// # Example
///
/// ```toml
/// [models]
/// candidates = [
///     "mistralai/mistral-7b-instruct:free",
///     "qwen/qwen-2-7b-instruct:free",
/// ]
/// ```
///
/// Earlier entries are tried first; duplicates keep their first position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelsConfig {
    pub candidates: Vec<String>,
}

impl Default for FileModelsConfig {
    fn default() -> Self {
        Self {
            candidates: ModelId::default_free_models()
                .into_iter()
                .map(|m| m.as_str().to_string())
                .collect(),
        }
    }
}

impl FileModelsConfig {
    /// Parse and rank the candidate list.
    pub fn to_candidates(&self) -> Result<Vec<ModelCandidate>, ConfigError> {
        if self.candidates.is_empty() {
            return Err(ConfigError::Invalid {
                field: "models.candidates".to_string(),
                message: "at least one model is required".to_string(),
            });
        }

        let ids = self
            .candidates
            .iter()
            .map(|raw| {
                ModelId::new(raw.as_str()).map_err(|e| ConfigError::Invalid {
                    field: "models.candidates".to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ModelCandidate::ranked(ids))
    }
}
