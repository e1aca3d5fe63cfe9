//! Model identifiers and fallback candidates

use super::error::DomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of a chat model endpoint, e.g. `mistralai/mistral-7b-instruct:free` (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidModel(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Free models the OpenRouter backend serves without credit
    pub fn default_free_models() -> Vec<ModelId> {
        [
            "google/gemini-flash-1.5-8b",
            "meta-llama/llama-3.1-8b-instruct:free",
            "mistralai/mistral-7b-instruct:free",
            "microsoft/phi-3-medium-128k-instruct:free",
            "qwen/qwen-2-7b-instruct:free",
            "nousresearch/hermes-3-llama-3.1-8b:free",
        ]
        .into_iter()
        .map(|id| ModelId(id.to_string()))
        .collect()
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ModelId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ModelId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ModelId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ModelId::new(s).map_err(serde::de::Error::custom)
    }
}

/// One entry of the ordered fallback list.
///
/// `rank` is the 0-based priority (0 is tried first). The list is immutable
/// configuration: the orchestrator only iterates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub id: ModelId,
    pub rank: usize,
}

impl ModelCandidate {
    pub fn new(id: ModelId, rank: usize) -> Self {
        Self { id, rank }
    }

    /// Build a ranked candidate list from ids in priority order, dropping duplicates
    /// so that a model can be attempted at most once per fallback round.
    pub fn ranked(ids: impl IntoIterator<Item = ModelId>) -> Vec<ModelCandidate> {
        let mut candidates: Vec<ModelCandidate> = Vec::new();
        for id in ids {
            if candidates.iter().any(|c| c.id == id) {
                continue;
            }
            let rank = candidates.len();
            candidates.push(ModelCandidate::new(id, rank));
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_rejects_blank_and_whitespace() {
        assert!(ModelId::new("").is_err());
        assert!(ModelId::new("   ").is_err());
        assert!(ModelId::new("gpt 4").is_err());
        assert_eq!(ModelId::new(" qwen/qwen-2-7b-instruct:free ").unwrap().as_str(), "qwen/qwen-2-7b-instruct:free");
    }

    #[test]
    fn test_ranked_assigns_priority_and_dedups() {
        let ids = ["a/one", "b/two", "a/one", "c/three"]
            .iter()
            .map(|s| s.parse::<ModelId>().unwrap());
        let candidates = ModelCandidate::ranked(ids);

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].id.as_str(), "a/one");
        assert_eq!(candidates[0].rank, 0);
        assert_eq!(candidates[2].id.as_str(), "c/three");
        assert_eq!(candidates[2].rank, 2);
    }

    #[test]
    fn test_model_id_serde_as_string() {
        let id: ModelId = serde_json::from_str("\"mistralai/mistral-7b-instruct:free\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"mistralai/mistral-7b-instruct:free\"");
        assert!(serde_json::from_str::<ModelId>("\"\"").is_err());
    }

    #[test]
    fn test_default_free_models_not_empty() {
        assert_eq!(ModelId::default_free_models().len(), 6);
    }
}
