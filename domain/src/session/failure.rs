//! Classified provider failures.

use crate::core::model::ModelId;
use serde::{Deserialize, Serialize};

/// Classification of a failed model call.
///
/// Only [`ProviderErrorKind::Auth`] is fatal to a fallback round; every other
/// kind is retried on the next candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Auth,
    RateLimited,
    ModelUnavailable,
    Timeout,
    MalformedResponse,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::Auth => "auth",
            ProviderErrorKind::RateLimited => "rate_limited",
            ProviderErrorKind::ModelUnavailable => "model_unavailable",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::MalformedResponse => "malformed_response",
        }
    }

    /// Whether another candidate may be tried after this failure
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderErrorKind::Auth)
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate's failure within a fallback round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub model: ModelId,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl FailureRecord {
    pub fn new(model: ModelId, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            model,
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.model, self.kind, self.message)
    }
}
