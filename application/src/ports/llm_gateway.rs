//! LLM Gateway port
//!
//! Defines the interface for communicating with chat-completion providers.

use async_trait::async_trait;
use thiserror::Error;
use webpilot_domain::{Message, ModelId, ModelResponse, ProviderErrorKind};

/// Classified failure of a single model call
///
/// Adapters must map every transport or protocol problem onto one of these
/// kinds; raw transport errors never cross the port.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            GatewayError::Auth(_) => ProviderErrorKind::Auth,
            GatewayError::RateLimited(_) => ProviderErrorKind::RateLimited,
            GatewayError::ModelUnavailable(_) => ProviderErrorKind::ModelUnavailable,
            GatewayError::Timeout(_) => ProviderErrorKind::Timeout,
            GatewayError::MalformedResponse(_) => ProviderErrorKind::MalformedResponse,
        }
    }

    /// The detail message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            GatewayError::Auth(m)
            | GatewayError::RateLimited(m)
            | GatewayError::ModelUnavailable(m)
            | GatewayError::Timeout(m)
            | GatewayError::MalformedResponse(m) => m,
        }
    }
}

/// Gateway for LLM communication
///
/// This port defines how the application layer talks to a chat model.
/// Implementations (adapters) live in the infrastructure layer and must be
/// stateless between calls, so one gateway can serve concurrent sessions.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Send one chat request to `model`.
    ///
    /// On success the returned response names the requested model.
    async fn call(&self, model: &ModelId, messages: &[Message])
    -> Result<ModelResponse, GatewayError>;

    /// Models the provider currently serves
    async fn available_models(&self) -> Result<Vec<ModelId>, GatewayError> {
        Ok(Vec::new())
    }
}
