//! Fallback orchestrator
//!
//! Tries an ordered list of candidate models until one answers. The ordering
//! and classification rules live in [`FallbackRound`], a pure state machine
//! that [`FallbackOrchestrator::decide`] drives against the gateway.
//!
//! Within one round every candidate is attempted at most once. The first
//! success wins. An authentication failure ends the round immediately, any
//! other failure moves on to the next candidate.

use crate::ports::llm_gateway::{GatewayError, LlmGateway};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use webpilot_domain::{
    FailureRecord, Message, ModelCandidate, ModelId, ModelResponse, ProviderErrorKind,
};

/// Errors surfaced by a fallback round
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FallbackError {
    #[error("No candidate models configured")]
    NoCandidates,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authentication failed for {model}: {message}")]
    Auth {
        model: ModelId,
        message: String,
        /// Candidates that failed before the auth failure
        failures: Vec<FailureRecord>,
    },

    #[error("All {} candidate models failed", .0.len())]
    AllProvidersFailed(Vec<FailureRecord>),

    #[error("Operation cancelled")]
    Cancelled,
}

impl FallbackError {
    /// Per-candidate failures collected before the round ended
    pub fn failures(&self) -> &[FailureRecord] {
        match self {
            FallbackError::Auth { failures, .. } | FallbackError::AllProvidersFailed(failures) => {
                failures
            }
            _ => &[],
        }
    }
}

/// A successful round: the winning response plus the candidates skipped on the way
#[derive(Debug, Clone)]
pub struct FallbackSuccess {
    pub response: ModelResponse,
    pub failures: Vec<FailureRecord>,
}

/// What the driver should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundStep {
    /// Call this model
    Attempt(ModelId),
    /// Stop: credentials were rejected
    AbortAuth { model: ModelId, message: String },
    /// Stop: every candidate failed
    Exhausted,
}

/// One pass over the candidate list, independent of any transport
#[derive(Debug, Clone)]
pub struct FallbackRound {
    order: Vec<ModelId>,
    next: usize,
    failures: Vec<FailureRecord>,
}

impl FallbackRound {
    /// Order candidates by rank; a model listed twice keeps its best rank only
    pub fn new(candidates: &[ModelCandidate]) -> Self {
        let mut ranked: Vec<&ModelCandidate> = candidates.iter().collect();
        ranked.sort_by_key(|c| c.rank);

        let mut order: Vec<ModelId> = Vec::with_capacity(ranked.len());
        for candidate in ranked {
            if !order.contains(&candidate.id) {
                order.push(candidate.id.clone());
            }
        }

        Self {
            order,
            next: 0,
            failures: Vec::new(),
        }
    }

    /// Number of distinct candidates in this round
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// First step of the round
    pub fn start(&mut self) -> RoundStep {
        self.advance()
    }

    /// Record a failed attempt and choose the next step
    pub fn on_failure(
        &mut self,
        model: &ModelId,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> RoundStep {
        let message = message.into();
        if !kind.is_retryable() {
            return RoundStep::AbortAuth {
                model: model.clone(),
                message,
            };
        }
        self.failures
            .push(FailureRecord::new(model.clone(), kind, message));
        self.advance()
    }

    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<FailureRecord> {
        self.failures
    }

    fn advance(&mut self) -> RoundStep {
        match self.order.get(self.next) {
            Some(model) => {
                self.next += 1;
                RoundStep::Attempt(model.clone())
            }
            None => RoundStep::Exhausted,
        }
    }
}

/// Drives fallback rounds against an [`LlmGateway`]
///
/// Stateless between rounds, so one orchestrator can serve concurrent sessions.
pub struct FallbackOrchestrator<G: LlmGateway + ?Sized> {
    gateway: Arc<G>,
    call_timeout: Option<Duration>,
}

impl<G: LlmGateway + ?Sized> Clone for FallbackOrchestrator<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            call_timeout: self.call_timeout,
        }
    }
}

impl<G: LlmGateway + ?Sized> FallbackOrchestrator<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            call_timeout: None,
        }
    }

    /// Bound every model call; an expired call counts as a `Timeout` failure
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Run one fallback round for `messages`
    pub async fn decide(
        &self,
        messages: &[Message],
        candidates: &[ModelCandidate],
        cancellation: &CancellationToken,
    ) -> Result<FallbackSuccess, FallbackError> {
        if candidates.is_empty() {
            return Err(FallbackError::NoCandidates);
        }
        if messages.is_empty() {
            return Err(FallbackError::InvalidRequest("no messages".to_string()));
        }
        if let Some(index) = messages.iter().position(|m| m.is_empty()) {
            return Err(FallbackError::InvalidRequest(format!(
                "message {} has no text",
                index
            )));
        }

        let mut round = FallbackRound::new(candidates);
        let mut step = round.start();

        loop {
            let model = match step {
                RoundStep::Attempt(model) => model,
                RoundStep::AbortAuth { model, message } => {
                    warn!(model = %model, "Authentication rejected, ending fallback round");
                    return Err(FallbackError::Auth {
                        model,
                        message,
                        failures: round.into_failures(),
                    });
                }
                RoundStep::Exhausted => {
                    warn!("All {} candidate models failed", round.len());
                    return Err(FallbackError::AllProvidersFailed(round.into_failures()));
                }
            };

            debug!(model = %model, "Requesting decision");
            let outcome = tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(FallbackError::Cancelled),
                outcome = self.call_bounded(&model, messages) => outcome,
            };

            step = match outcome {
                Ok(response) if response.model == model => {
                    info!(
                        model = %model,
                        skipped = round.failures().len(),
                        "Model answered"
                    );
                    return Ok(FallbackSuccess {
                        response,
                        failures: round.into_failures(),
                    });
                }
                Ok(response) => round.on_failure(
                    &model,
                    ProviderErrorKind::MalformedResponse,
                    format!("response came from {} instead", response.model),
                ),
                Err(e) => {
                    warn!(model = %model, kind = %e.kind(), "Model call failed: {}", e.message());
                    round.on_failure(&model, e.kind(), e.message())
                }
            };
        }
    }

    async fn call_bounded(
        &self,
        model: &ModelId,
        messages: &[Message],
    ) -> Result<ModelResponse, GatewayError> {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, self.gateway.call(model, messages))
                .await
                .unwrap_or_else(|_| {
                    Err(GatewayError::Timeout(format!(
                        "no response within {}ms",
                        limit.as_millis()
                    )))
                }),
            None => self.gateway.call(model, messages).await,
        }
    }
}
