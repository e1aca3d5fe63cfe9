//! How a session ended.

use super::goal::Goal;
use super::transcript::Transcript;
use crate::core::model::ModelId;
use crate::session::failure::FailureRecord;
use serde::{Deserialize, Serialize};

/// Terminal failure of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortCause {
    /// Credentials missing or rejected; never retried
    Auth { model: ModelId, message: String },
    /// Every candidate failed within one fallback round
    AllProvidersFailed { failures: Vec<FailureRecord> },
    /// The model kept answering with undecodable actions
    DecisionParseExhausted { attempts: usize, last_error: String },
    /// Too many browser actions failed in a row
    ActionFailureLimitExceeded { failures: usize, last_error: String },
    /// The configured cycle budget was used up
    CycleLimitExceeded { cycles: usize },
    /// The browser could not be started or attached
    SessionStart { message: String },
    /// Cancelled from outside
    Cancelled,
    /// The overall session deadline passed
    DeadlineExceeded,
}

impl AbortCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbortCause::Auth { .. } => "auth_error",
            AbortCause::AllProvidersFailed { .. } => "all_providers_failed",
            AbortCause::DecisionParseExhausted { .. } => "decision_parse_exhausted",
            AbortCause::ActionFailureLimitExceeded { .. } => "action_failure_limit_exceeded",
            AbortCause::CycleLimitExceeded { .. } => "cycle_limit_exceeded",
            AbortCause::SessionStart { .. } => "session_start_error",
            AbortCause::Cancelled => "cancelled",
            AbortCause::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl std::fmt::Display for AbortCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortCause::Auth { model, message } => {
                write!(f, "authentication failed for {}: {}", model, message)
            }
            AbortCause::AllProvidersFailed { failures } => {
                write!(f, "all {} model candidates failed", failures.len())?;
                for failure in failures {
                    write!(f, "\n  - {}", failure)?;
                }
                Ok(())
            }
            AbortCause::DecisionParseExhausted {
                attempts,
                last_error,
            } => write!(
                f,
                "no valid action after {} attempts (last error: {})",
                attempts, last_error
            ),
            AbortCause::ActionFailureLimitExceeded {
                failures,
                last_error,
            } => write!(
                f,
                "{} consecutive browser actions failed (last error: {})",
                failures, last_error
            ),
            AbortCause::CycleLimitExceeded { cycles } => {
                write!(f, "cycle limit of {} reached", cycles)
            }
            AbortCause::SessionStart { message } => {
                write!(f, "browser session could not start: {}", message)
            }
            AbortCause::Cancelled => f.write_str("cancelled"),
            AbortCause::DeadlineExceeded => f.write_str("session deadline exceeded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    Finished { result: String },
    Aborted { cause: AbortCause },
}

impl SessionOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionOutcome::Finished { .. })
    }
}

/// Everything the caller gets back from a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub goal: Goal,
    pub outcome: SessionOutcome,
    pub transcript: Transcript,
    pub elapsed_ms: u64,
}

impl SessionReport {
    pub fn cycles(&self) -> usize {
        self.transcript.len()
    }

    pub fn result(&self) -> Option<&str> {
        match &self.outcome {
            SessionOutcome::Finished { result } => Some(result),
            SessionOutcome::Aborted { .. } => None,
        }
    }

    pub fn abort_cause(&self) -> Option<&AbortCause> {
        match &self.outcome {
            SessionOutcome::Aborted { cause } => Some(cause),
            SessionOutcome::Finished { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::failure::ProviderErrorKind;

    #[test]
    fn test_all_providers_failed_display_lists_each_failure() {
        let cause = AbortCause::AllProvidersFailed {
            failures: vec![
                FailureRecord::new(ModelId::new("a/one").unwrap(), ProviderErrorKind::RateLimited, "429"),
                FailureRecord::new(ModelId::new("b/two").unwrap(), ProviderErrorKind::Timeout, "30s"),
            ],
        };
        let text = cause.to_string();
        assert!(text.starts_with("all 2 model candidates failed"));
        assert!(text.contains("a/one (rate_limited): 429"));
        assert!(text.contains("b/two (timeout): 30s"));
    }

    #[test]
    fn test_outcome_serializes_with_status_and_kind() {
        let outcome = SessionOutcome::Aborted {
            cause: AbortCause::CycleLimitExceeded { cycles: 3 },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "aborted");
        assert_eq!(json["cause"]["kind"], "cycle_limit_exceeded");
        assert_eq!(json["cause"]["cycles"], 3);
    }
}
