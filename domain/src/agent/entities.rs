//! Agent session state machine

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Phase of an agent session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    /// Browser session is being started
    Init,
    /// Waiting for the model to choose the next action
    Deciding,
    /// Performing the chosen action in the browser
    Acting,
    /// Recording the resulting page state
    Observing,
    /// The model finished the goal
    Finished,
    /// The session ended without finishing
    Aborted,
}

impl AgentPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentPhase::Init => "init",
            AgentPhase::Deciding => "deciding",
            AgentPhase::Acting => "acting",
            AgentPhase::Observing => "observing",
            AgentPhase::Finished => "finished",
            AgentPhase::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentPhase::Finished | AgentPhase::Aborted)
    }

    /// Whether `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: AgentPhase) -> bool {
        use AgentPhase::*;
        match (self, next) {
            (Finished | Aborted, _) => false,
            (_, Aborted) => true,
            (Init, Deciding) => true,
            (Deciding, Deciding | Acting | Finished) => true,
            (Acting, Observing | Deciding) => true,
            (Observing, Deciding) => true,
            _ => false,
        }
    }

    pub fn transition(self, next: AgentPhase) -> Result<AgentPhase, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::IllegalTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
