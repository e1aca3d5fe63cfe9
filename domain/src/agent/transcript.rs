//! Append-only record of completed decide-act-observe cycles.

use super::action::Decision;
use super::observation::Observation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a failed browser action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionFailureKind {
    ElementNotFound,
    SelectorTimeout,
    NavigationFailed,
    ActionTimeout,
    Evaluation,
    SessionClosed,
}

impl ActionFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionFailureKind::ElementNotFound => "element_not_found",
            ActionFailureKind::SelectorTimeout => "selector_timeout",
            ActionFailureKind::NavigationFailed => "navigation_failed",
            ActionFailureKind::ActionTimeout => "action_timeout",
            ActionFailureKind::Evaluation => "evaluation",
            ActionFailureKind::SessionClosed => "session_closed",
        }
    }
}

impl std::fmt::Display for ActionFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened when the decided action was performed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionResult {
    Succeeded { observation: Observation },
    Failed { kind: ActionFailureKind, message: String },
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Succeeded { .. })
    }
}

/// One completed cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// 1-based cycle number
    pub cycle: usize,
    /// Observation the decision was made on
    pub observation: Observation,
    pub decision: Decision,
    pub result: ActionResult,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed cycle; the cycle number is assigned here.
    pub fn record(
        &mut self,
        observation: Observation,
        decision: Decision,
        result: ActionResult,
    ) -> &Turn {
        let cycle = self.turns.len() + 1;
        self.turns.push(Turn {
            cycle,
            observation,
            decision,
            result,
            timestamp: Utc::now(),
        });
        &self.turns[cycle - 1]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent `window` turns, oldest first
    pub fn recent(&self, window: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(window);
        &self.turns[start..]
    }

    /// Number of failed actions at the tail of the transcript
    pub fn trailing_failures(&self) -> usize {
        self.turns
            .iter()
            .rev()
            .take_while(|t| !t.result.is_success())
            .count()
    }
}
