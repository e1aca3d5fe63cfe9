//! Browser actions decided by the model.

use crate::core::string::truncate;
use serde::{Deserialize, Serialize};

/// Condition a `wait` action blocks on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitCondition {
    /// Until the selector matches an element
    Selector { selector: String },
    /// A fixed pause
    Duration { ms: u64 },
    /// Until the page settles (document complete, no new network activity)
    NetworkIdle,
}

impl std::fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitCondition::Selector { selector } => write!(f, "selector {}", selector),
            WaitCondition::Duration { ms } => write!(f, "{}ms", ms),
            WaitCondition::NetworkIdle => f.write_str("network idle"),
        }
    }
}

/// One browser action (tagged variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Navigate { url: String },
    Click { selector: String },
    Type { selector: String, text: String },
    Extract { selector: String },
    Wait { condition: WaitCondition },
    Finish { result: String },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Navigate { .. } => "navigate",
            Action::Click { .. } => "click",
            Action::Type { .. } => "type",
            Action::Extract { .. } => "extract",
            Action::Wait { .. } => "wait",
            Action::Finish { .. } => "finish",
        }
    }

    /// Whether performing the action may change page state.
    ///
    /// Results of such actions must never be served from a cache.
    pub fn has_side_effects(&self) -> bool {
        matches!(
            self,
            Action::Navigate { .. } | Action::Click { .. } | Action::Type { .. }
        )
    }

    /// Whether the controller should wait for the page to settle afterwards
    pub fn needs_settle(&self) -> bool {
        self.has_side_effects()
    }

    /// Short one-line description used in prompts and progress output
    pub fn summary(&self) -> String {
        match self {
            Action::Navigate { url } => format!("navigate {}", url),
            Action::Click { selector } => format!("click {}", selector),
            Action::Type { selector, text } => {
                format!("type {:?} into {}", truncate(text, 40), selector)
            }
            Action::Extract { selector } => format!("extract {}", selector),
            Action::Wait { condition } => format!("wait for {}", condition),
            Action::Finish { result } => format!("finish: {}", truncate(result, 60)),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

/// A parsed model decision: the action plus the raw reply it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    pub raw: String,
}
