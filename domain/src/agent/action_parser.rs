//! Decoding model replies into [`Decision`]s.
//!
//! The model must answer with exactly one fenced block tagged `action`
//! holding a single JSON object:
//!
//! ````text
//! ```action
//! {"action": "type", "selector": "input[name=q]", "text": "rust"}
//! ```
//! ````
//!
//! A reply that is nothing but one JSON object is tolerated. Everything
//! else (no block, several blocks, unknown tags or fields, wrong types) is
//! rejected with an [`ActionParseError`] whose message is shown back to the
//! model on the next attempt.

use super::action::{Action, Decision, WaitCondition};
use serde_json::{Map, Value};
use thiserror::Error;

/// Fence info string that marks an action block
pub const ACTION_FENCE: &str = "action";

/// Longest pause a `wait` may request
pub const MAX_WAIT_MS: u64 = 60_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionParseError {
    #[error("no ```action block found in the reply")]
    NoActionBlock,

    #[error("found {0} ```action blocks; exactly one is allowed")]
    MultipleActionBlocks(usize),

    #[error("the ```action block is not closed")]
    UnterminatedBlock,

    #[error("action block is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("action must be a JSON object")]
    NotAnObject,

    #[error("missing \"action\" field")]
    MissingTag,

    #[error("unknown action {0:?}")]
    UnknownAction(String),

    #[error("{action}: missing field {field:?}")]
    MissingField { action: String, field: String },

    #[error("{action}: field {field:?} must be {expected}")]
    WrongType {
        action: String,
        field: String,
        expected: &'static str,
    },

    #[error("{action}: field {field:?} must not be empty")]
    EmptyField { action: String, field: String },

    #[error("{action}: unknown field {field:?}")]
    UnknownField { action: String, field: String },

    #[error("wait: {0}")]
    InvalidWait(String),
}

/// Parse one decision out of a raw model reply.
pub fn parse_decision(reply: &str) -> Result<Decision, ActionParseError> {
    let body = extract_action_body(reply)?;
    let value: Value =
        serde_json::from_str(&body).map_err(|e| ActionParseError::InvalidJson(e.to_string()))?;
    let (action, thought) = parse_action_json(&value)?;
    Ok(Decision {
        action,
        thought,
        raw: reply.to_string(),
    })
}

/// Locate the single action payload in the reply text.
fn extract_action_body(reply: &str) -> Result<String, ActionParseError> {
    let mut blocks: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for line in reply.lines() {
        let trimmed = line.trim();
        match current.as_mut() {
            Some(block) => {
                if trimmed == "```" {
                    blocks.push(std::mem::take(block));
                    current = None;
                } else {
                    block.push_str(line);
                    block.push('\n');
                }
            }
            None => {
                if let Some(info) = trimmed.strip_prefix("```")
                    && info.trim() == ACTION_FENCE
                {
                    current = Some(String::new());
                }
            }
        }
    }

    if current.is_some() {
        return Err(ActionParseError::UnterminatedBlock);
    }

    match blocks.len() {
        1 => Ok(blocks.remove(0)),
        0 => {
            let trimmed = reply.trim();
            if trimmed.starts_with('{') && trimmed.ends_with('}') {
                Ok(trimmed.to_string())
            } else {
                Err(ActionParseError::NoActionBlock)
            }
        }
        n => Err(ActionParseError::MultipleActionBlocks(n)),
    }
}

/// Validate a JSON object against the closed action grammar.
pub fn parse_action_json(value: &Value) -> Result<(Action, Option<String>), ActionParseError> {
    let object = value.as_object().ok_or(ActionParseError::NotAnObject)?;
    let tag = match object.get("action") {
        Some(Value::String(tag)) => tag.as_str(),
        Some(_) => {
            return Err(ActionParseError::WrongType {
                action: "?".to_string(),
                field: "action".to_string(),
                expected: "a string",
            });
        }
        None => return Err(ActionParseError::MissingTag),
    };

    let allowed: &[&str] = match tag {
        "navigate" => &["url"],
        "click" | "extract" => &["selector"],
        "type" => &["selector", "text"],
        "wait" => &["selector", "ms", "network_idle"],
        "finish" => &["result"],
        other => return Err(ActionParseError::UnknownAction(other.to_string())),
    };

    for key in object.keys() {
        if key != "action" && key != "thought" && !allowed.contains(&key.as_str()) {
            return Err(ActionParseError::UnknownField {
                action: tag.to_string(),
                field: key.clone(),
            });
        }
    }

    let thought = match object.get("thought") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            return Err(ActionParseError::WrongType {
                action: tag.to_string(),
                field: "thought".to_string(),
                expected: "a string",
            });
        }
    };

    let action = match tag {
        "navigate" => Action::Navigate {
            url: required_str(object, tag, "url", false)?,
        },
        "click" => Action::Click {
            selector: required_str(object, tag, "selector", false)?,
        },
        "extract" => Action::Extract {
            selector: required_str(object, tag, "selector", false)?,
        },
        "type" => Action::Type {
            selector: required_str(object, tag, "selector", false)?,
            text: required_str(object, tag, "text", true)?,
        },
        "wait" => Action::Wait {
            condition: parse_wait(object)?,
        },
        "finish" => Action::Finish {
            result: parse_result(object)?,
        },
        other => return Err(ActionParseError::UnknownAction(other.to_string())),
    };

    Ok((action, thought))
}

fn required_str(
    object: &Map<String, Value>,
    action: &str,
    field: &str,
    allow_empty: bool,
) -> Result<String, ActionParseError> {
    match object.get(field) {
        Some(Value::String(s)) => {
            if !allow_empty && s.trim().is_empty() {
                return Err(ActionParseError::EmptyField {
                    action: action.to_string(),
                    field: field.to_string(),
                });
            }
            Ok(if allow_empty { s.clone() } else { s.trim().to_string() })
        }
        Some(_) => Err(ActionParseError::WrongType {
            action: action.to_string(),
            field: field.to_string(),
            expected: "a string",
        }),
        None => Err(ActionParseError::MissingField {
            action: action.to_string(),
            field: field.to_string(),
        }),
    }
}

fn parse_wait(object: &Map<String, Value>) -> Result<WaitCondition, ActionParseError> {
    let given: Vec<&str> = ["selector", "ms", "network_idle"]
        .into_iter()
        .filter(|k| object.contains_key(*k))
        .collect();
    if given.len() != 1 {
        return Err(ActionParseError::InvalidWait(
            "exactly one of \"selector\", \"ms\" or \"network_idle\" is required".to_string(),
        ));
    }

    match given[0] {
        "selector" => Ok(WaitCondition::Selector {
            selector: required_str(object, "wait", "selector", false)?,
        }),
        "ms" => {
            let ms = object
                .get("ms")
                .and_then(Value::as_u64)
                .ok_or_else(|| ActionParseError::WrongType {
                    action: "wait".to_string(),
                    field: "ms".to_string(),
                    expected: "a positive integer",
                })?;
            if ms == 0 || ms > MAX_WAIT_MS {
                return Err(ActionParseError::InvalidWait(format!(
                    "\"ms\" must be between 1 and {}",
                    MAX_WAIT_MS
                )));
            }
            Ok(WaitCondition::Duration { ms })
        }
        _ => match object.get("network_idle") {
            Some(Value::Bool(true)) => Ok(WaitCondition::NetworkIdle),
            _ => Err(ActionParseError::InvalidWait(
                "\"network_idle\" must be true".to_string(),
            )),
        },
    }
}

fn parse_result(object: &Map<String, Value>) -> Result<String, ActionParseError> {
    match object.get("result") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(ActionParseError::MissingField {
            action: "finish".to_string(),
            field: "result".to_string(),
        }),
        Some(other) => Ok(other.to_string()),
    }
}
