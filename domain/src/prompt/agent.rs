//! Prompt templates for the browser agent

use crate::agent::action_parser::{ACTION_FENCE, ActionParseError, MAX_WAIT_MS};
use crate::agent::goal::Goal;
use crate::agent::observation::Observation;
use crate::agent::transcript::{ActionResult, Turn};
use crate::core::string::truncate;
use crate::session::entities::Message;

/// Longest slice of page text repeated for past turns
const HISTORY_CONTENT_CHARS: usize = 160;

/// Templates for generating agent prompts
pub struct AgentPromptTemplate;

impl AgentPromptTemplate {
    /// System prompt teaching the action encoding
    ///
    /// `max_wait_ms` is the longest `wait` the browser honors; it never
    /// exceeds [`MAX_WAIT_MS`].
    pub fn agent_system(max_wait_ms: u64) -> String {
        format!(
            r#"You are a browser automation agent. You pursue the user's goal by controlling a single web page, one action at a time.

## Actions

- navigate: open a URL. Fields: "url"
- click: click the first element matching a CSS selector. Fields: "selector"
- type: type text into the element matching a CSS selector. Fields: "selector", "text"
- extract: read the text of every element matching a CSS selector. Fields: "selector"
- wait: wait for exactly one of "selector" (CSS), "ms" (1..={max_wait}) or "network_idle": true
- finish: stop and report the answer. Fields: "result" (string)

Every action may also carry a short "thought" string explaining your intent.

## Reply format

Reply with exactly ONE fenced block tagged `{fence}` holding ONE JSON object, for example:

```{fence}
{{"action": "click", "selector": "button[type=submit]", "thought": "submit the search form"}}
```

Never put more than one action in a reply. Do not invent fields. After each action you will see the resulting page. When the goal is achieved, or is impossible, use finish and explain the result."#,
            fence = ACTION_FENCE,
            max_wait = max_wait_ms.clamp(1, MAX_WAIT_MS),
        )
    }

    /// User prompt for one decision
    pub fn decision_prompt(
        goal: &Goal,
        recent: &[Turn],
        observation: &Observation,
        max_observation_chars: usize,
    ) -> String {
        let constraints = if goal.constraints().is_empty() {
            String::new()
        } else {
            let lines = goal
                .constraints()
                .iter()
                .map(|c| format!("- {}", c))
                .collect::<Vec<_>>()
                .join("\n");
            format!("\n\n## Constraints\n\n{}", lines)
        };

        let history = if recent.is_empty() {
            "No actions taken yet.".to_string()
        } else {
            recent.iter().map(Self::turn_line).collect::<Vec<_>>().join("\n")
        };

        format!(
            r#"## Goal

{goal}{constraints}

## Recent actions

{history}

## Current page

{page}

Choose the next action."#,
            goal = goal.description(),
            constraints = constraints,
            history = history,
            page = Self::observation_block(observation, max_observation_chars),
        )
    }

    /// Corrective system message after an undecodable reply
    pub fn parse_correction(error: &ActionParseError) -> String {
        format!(
            "Your previous reply could not be used: {}. Reply again with exactly one ```{} block containing one JSON action object and nothing else inside it.",
            error, ACTION_FENCE
        )
    }

    /// The full message list for a decision: system prompt then the decision prompt
    pub fn decision_messages(
        goal: &Goal,
        max_wait_ms: u64,
        recent: &[Turn],
        observation: &Observation,
        max_observation_chars: usize,
    ) -> Vec<Message> {
        vec![
            Message::system(Self::agent_system(max_wait_ms)),
            Message::user(Self::decision_prompt(
                goal,
                recent,
                observation,
                max_observation_chars,
            )),
        ]
    }

    fn observation_block(observation: &Observation, max_chars: usize) -> String {
        let title = observation
            .title
            .as_deref()
            .map(|t| format!("Title: {}\n", t))
            .unwrap_or_default();
        let content = if observation.content.trim().is_empty() {
            "(no text content)".to_string()
        } else {
            truncate(&observation.content, max_chars)
        };
        format!("URL: {}\n{}Content:\n{}", observation.url, title, content)
    }

    fn turn_line(turn: &Turn) -> String {
        let result = match &turn.result {
            ActionResult::Succeeded { observation } => format!(
                "ok -> {} | {}",
                observation.url,
                truncate(&observation.content, HISTORY_CONTENT_CHARS)
            ),
            ActionResult::Failed { kind, message } => format!("FAILED ({}): {}", kind, message),
        };
        format!("{}. {} => {}", turn.cycle, turn.decision.action.summary(), result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::action::{Action, Decision};
    use crate::agent::transcript::{ActionFailureKind, Transcript};
    use crate::session::entities::Role;

    fn goal() -> Goal {
        Goal::new("Find the docs link").unwrap().with_constraint("do not log in")
    }

    #[test]
    fn test_system_prompt_teaches_fence() {
        let prompt = AgentPromptTemplate::agent_system(MAX_WAIT_MS);
        assert!(prompt.contains("```action"));
        assert!(prompt.contains("finish"));
        assert!(prompt.contains("\"ms\" (1..=60000)"));
    }

    #[test]
    fn test_system_prompt_states_wait_cap() {
        assert!(AgentPromptTemplate::agent_system(20_000).contains("\"ms\" (1..=20000)"));
        // Never advertises more than the parser accepts
        assert!(AgentPromptTemplate::agent_system(u64::MAX).contains("\"ms\" (1..=60000)"));
    }

    #[test]
    fn test_decision_prompt_without_history() {
        let observation = Observation::new("https://example.com", "Example Domain").with_title("Example");
        let prompt = AgentPromptTemplate::decision_prompt(&goal(), &[], &observation, 1000);

        assert!(prompt.contains("Find the docs link"));
        assert!(prompt.contains("- do not log in"));
        assert!(prompt.contains("No actions taken yet."));
        assert!(prompt.contains("URL: https://example.com"));
        assert!(prompt.contains("Title: Example"));
    }

    #[test]
    fn test_decision_prompt_lists_failures_and_truncates_page() {
        let mut transcript = Transcript::new();
        transcript.record(
            Observation::new("https://example.com", ""),
            Decision {
                action: Action::Click {
                    selector: "#docs".to_string(),
                },
                thought: None,
                raw: String::new(),
            },
            ActionResult::Failed {
                kind: ActionFailureKind::ElementNotFound,
                message: "no element matches #docs".to_string(),
            },
        );

        let observation = Observation::new("https://example.com", "x".repeat(500));
        let prompt = AgentPromptTemplate::decision_prompt(&goal(), transcript.turns(), &observation, 50);

        assert!(prompt.contains("1. click #docs => FAILED (element_not_found): no element matches #docs"));
        assert!(!prompt.contains(&"x".repeat(60)));
    }

    #[test]
    fn test_decision_messages_roles() {
        let observation = Observation::new("about:blank", "");
        let messages = AgentPromptTemplate::decision_messages(&goal(), MAX_WAIT_MS, &[], &observation, 100);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages.iter().all(|m| !m.is_empty()));
    }

    #[test]
    fn test_parse_correction_mentions_error() {
        let text = AgentPromptTemplate::parse_correction(&ActionParseError::MultipleActionBlocks(2));
        assert!(text.contains("found 2 ```action blocks"));
    }
}
