//! Session parameters for agent loop control.
//!
//! [`SessionConfig`] groups the static parameters that bound one run of
//! [`RunSessionUseCase`](crate::use_cases::run_session::RunSessionUseCase).
//! It is consumed read-only; the CLI builds it from the loaded config file.

use std::time::Duration;

/// Agent loop control parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum completed decide-act-observe cycles before aborting.
    pub max_cycles: usize,
    /// Consecutive failed actions that abort the session.
    pub max_action_failures: usize,
    /// Extra attempts allowed for one decision after an undecodable reply.
    pub max_parse_retries: usize,
    /// Number of recent turns embedded in each decision prompt.
    pub history_window: usize,
    /// Page text budget for the current observation in the prompt.
    pub max_observation_chars: usize,
    /// Bound on each model call. `None` leaves it to the adapter.
    pub call_timeout: Option<Duration>,
    /// Bound on each browser action.
    pub action_timeout: Duration,
    /// Overall session deadline.
    pub session_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_cycles: 25,
            max_action_failures: 3,
            max_parse_retries: 2,
            history_window: 6,
            max_observation_chars: 4000,
            call_timeout: Some(Duration::from_secs(30)),
            action_timeout: Duration::from_secs(20),
            session_timeout: None,
        }
    }
}

impl SessionConfig {
    // ==================== Builder Methods ====================

    pub fn with_max_cycles(mut self, max: usize) -> Self {
        self.max_cycles = max;
        self
    }

    pub fn with_max_action_failures(mut self, max: usize) -> Self {
        self.max_action_failures = max;
        self
    }

    pub fn with_max_parse_retries(mut self, max: usize) -> Self {
        self.max_parse_retries = max;
        self
    }

    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    pub fn with_max_observation_chars(mut self, chars: usize) -> Self {
        self.max_observation_chars = chars;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    pub fn with_session_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.session_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.max_cycles, 25);
        assert_eq!(config.max_action_failures, 3);
        assert_eq!(config.max_parse_retries, 2);
        assert_eq!(config.call_timeout, Some(Duration::from_secs(30)));
        assert!(config.session_timeout.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let config = SessionConfig::default()
            .with_max_cycles(5)
            .with_max_action_failures(1)
            .with_session_timeout(Some(Duration::from_secs(60)));
        assert_eq!(config.max_cycles, 5);
        assert_eq!(config.max_action_failures, 1);
        assert_eq!(config.session_timeout, Some(Duration::from_secs(60)));
    }
}
