//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Goal description must not be empty")]
    EmptyGoal,

    #[error("Invalid model identifier: {0:?}")]
    InvalidModel(String),

    #[error("Illegal phase transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_transition_display() {
        let error = DomainError::IllegalTransition {
            from: "finished".to_string(),
            to: "deciding".to_string(),
        };
        assert_eq!(error.to_string(), "Illegal phase transition: finished -> deciding");
    }
}
