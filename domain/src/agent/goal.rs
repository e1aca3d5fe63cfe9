//! The task an agent session pursues.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Natural-language goal plus optional constraints (Value Object).
///
/// Created once at session start and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    description: String,
    constraints: Vec<String>,
}

impl Goal {
    pub fn new(description: impl Into<String>) -> Result<Self, DomainError> {
        let description = description.into().trim().to_string();
        if description.is_empty() {
            return Err(DomainError::EmptyGoal);
        }
        Ok(Self {
            description,
            constraints: Vec::new(),
        })
    }

    /// Add a constraint; blank constraints are ignored
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        let constraint = constraint.into().trim().to_string();
        if !constraint.is_empty() {
            self.constraints.push(constraint);
        }
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn constraints(&self) -> &[String] {
        &self.constraints
    }
}
