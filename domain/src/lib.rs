//! Domain layer for webpilot
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Agent session
//!
//! A session pursues one [`Goal`] by alternating between asking a model for a
//! [`Decision`] and performing its [`Action`] on a browser page. Every
//! attempted action is recorded as a [`Turn`] in the [`Transcript`], and the
//! session ends in exactly one [`SessionOutcome`].
//!
//! ## Model fallback
//!
//! Each decision is requested from an ordered list of [`ModelCandidate`]s.
//! Failed attempts are kept as [`FailureRecord`]s so the caller can see why
//! every candidate was skipped.

pub mod agent;
pub mod config;
pub mod core;
pub mod prompt;
pub mod session;

// Re-export commonly used types
pub use agent::{
    action::{Action, Decision, WaitCondition},
    action_parser::{ActionParseError, MAX_WAIT_MS, parse_action_json, parse_decision},
    entities::AgentPhase,
    goal::Goal,
    observation::Observation,
    outcome::{AbortCause, SessionOutcome, SessionReport},
    transcript::{ActionFailureKind, ActionResult, Transcript, Turn},
};
pub use config::OutputFormat;
pub use core::{
    error::DomainError,
    model::{ModelCandidate, ModelId},
};
pub use prompt::AgentPromptTemplate;
pub use session::{
    entities::{Message, Role},
    failure::{FailureRecord, ProviderErrorKind},
    response::{ModelResponse, Usage},
};
