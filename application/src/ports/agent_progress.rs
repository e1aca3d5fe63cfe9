//! Agent execution progress port.
//!
//! [`AgentProgressNotifier`] is an **output port** that the presentation layer
//! implements to display real-time session progress to the user.
//! All callback argument types come from the domain layer.
//!
//! # Example Implementation
//!
//! ```ignore
//! use webpilot_application::ports::agent_progress::AgentProgressNotifier;
//!
//! struct MyProgress;
//!
//! impl AgentProgressNotifier for MyProgress {
//!     fn on_cycle_start(&self, cycle: usize, max_cycles: usize) {
//!         println!("cycle {}/{}", cycle, max_cycles);
//!     }
//! }
//! ```

use webpilot_domain::{
    Action, ActionParseError, ActionResult, AgentPhase, Decision, FailureRecord, ModelId,
};

/// Progress notifier for agent sessions.
///
/// All methods have default no-op implementations, so implementers only
/// need to override the callbacks they care about.
pub trait AgentProgressNotifier: Send + Sync {
    /// Called when the session moves to a new phase
    fn on_phase_change(&self, _phase: &AgentPhase) {}

    /// Called before each decision; `cycle` is 1-based
    fn on_cycle_start(&self, _cycle: usize, _max_cycles: usize) {}

    /// Called for each candidate that failed during a fallback round
    fn on_model_failure(&self, _failure: &FailureRecord) {}

    /// Called when a reply has been decoded into an action
    fn on_decision(&self, _model: &ModelId, _decision: &Decision) {}

    /// Called after the browser performed (or failed) an action
    fn on_action_result(&self, _action: &Action, _result: &ActionResult) {}

    /// Called when a reply could not be decoded and the model is asked again
    fn on_parse_retry(&self, _attempt: usize, _max_retries: usize, _error: &ActionParseError) {}
}

/// No-op progress notifier
pub struct NoAgentProgress;

impl AgentProgressNotifier for NoAgentProgress {}
