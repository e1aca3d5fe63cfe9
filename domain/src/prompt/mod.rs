//! Prompt domain
//!
//! Templates for the decision prompt and the corrective messages sent after
//! an undecodable reply.

pub mod agent;

pub use agent::AgentPromptTemplate;
