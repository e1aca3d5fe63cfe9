//! Application layer for webpilot
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::SessionConfig;
pub use ports::{
    agent_progress::{AgentProgressNotifier, NoAgentProgress},
    browser::{BrowserController, BrowserError, BrowserLease},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    llm_gateway::{GatewayError, LlmGateway},
};
pub use use_cases::fallback::{
    FallbackError, FallbackOrchestrator, FallbackRound, FallbackSuccess, RoundStep,
};
pub use use_cases::run_session::{RunSessionInput, RunSessionUseCase, new_session_id};
