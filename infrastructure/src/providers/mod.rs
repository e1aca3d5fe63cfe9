//! LLM provider adapters implementing the
//! [`LlmGateway`](webpilot_application::LlmGateway) port.

pub mod openrouter;

pub use openrouter::{OpenRouterConfig, OpenRouterGateway};
