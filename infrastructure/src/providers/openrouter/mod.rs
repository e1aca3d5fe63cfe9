//! OpenRouter chat completions adapter
//!
//! One HTTP endpoint fronting many hosted models; the free-tier models are the
//! default fallback candidates.

mod gateway;
pub mod types;

pub use gateway::{DEFAULT_BASE_URL, OpenRouterConfig, OpenRouterGateway};
