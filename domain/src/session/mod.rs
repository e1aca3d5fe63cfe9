//! Chat session domain.
//!
//! - [`entities::Message`] - a single role-tagged message sent to a model
//! - [`response::ModelResponse`] - a normalized successful completion
//! - [`failure::FailureRecord`] - why one candidate failed within a fallback round

pub mod entities;
pub mod failure;
pub mod response;
