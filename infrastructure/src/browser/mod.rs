//! Browser adapter implementing the
//! [`BrowserController`](webpilot_application::BrowserController) port over
//! the Chrome DevTools Protocol.
//!
//! A session either launches its own Chrome (`headless` by default) or
//! attaches to a running one through its DevTools WebSocket URL.

mod chrome;
mod page;
pub mod scripts;
pub mod url;

pub use chrome::{ChromeController, ChromeOptions};
pub use url::normalize_url;
