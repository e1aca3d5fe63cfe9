//! Browser controller port
//!
//! A [`BrowserController`] owns one remote browser session. The session is
//! held through a [`BrowserLease`] so it is released on every exit path.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use webpilot_domain::{Action, ActionFailureKind, Observation};

/// Errors raised by browser operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    #[error("Could not start browser session: {0}")]
    SessionStart(String),

    #[error("No element matches selector {0:?}")]
    ElementNotFound(String),

    #[error("Selector {selector:?} did not appear within {waited_ms}ms")]
    SelectorTimeout { selector: String, waited_ms: u64 },

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Action timed out after {0}ms")]
    ActionTimeout(u64),

    #[error("Page evaluation failed: {0}")]
    Evaluation(String),

    #[error("Browser session is closed")]
    SessionClosed,
}

impl BrowserError {
    /// Failure kind recorded in the transcript
    ///
    /// `SessionStart` never reaches the transcript; it maps to `SessionClosed`
    /// because no page exists afterwards.
    pub fn kind(&self) -> ActionFailureKind {
        match self {
            BrowserError::ElementNotFound(_) => ActionFailureKind::ElementNotFound,
            BrowserError::SelectorTimeout { .. } => ActionFailureKind::SelectorTimeout,
            BrowserError::NavigationFailed(_) => ActionFailureKind::NavigationFailed,
            BrowserError::ActionTimeout(_) => ActionFailureKind::ActionTimeout,
            BrowserError::Evaluation(_) => ActionFailureKind::Evaluation,
            BrowserError::SessionStart(_) | BrowserError::SessionClosed => {
                ActionFailureKind::SessionClosed
            }
        }
    }
}

/// Controller for a single remote browser session
///
/// Side effects of `perform` are committed once it returns; there is no
/// rollback.
#[async_trait]
pub trait BrowserController: Send + Sync {
    /// Launch or attach to a browser and return the start page observation
    async fn start(&self) -> Result<Observation, BrowserError>;

    /// Dispatch one action and observe the resulting page
    ///
    /// `finish` is never dispatched; implementations may reject it.
    async fn perform(&self, action: &Action) -> Result<Observation, BrowserError>;

    /// Release the browser session. Must be safe to call when `start` failed
    /// or was never called.
    fn stop(&self);
}

/// Scoped ownership of a browser session
///
/// Calls [`BrowserController::stop`] exactly once: on [`release`](Self::release)
/// or, if the owner is dropped early (a cancelled session future), on drop.
pub struct BrowserLease<B: BrowserController + ?Sized> {
    browser: Arc<B>,
    released: bool,
}

impl<B: BrowserController + ?Sized> BrowserLease<B> {
    pub fn new(browser: Arc<B>) -> Self {
        Self {
            browser,
            released: false,
        }
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    /// Tear the session down now
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            debug!("Releasing browser session");
            self.browser.stop();
        }
    }
}

impl<B: BrowserController + ?Sized> Drop for BrowserLease<B> {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingBrowser {
        stops: AtomicUsize,
    }

    #[async_trait]
    impl BrowserController for CountingBrowser {
        async fn start(&self) -> Result<Observation, BrowserError> {
            Ok(Observation::new("about:blank", ""))
        }

        async fn perform(&self, _action: &Action) -> Result<Observation, BrowserError> {
            Err(BrowserError::SessionClosed)
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_release_stops_once() {
        let browser = Arc::new(CountingBrowser::default());
        let lease = BrowserLease::new(browser.clone());
        lease.release();
        assert_eq!(browser.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_stops_once() {
        let browser = Arc::new(CountingBrowser::default());
        {
            let _lease = BrowserLease::new(browser.clone());
        }
        assert_eq!(browser.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dyn_lease() {
        let browser: Arc<dyn BrowserController> = Arc::new(CountingBrowser::default());
        let lease = BrowserLease::new(browser);
        assert!(!lease.released);
        lease.release();
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            BrowserError::ElementNotFound("#x".into()).kind(),
            ActionFailureKind::ElementNotFound
        );
        assert_eq!(
            BrowserError::SelectorTimeout {
                selector: "#x".into(),
                waited_ms: 100
            }
            .kind(),
            ActionFailureKind::SelectorTimeout
        );
        assert_eq!(BrowserError::ActionTimeout(5).kind(), ActionFailureKind::ActionTimeout);
    }
}
