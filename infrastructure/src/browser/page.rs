//! Blocking page operations on one Chrome tab.
//!
//! `headless_chrome` is synchronous, so everything here runs on the blocking
//! thread pool (see [`ChromeController`](super::ChromeController)).

use super::chrome::ChromeOptions;
use super::scripts::{
    self, ExtractedText, POLL_INTERVAL, PageActivity, ProbeVerdict, QUIET_WINDOW, SelectorProbe,
    SettleTracker, WaitBudget,
};
use super::url::{is_relative, normalize_url};
use headless_chrome::Tab;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use webpilot_application::BrowserError;
use webpilot_domain::core::string::{squash_whitespace, truncate};
use webpilot_domain::{Action, Observation, WaitCondition};

/// One tab, the limits that apply to it and the time left for waiting
pub(crate) struct Page<'a> {
    tab: &'a Tab,
    options: &'a ChromeOptions,
    budget: WaitBudget,
}

impl<'a> Page<'a> {
    /// A page whose waits share one action timeout, starting now
    pub fn new(tab: &'a Tab, options: &'a ChromeOptions) -> Self {
        let budget = WaitBudget::starting_at(Instant::now(), options.action_timeout);
        Self::with_budget(tab, options, budget)
    }

    pub fn with_budget(tab: &'a Tab, options: &'a ChromeOptions, budget: WaitBudget) -> Self {
        Self {
            tab,
            options,
            budget,
        }
    }

    /// Dispatch one action and observe the page afterwards.
    pub fn perform(
        &self,
        action: &Action,
        screenshot: Option<PathBuf>,
    ) -> Result<Observation, BrowserError> {
        match action {
            Action::Navigate { url } => self.navigate(url)?,
            Action::Click { selector } => {
                self.locate(selector, true)?;
                let element = self
                    .tab
                    .find_element(selector)
                    .map_err(|_| BrowserError::ElementNotFound(selector.clone()))?;
                element
                    .click()
                    .map_err(|e| BrowserError::Evaluation(format!("click failed: {}", e)))?;
            }
            Action::Type { selector, text } => {
                self.locate(selector, true)?;
                let element = self
                    .tab
                    .find_element(selector)
                    .map_err(|_| BrowserError::ElementNotFound(selector.clone()))?;
                element
                    .type_into(text)
                    .map_err(|e| BrowserError::Evaluation(format!("typing failed: {}", e)))?;
            }
            Action::Extract { selector } => {
                self.locate(selector, true)?;
                return self.extract(selector, screenshot);
            }
            Action::Wait { condition } => self.wait(condition)?,
            Action::Finish { .. } => {
                return Err(BrowserError::Evaluation(
                    "finish is not a browser action".to_string(),
                ));
            }
        }

        if action.needs_settle() && !self.settle() {
            debug!("Page still busy after {}; observing anyway", action.name());
        }
        self.observe(screenshot)
    }

    /// Load `target` and wait until the browser reports the navigation done.
    ///
    /// Settling is left to the caller.
    pub fn navigate(&self, target: &str) -> Result<(), BrowserError> {
        let url = normalize_url(target)
            .ok_or_else(|| BrowserError::NavigationFailed("empty URL".to_string()))?;
        let url = if is_relative(&url) {
            self.eval_string(&scripts::resolve_url(&url))
                .map_err(|e| BrowserError::NavigationFailed(format!("cannot resolve {}: {}", url, e)))?
        } else {
            url
        };

        debug!("Navigating to {}", url);
        self.tab
            .navigate_to(&url)
            .map_err(|e| BrowserError::NavigationFailed(format!("{}: {}", url, e)))?;

        // The tab's default timeout bounds the navigation wait; lend it what
        // is left of the budget and restore it afterwards
        let remaining = self.budget.remaining(Instant::now()).max(POLL_INTERVAL);
        self.tab.set_default_timeout(remaining);
        let navigated = self.tab.wait_until_navigated().map(|_| ());
        self.tab.set_default_timeout(self.options.action_timeout);

        navigated.map_err(|e| BrowserError::NavigationFailed(format!("{}: {}", url, e)))
    }

    fn wait(&self, condition: &WaitCondition) -> Result<(), BrowserError> {
        match condition {
            WaitCondition::Selector { selector } => self.locate(selector, false),
            WaitCondition::Duration { ms } => {
                let wanted = Duration::from_millis(*ms);
                let granted = self.budget.cap(wanted, Instant::now());
                if granted < wanted {
                    debug!("Shortening a {}ms wait to {:?}", ms, granted);
                }
                thread::sleep(granted);
                Ok(())
            }
            WaitCondition::NetworkIdle => {
                if self.settle() {
                    Ok(())
                } else {
                    let bound = self.options.action_timeout.as_millis();
                    Err(BrowserError::ActionTimeout(
                        u64::try_from(bound).unwrap_or(u64::MAX),
                    ))
                }
            }
        }
    }

    /// Poll until `selector` matches.
    ///
    /// With `fail_fast`, a fully loaded document without a match fails at
    /// once with `ElementNotFound`; otherwise only the budget ends the poll.
    fn locate(&self, selector: &str, fail_fast: bool) -> Result<(), BrowserError> {
        let started = Instant::now();
        let bound = self.budget.remaining(started);
        let script = scripts::probe_selector(selector);

        loop {
            let probe: SelectorProbe = self.eval_json(&script)?;
            match scripts::judge_probe(&probe, started.elapsed(), bound, fail_fast) {
                ProbeVerdict::Found => return Ok(()),
                ProbeVerdict::Missing => {
                    return Err(BrowserError::ElementNotFound(selector.to_string()));
                }
                ProbeVerdict::TimedOut => {
                    return Err(BrowserError::SelectorTimeout {
                        selector: selector.to_string(),
                        waited_ms: started.elapsed().as_millis() as u64,
                    });
                }
                ProbeVerdict::Invalid(error) => return Err(invalid_selector(selector, &error)),
                ProbeVerdict::Pending => {
                    thread::sleep(self.budget.cap(POLL_INTERVAL, Instant::now()));
                }
            }
        }
    }

    /// Wait until the page is quiet, bounded by what is left of the budget.
    ///
    /// Returns false when the budget ran out first.
    pub fn settle(&self) -> bool {
        let mut tracker = SettleTracker::new(QUIET_WINDOW);

        loop {
            match self.eval_json::<PageActivity>(scripts::PAGE_ACTIVITY) {
                Ok(activity) => {
                    if tracker.observe(activity, Instant::now()) {
                        return true;
                    }
                }
                // The execution context goes away while a navigation commits
                Err(e) => {
                    debug!("Page activity probe failed: {}", e);
                    tracker.reset();
                }
            }

            let now = Instant::now();
            if self.budget.is_spent(now) {
                return false;
            }
            thread::sleep(self.budget.cap(POLL_INTERVAL, now));
        }
    }

    fn extract(
        &self,
        selector: &str,
        screenshot: Option<PathBuf>,
    ) -> Result<Observation, BrowserError> {
        let texts = match self.eval_json::<ExtractedText>(&scripts::extract_text(selector))? {
            ExtractedText::Texts(texts) => texts,
            ExtractedText::Invalid { error } => return Err(invalid_selector(selector, &error)),
        };

        let content = truncate(&texts.join("\n"), self.options.max_observation_chars);
        Ok(self.snapshot(content, screenshot))
    }

    /// Capture URL, title and visible text of the current page.
    pub fn observe(&self, screenshot: Option<PathBuf>) -> Result<Observation, BrowserError> {
        let text = self.eval_string(scripts::BODY_TEXT)?;
        let content = truncate(
            &squash_whitespace(&text),
            self.options.max_observation_chars,
        );
        Ok(self.snapshot(content, screenshot))
    }

    fn snapshot(&self, content: String, screenshot: Option<PathBuf>) -> Observation {
        let mut observation = Observation::new(self.tab.get_url(), content);
        if let Ok(title) = self.tab.get_title() {
            observation = observation.with_title(title);
        }
        if let Some(path) = screenshot {
            match self.capture(&path) {
                Ok(()) => observation = observation.with_screenshot(path),
                Err(e) => warn!("Could not save screenshot {}: {}", path.display(), e),
            }
        }
        observation
    }

    fn capture(&self, path: &Path) -> Result<(), String> {
        let png = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| e.to_string())?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(path, png).map_err(|e| e.to_string())
    }

    fn eval_string(&self, script: &str) -> Result<String, BrowserError> {
        let object = self
            .tab
            .evaluate(script, false)
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?;
        Ok(match object.value {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
    }

    fn eval_json<T: DeserializeOwned>(&self, script: &str) -> Result<T, BrowserError> {
        let raw = self.eval_string(script)?;
        serde_json::from_str(&raw)
            .map_err(|e| BrowserError::Evaluation(format!("unexpected script result ({}): {}", e, raw)))
    }
}

/// A selector the browser refused to parse; the browser's reason is kept for
/// the model.
fn invalid_selector(selector: &str, error: &str) -> BrowserError {
    BrowserError::Evaluation(format!("invalid selector {:?}: {}", selector, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpilot_domain::ActionFailureKind;

    #[test]
    fn test_invalid_selector_keeps_browser_message() {
        let err = invalid_selector(
            "a[href",
            "SyntaxError: 'a[href' is not a valid selector",
        );
        assert_eq!(err.kind(), ActionFailureKind::Evaluation);
        let message = err.to_string();
        assert!(message.contains("\"a[href\""));
        assert!(message.contains("is not a valid selector"));
    }
}
