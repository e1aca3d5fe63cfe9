//! Page scripts evaluated over CDP and the decisions drawn from their results.
//!
//! Every script returns a JSON string, since `Runtime.evaluate` only hands
//! back primitives by value. The polling decisions are plain functions so
//! they can be tested without a browser.

use serde::Deserialize;
use std::time::{Duration, Instant};

/// Interval between two probes of the page
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long the resource count must stay unchanged for the page to count as
/// settled
pub const QUIET_WINDOW: Duration = Duration::from_millis(500);

/// Document readiness plus the number of resources fetched so far
pub const PAGE_ACTIVITY: &str = "JSON.stringify({ready: document.readyState, \
     resources: performance.getEntriesByType('resource').length})";

/// Visible text of the whole page
pub const BODY_TEXT: &str = "document.body ? document.body.innerText : ''";

/// Count the matches for `selector` (invalid selectors report an error)
pub fn probe_selector(selector: &str) -> String {
    format!(
        "(() => {{ try {{ return JSON.stringify({{count: document.querySelectorAll({}).length, \
         ready: document.readyState}}); }} catch (e) {{ return JSON.stringify({{error: String(e)}}); }} }})()",
        js_string(selector)
    )
}

/// Text of every element matching `selector`, empty ones dropped
pub fn extract_text(selector: &str) -> String {
    format!(
        "(() => {{ try {{ return JSON.stringify(Array.from(document.querySelectorAll({})) \
         .map(el => (el.innerText || el.textContent || '').trim()) \
         .filter(t => t.length > 0)); }} catch (e) {{ return JSON.stringify({{error: String(e)}}); }} }})()",
        js_string(selector)
    )
}

/// Absolute form of a relative `url`, resolved against the current document
pub fn resolve_url(url: &str) -> String {
    format!("new URL({}, document.baseURI).href", js_string(url))
}

/// JSON string literals are valid JavaScript string literals.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Result of [`PAGE_ACTIVITY`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageActivity {
    pub ready: String,
    pub resources: u64,
}

impl PageActivity {
    pub fn is_complete(&self) -> bool {
        self.ready == "complete"
    }
}

/// Result of [`probe_selector`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SelectorProbe {
    Counted { count: u64, ready: String },
    Invalid { error: String },
}

/// Result of [`extract_text`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExtractedText {
    Texts(Vec<String>),
    Invalid { error: String },
}

/// What to do after one selector probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeVerdict {
    Found,
    /// The document finished loading and nothing matches
    Missing,
    /// The bound expired while the page was still loading (or, for an
    /// explicit wait, while nothing matched)
    TimedOut,
    Invalid(String),
    Pending,
}

/// Judge one probe.
///
/// With `fail_fast` a complete document without a match is final; without
/// it (the `wait` action) only the bound ends the poll.
pub fn judge_probe(
    probe: &SelectorProbe,
    elapsed: Duration,
    bound: Duration,
    fail_fast: bool,
) -> ProbeVerdict {
    match probe {
        SelectorProbe::Invalid { error } => ProbeVerdict::Invalid(error.clone()),
        SelectorProbe::Counted { count, .. } if *count > 0 => ProbeVerdict::Found,
        SelectorProbe::Counted { ready, .. } if fail_fast && ready == "complete" => {
            ProbeVerdict::Missing
        }
        SelectorProbe::Counted { .. } if elapsed >= bound => ProbeVerdict::TimedOut,
        SelectorProbe::Counted { .. } => ProbeVerdict::Pending,
    }
}

/// Time left for all the waits of one action.
///
/// Every stage (navigation, settling, selector polling, sleeping) draws from
/// the same deadline, so an action never waits longer than its bound in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBudget {
    /// `None` when the bound is too far out to represent
    deadline: Option<Instant>,
}

impl WaitBudget {
    pub fn starting_at(start: Instant, total: Duration) -> Self {
        Self {
            deadline: start.checked_add(total),
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(now),
            None => Duration::MAX,
        }
    }

    pub fn is_spent(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }

    /// `wanted`, shortened to what is left
    pub fn cap(&self, wanted: Duration, now: Instant) -> Duration {
        wanted.min(self.remaining(now))
    }
}

/// Tracks page activity samples until the page has been quiet long enough.
///
/// Settled means: the document is complete and the resource count has not
/// changed for [`QUIET_WINDOW`].
#[derive(Debug)]
pub struct SettleTracker {
    quiet: Duration,
    last: Option<PageActivity>,
    stable_since: Option<Instant>,
}

impl SettleTracker {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last: None,
            stable_since: None,
        }
    }

    /// Feed one sample; returns true once the page is settled.
    pub fn observe(&mut self, sample: PageActivity, now: Instant) -> bool {
        if !sample.is_complete() {
            self.reset();
            return false;
        }

        if self.last.as_ref() == Some(&sample) {
            let since = *self.stable_since.get_or_insert(now);
            return now.duration_since(since) >= self.quiet;
        }

        self.last = Some(sample);
        self.stable_since = Some(now);
        false
    }

    /// Forget history, e.g. when the page could not be sampled mid-navigation.
    pub fn reset(&mut self) {
        self.last = None;
        self.stable_since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(ready: &str, resources: u64) -> PageActivity {
        PageActivity {
            ready: ready.to_string(),
            resources,
        }
    }

    #[test]
    fn test_selector_is_escaped() {
        let script = probe_selector(r#"a[title="it's \ here"]"#);
        assert!(script.contains(r#"querySelectorAll("a[title=\"it's \\ here\"]")"#));

        let script = extract_text("p\n.x");
        assert!(script.contains(r#"querySelectorAll("p\n.x")"#));

        assert_eq!(
            resolve_url("/next"),
            r#"new URL("/next", document.baseURI).href"#
        );
    }

    #[test]
    fn test_probe_results_deserialize() {
        let counted: SelectorProbe =
            serde_json::from_str(r#"{"count":2,"ready":"complete"}"#).unwrap();
        assert_eq!(
            counted,
            SelectorProbe::Counted {
                count: 2,
                ready: "complete".to_string()
            }
        );

        let invalid: SelectorProbe =
            serde_json::from_str(r#"{"error":"SyntaxError: '##' is not a valid selector"}"#)
                .unwrap();
        assert!(matches!(invalid, SelectorProbe::Invalid { .. }));

        let texts: ExtractedText = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(
            texts,
            ExtractedText::Texts(vec!["a".to_string(), "b".to_string()])
        );
        let invalid: ExtractedText = serde_json::from_str(r#"{"error":"bad"}"#).unwrap();
        assert!(matches!(invalid, ExtractedText::Invalid { .. }));
    }

    #[test]
    fn test_judge_probe() {
        let bound = Duration::from_secs(5);
        let early = Duration::from_millis(100);
        let late = Duration::from_secs(6);

        let found = SelectorProbe::Counted {
            count: 1,
            ready: "loading".to_string(),
        };
        let loading = SelectorProbe::Counted {
            count: 0,
            ready: "interactive".to_string(),
        };
        let complete = SelectorProbe::Counted {
            count: 0,
            ready: "complete".to_string(),
        };

        assert_eq!(judge_probe(&found, late, bound, true), ProbeVerdict::Found);
        assert_eq!(
            judge_probe(&complete, early, bound, true),
            ProbeVerdict::Missing
        );
        assert_eq!(
            judge_probe(&loading, early, bound, true),
            ProbeVerdict::Pending
        );
        assert_eq!(
            judge_probe(&loading, late, bound, true),
            ProbeVerdict::TimedOut
        );

        // An explicit wait keeps polling a complete page until the bound
        assert_eq!(
            judge_probe(&complete, early, bound, false),
            ProbeVerdict::Pending
        );
        assert_eq!(
            judge_probe(&complete, late, bound, false),
            ProbeVerdict::TimedOut
        );

        let invalid = SelectorProbe::Invalid {
            error: "bad".to_string(),
        };
        assert_eq!(
            judge_probe(&invalid, early, bound, true),
            ProbeVerdict::Invalid("bad".to_string())
        );
    }

    #[test]
    fn test_wait_budget_is_shared_between_stages() {
        let start = Instant::now();
        let budget = WaitBudget::starting_at(start, Duration::from_secs(20));

        // Navigation took 5s of the 20s; settling only gets the rest
        let after_load = start + Duration::from_secs(5);
        assert_eq!(budget.remaining(after_load), Duration::from_secs(15));
        assert!(!budget.is_spent(after_load));

        // A settle that never quiets down ends exactly at the shared deadline
        let end = start + Duration::from_secs(20);
        assert!(budget.is_spent(end));
        assert_eq!(budget.remaining(end + Duration::from_secs(3)), Duration::ZERO);
    }

    #[test]
    fn test_wait_budget_caps_sleeps() {
        let start = Instant::now();
        let budget = WaitBudget::starting_at(start, Duration::from_secs(20));

        assert_eq!(
            budget.cap(Duration::from_secs(60), start),
            Duration::from_secs(20)
        );
        assert_eq!(
            budget.cap(Duration::from_millis(500), start + Duration::from_secs(19)),
            Duration::from_millis(500)
        );
        assert_eq!(
            budget.cap(Duration::from_secs(2), start + Duration::from_secs(19)),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_wait_budget_without_representable_deadline() {
        let start = Instant::now();
        let budget = WaitBudget::starting_at(start, Duration::MAX);
        assert_eq!(budget.remaining(start), Duration::MAX);
        assert_eq!(
            budget.cap(Duration::from_secs(5), start),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_settle_requires_quiet_window() {
        let start = Instant::now();
        let mut tracker = SettleTracker::new(QUIET_WINDOW);

        assert!(!tracker.observe(activity("complete", 3), start));
        assert!(!tracker.observe(
            activity("complete", 3),
            start + Duration::from_millis(300)
        ));
        assert!(tracker.observe(
            activity("complete", 3),
            start + Duration::from_millis(500)
        ));
    }

    #[test]
    fn test_settle_restarts_on_new_resources() {
        let start = Instant::now();
        let mut tracker = SettleTracker::new(QUIET_WINDOW);

        tracker.observe(activity("complete", 3), start);
        // A new fetch restarts the window
        assert!(!tracker.observe(
            activity("complete", 4),
            start + Duration::from_millis(400)
        ));
        assert!(!tracker.observe(
            activity("complete", 4),
            start + Duration::from_millis(800)
        ));
        assert!(tracker.observe(
            activity("complete", 4),
            start + Duration::from_millis(900)
        ));
    }

    #[test]
    fn test_settle_waits_for_complete_document() {
        let start = Instant::now();
        let mut tracker = SettleTracker::new(QUIET_WINDOW);

        tracker.observe(activity("complete", 3), start);
        assert!(!tracker.observe(
            activity("loading", 3),
            start + Duration::from_millis(600)
        ));
        assert!(!tracker.observe(
            activity("complete", 3),
            start + Duration::from_millis(700)
        ));
        assert!(tracker.observe(
            activity("complete", 3),
            start + Duration::from_millis(1200)
        ));
    }
}
