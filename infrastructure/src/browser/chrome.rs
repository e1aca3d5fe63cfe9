//! Chrome implementation of the [`BrowserController`] port.

use super::page::Page;
use super::scripts::WaitBudget;
use async_trait::async_trait;
use headless_chrome::{Browser, Tab};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use webpilot_application::{BrowserController, BrowserError};
use webpilot_domain::{Action, Observation};

/// Keep the DevTools connection open while the model is thinking
/// (the library default of 30 seconds is shorter than a slow model call).
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Launch or attach settings for [`ChromeController`]
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    /// DevTools WebSocket URL of a running browser. `None` launches a new one.
    pub endpoint: Option<String>,
    pub headless: bool,
    pub sandbox: bool,
    pub chrome_path: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    /// Page loaded when the session starts
    pub start_url: String,
    /// Save one PNG per observation here when set
    pub screenshot_dir: Option<PathBuf>,
    pub max_observation_chars: usize,
    pub startup_timeout: Duration,
    /// Bound on the waits inside one action
    pub action_timeout: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            headless: true,
            sandbox: true,
            chrome_path: None,
            user_data_dir: None,
            window_width: 1280,
            window_height: 800,
            start_url: "about:blank".to_string(),
            screenshot_dir: None,
            max_observation_chars: 4000,
            startup_timeout: Duration::from_secs(20),
            action_timeout: Duration::from_secs(20),
        }
    }
}

struct ChromeSession {
    // Dropping the browser kills a launched process or closes the connection
    // to an attached one.
    _browser: Browser,
    tab: Arc<Tab>,
    attached: bool,
}

/// Drives one Chrome tab over the DevTools protocol
///
/// All `headless_chrome` calls are blocking and run on tokio's blocking pool.
pub struct ChromeController {
    options: Arc<ChromeOptions>,
    session: Mutex<Option<ChromeSession>>,
    screenshots: AtomicUsize,
}

impl ChromeController {
    pub fn new(options: ChromeOptions) -> Self {
        Self {
            options: Arc::new(options),
            session: Mutex::new(None),
            screenshots: AtomicUsize::new(0),
        }
    }

    pub fn options(&self) -> &ChromeOptions {
        &self.options
    }

    fn tab(&self) -> Result<Arc<Tab>, BrowserError> {
        self.session
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| Arc::clone(&s.tab)))
            .ok_or(BrowserError::SessionClosed)
    }

    fn next_screenshot(&self) -> Option<PathBuf> {
        let dir = self.options.screenshot_dir.as_ref()?;
        let index = self.screenshots.fetch_add(1, Ordering::SeqCst);
        Some(dir.join(format!("{:04}.png", index)))
    }
}

fn launch(options: &ChromeOptions) -> Result<Browser, BrowserError> {
    let mut launch_opts = headless_chrome::LaunchOptions::default();
    launch_opts.headless = options.headless;
    launch_opts.sandbox = options.sandbox;
    launch_opts.window_size = Some((options.window_width, options.window_height));
    launch_opts.idle_browser_timeout = IDLE_BROWSER_TIMEOUT;
    if let Some(path) = &options.chrome_path {
        launch_opts.path = Some(path.clone());
    }
    if let Some(dir) = &options.user_data_dir {
        launch_opts.user_data_dir = Some(dir.clone());
    }

    Browser::new(launch_opts)
        .map_err(|e| BrowserError::SessionStart(format!("could not launch Chrome: {}", e)))
}

fn attach(endpoint: &str) -> Result<(Browser, Arc<Tab>), BrowserError> {
    let browser = Browser::connect_with_timeout(endpoint.to_string(), IDLE_BROWSER_TIMEOUT)
        .map_err(|e| BrowserError::SessionStart(format!("could not attach to {}: {}", endpoint, e)))?;

    // Take over the page the user already has open, if any
    let existing = browser
        .get_tabs()
        .lock()
        .ok()
        .and_then(|tabs| tabs.first().cloned());
    let tab = match existing {
        Some(tab) => tab,
        None => browser
            .new_tab()
            .map_err(|e| BrowserError::SessionStart(format!("could not open a tab: {}", e)))?,
    };
    Ok((browser, tab))
}

/// Outer bound on a blocking browser task whose own waits stop at `limit`
///
/// The tenth of slack lets the task report its specific failure first.
fn with_slack(limit: Duration) -> Duration {
    limit.saturating_add(limit / 10)
}

/// Launch or attach, then load and observe the start page.
///
/// Launching, loading and settling all share the startup timeout.
fn open_session(
    options: &ChromeOptions,
    screenshot: Option<PathBuf>,
) -> Result<(ChromeSession, Observation), BrowserError> {
    let budget = WaitBudget::starting_at(Instant::now(), options.startup_timeout);
    let (browser, tab, attached) = match &options.endpoint {
        Some(endpoint) => {
            let (browser, tab) = attach(endpoint)?;
            (browser, tab, true)
        }
        None => {
            let browser = launch(options)?;
            let tab = browser
                .new_tab()
                .map_err(|e| BrowserError::SessionStart(format!("could not open a tab: {}", e)))?;
            (browser, tab, false)
        }
    };

    tab.set_default_timeout(options.action_timeout);

    let page = Page::with_budget(&tab, options, budget);
    page.navigate(&options.start_url)
        .map_err(|e| BrowserError::SessionStart(e.to_string()))?;
    if !page.settle() {
        debug!("Start page still busy; observing anyway");
    }
    let observation = page
        .observe(screenshot)
        .map_err(|e| BrowserError::SessionStart(e.to_string()))?;

    let session = ChromeSession {
        _browser: browser,
        tab,
        attached,
    };
    Ok((session, observation))
}

#[async_trait]
impl BrowserController for ChromeController {
    async fn start(&self) -> Result<Observation, BrowserError> {
        if self.tab().is_ok() {
            return Err(BrowserError::SessionStart(
                "browser session already started".to_string(),
            ));
        }

        let options = Arc::clone(&self.options);
        let screenshot = self.next_screenshot();
        let task = tokio::task::spawn_blocking(move || open_session(&options, screenshot));

        // On timeout the blocking task runs to completion on its own and drops
        // whatever browser it opened.
        let limit = with_slack(self.options.startup_timeout);
        let (session, observation) =
            match tokio::time::timeout(limit, task).await {
                Ok(Ok(result)) => result?,
                Ok(Err(join_error)) => {
                    return Err(BrowserError::SessionStart(format!(
                        "browser start task failed: {}",
                        join_error
                    )));
                }
                Err(_) => {
                    return Err(BrowserError::SessionStart(format!(
                        "browser did not start within {}s",
                        self.options.startup_timeout.as_secs()
                    )));
                }
            };

        if session.attached {
            info!("Attached to browser, start page {}", observation.url);
        } else {
            info!("Launched browser, start page {}", observation.url);
        }

        match self.session.lock() {
            Ok(mut guard) => *guard = Some(session),
            Err(_) => {
                return Err(BrowserError::SessionStart(
                    "browser session state is poisoned".to_string(),
                ));
            }
        }
        Ok(observation)
    }

    async fn perform(&self, action: &Action) -> Result<Observation, BrowserError> {
        let tab = self.tab()?;
        let options = Arc::clone(&self.options);
        let screenshot = self.next_screenshot();
        let action = action.clone();

        debug!("Performing {}", action.summary());
        tokio::task::spawn_blocking(move || Page::new(&tab, &options).perform(&action, screenshot))
            .await
            .map_err(|e| BrowserError::Evaluation(format!("browser task failed: {}", e)))?
    }

    fn stop(&self) {
        let session = match self.session.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match session {
            Some(session) if session.attached => {
                info!("Detaching from browser");
                drop(session);
            }
            Some(session) => {
                info!("Closing browser");
                drop(session);
            }
            None => debug!("No browser session to stop"),
        }
    }
}

impl Drop for ChromeController {
    fn drop(&mut self) {
        if self.tab().is_ok() {
            warn!("Browser controller dropped with a live session; closing it");
            self.stop();
        }
    }
}
