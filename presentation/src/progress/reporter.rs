//! Progress reporting for agent sessions
//!
//! Everything goes to stderr so that `--output json` on stdout stays clean.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use webpilot_application::AgentProgressNotifier;
use webpilot_domain::core::string::truncate;
use webpilot_domain::{
    Action, ActionParseError, ActionResult, AgentPhase, Decision, FailureRecord, ModelId,
};

/// Reports progress with a spinner while the model is thinking
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    /// Print a line above the spinner (or plainly when none is active)
    fn println(&self, line: String) {
        match self.spinner.lock().ok().and_then(|s| s.clone()) {
            Some(pb) => pb.println(line),
            None => eprintln!("{}", line),
        }
    }

    fn clear(&self) {
        if let Ok(mut spinner) = self.spinner.lock()
            && let Some(pb) = spinner.take()
        {
            pb.finish_and_clear();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentProgressNotifier for ProgressReporter {
    fn on_phase_change(&self, phase: &AgentPhase) {
        if phase.is_terminal() {
            self.clear();
        }
    }

    fn on_cycle_start(&self, cycle: usize, max_cycles: usize) {
        self.clear();
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_prefix(format!("Cycle {}/{}", cycle, max_cycles));
        pb.set_message("thinking...");
        pb.enable_steady_tick(Duration::from_millis(120));

        if let Ok(mut spinner) = self.spinner.lock() {
            *spinner = Some(pb);
        }
    }

    fn on_model_failure(&self, failure: &FailureRecord) {
        self.println(format!(
            "  {} {} ({}): {}",
            "x".red(),
            failure.model,
            failure.kind,
            truncate(&failure.message, 100)
        ));
    }

    fn on_decision(&self, model: &ModelId, decision: &Decision) {
        if let Ok(spinner) = self.spinner.lock()
            && let Some(pb) = spinner.as_ref()
        {
            pb.set_message(format!("{} {}", decision.action.summary(), format!("({})", model).dimmed()));
        }
    }

    fn on_action_result(&self, action: &Action, result: &ActionResult) {
        let line = match result {
            ActionResult::Succeeded { observation } => format!(
                "{} {} {} {}",
                "v".green(),
                action.summary(),
                "->".dimmed(),
                truncate(&observation.url, 80)
            ),
            ActionResult::Failed { kind, message } => format!(
                "{} {} {} {}: {}",
                "x".red(),
                action.summary(),
                "->".dimmed(),
                kind.as_str().red(),
                truncate(message, 100)
            ),
        };
        self.clear();
        eprintln!("{}", line);
    }

    fn on_parse_retry(&self, attempt: usize, max_retries: usize, error: &ActionParseError) {
        self.println(format!(
            "  {} unusable reply, asking again ({}/{}): {}",
            "!".yellow(),
            attempt,
            max_retries,
            error
        ));
    }
}

/// Simple line-based progress (no spinner), for non-terminal stderr
pub struct SimpleProgress;

impl AgentProgressNotifier for SimpleProgress {
    fn on_cycle_start(&self, cycle: usize, max_cycles: usize) {
        eprintln!("{} Cycle {}/{}", "->".cyan(), cycle, max_cycles);
    }

    fn on_model_failure(&self, failure: &FailureRecord) {
        eprintln!("  {} {}", "x".red(), failure);
    }

    fn on_decision(&self, model: &ModelId, decision: &Decision) {
        eprintln!("  {} decided: {}", model, decision.action.summary());
    }

    fn on_action_result(&self, _action: &Action, result: &ActionResult) {
        match result {
            ActionResult::Succeeded { observation } => {
                eprintln!("  {} {}", "v".green(), observation.url)
            }
            ActionResult::Failed { kind, message } => {
                eprintln!("  {} {}: {}", "x".red(), kind, message)
            }
        }
    }

    fn on_parse_retry(&self, attempt: usize, max_retries: usize, error: &ActionParseError) {
        eprintln!(
            "  {} retry {}/{}: {}",
            "!".yellow(),
            attempt,
            max_retries,
            error
        );
    }
}
