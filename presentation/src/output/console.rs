//! Console output formatter for session reports

use colored::Colorize;
use webpilot_domain::core::string::truncate;
use webpilot_domain::{ActionResult, OutputFormat, SessionOutcome, SessionReport, Turn};

/// Formats session reports for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    pub fn render(report: &SessionReport, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => Self::format(report),
            OutputFormat::Json => Self::format_json(report),
        }
    }

    /// Format the complete report
    pub fn format(report: &SessionReport) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("webpilot session"));
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n",
            "Goal:".cyan().bold(),
            report.goal.description()
        ));
        for constraint in report.goal.constraints() {
            output.push_str(&format!("  * {}\n", constraint));
        }
        output.push_str(&format!(
            "{} {}  {} {}  {} {:.1}s\n",
            "Session:".cyan().bold(),
            report.session_id,
            "Cycles:".cyan().bold(),
            report.cycles(),
            "Elapsed:".cyan().bold(),
            report.elapsed_ms as f64 / 1000.0
        ));

        if !report.transcript.is_empty() {
            output.push_str(&Self::section_header("Transcript"));
            for turn in report.transcript.turns() {
                output.push_str(&Self::turn_line(turn));
                output.push('\n');
            }
        }

        output.push_str(&Self::section_header("Outcome"));
        match &report.outcome {
            SessionOutcome::Finished { result } => {
                output.push_str(&format!("{}\n{}\n", "Finished".green().bold(), result));
            }
            SessionOutcome::Aborted { cause } => {
                output.push_str(&format!(
                    "{} ({})\n{}\n",
                    "Aborted".red().bold(),
                    cause.as_str(),
                    cause
                ));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(report: &SessionReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    fn turn_line(turn: &Turn) -> String {
        let action = turn.decision.action.summary();
        match &turn.result {
            ActionResult::Succeeded { observation } => format!(
                "{:>3}. {} {} {}",
                turn.cycle,
                action,
                "->".green(),
                truncate(&observation.url, 80)
            ),
            ActionResult::Failed { kind, message } => format!(
                "{:>3}. {} {} {}: {}",
                turn.cycle,
                action,
                "x".red(),
                kind,
                truncate(message, 120)
            ),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("{}\n", "=".repeat(60).cyan())
    }
}
