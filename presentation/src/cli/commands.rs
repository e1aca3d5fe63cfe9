//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;
use webpilot_domain::OutputFormat;

/// CLI arguments for webpilot
#[derive(Parser, Debug)]
#[command(name = "webpilot")]
#[command(author, version, about = "Browser agent - an LLM drives Chrome until the goal is met")]
#[command(long_about = r#"
webpilot lets a chat model drive a Chrome browser toward a goal you state in
plain language. Each cycle the model sees the current page, picks one action
(navigate, click, type, extract, wait, finish), and the browser performs it.

When a model fails (rate limit, outage, bad response) the next candidate in the
fallback list is asked instead.

Configuration files are loaded from (in priority order):
1. WEBPILOT_<SECTION>__<KEY>                Environment variables
2. --config <path>                          Explicit config file
3. ./webpilot.toml                          Project-level config
4. ~/.config/webpilot/config.toml           Global config

Example:
  webpilot "Find the top story on news.ycombinator.com and return its title"
  webpilot --start-url https://duckduckgo.com -m qwen/qwen-2-7b-instruct:free "Search for rust async"
  webpilot --endpoint ws://127.0.0.1:9222/devtools/browser/<id> --headed "Log the current page title"
"#)]
pub struct Cli {
    /// What the agent should accomplish (not needed with --list-models or --show-config)
    pub goal: Option<String>,

    /// Extra requirement the agent must respect (can be specified multiple times)
    #[arg(short = 'C', long = "constraint", value_name = "TEXT")]
    pub constraints: Vec<String>,

    /// Candidate models in fallback order (can be specified multiple times)
    #[arg(short, long, value_name = "MODEL")]
    pub model: Vec<String>,

    /// Page to open before the first decision
    #[arg(long, value_name = "URL")]
    pub start_url: Option<String>,

    /// Attach to a running browser through its DevTools WebSocket URL
    #[arg(long, value_name = "WS_URL")]
    pub endpoint: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Save a screenshot after every action into this directory
    #[arg(long, value_name = "DIR")]
    pub screenshot_dir: Option<PathBuf>,

    /// Maximum decide-act-observe cycles
    #[arg(long, value_name = "N")]
    pub max_cycles: Option<usize>,

    /// Abort the session after this many seconds
    #[arg(long, value_name = "SECS")]
    pub session_timeout: Option<u64>,

    /// Output format (text or json)
    #[arg(short, long, value_name = "FORMAT")]
    pub output: Option<OutputFormat>,

    /// Write a JSONL transcript of the session into this directory
    #[arg(long, value_name = "DIR")]
    pub transcript_dir: Option<PathBuf>,

    /// Write diagnostic logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// List the models the provider serves and exit
    #[arg(long)]
    pub list_models: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_full_invocation() {
        let cli = Cli::try_parse_from([
            "webpilot",
            "-m",
            "a/one:free",
            "--model",
            "b/two",
            "--start-url",
            "https://example.com",
            "--headed",
            "-o",
            "json",
            "-vv",
            "-C",
            "do not log in",
            "--max-cycles",
            "8",
            "find the price",
        ])
        .unwrap();

        assert_eq!(cli.goal.as_deref(), Some("find the price"));
        assert_eq!(cli.model, vec!["a/one:free", "b/two"]);
        assert_eq!(cli.start_url.as_deref(), Some("https://example.com"));
        assert!(cli.headed);
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.constraints, vec!["do not log in"]);
        assert_eq!(cli.max_cycles, Some(8));
    }

    #[test]
    fn test_goal_is_optional_for_listing() {
        let cli = Cli::try_parse_from(["webpilot", "--list-models"]).unwrap();
        assert!(cli.list_models);
        assert!(cli.goal.is_none());
    }

    #[test]
    fn test_rejects_unknown_output_format() {
        assert!(Cli::try_parse_from(["webpilot", "-o", "yaml", "goal"]).is_err());
    }
}
