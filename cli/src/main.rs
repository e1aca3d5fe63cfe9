//! CLI entrypoint for webpilot
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use webpilot_application::{
    AgentProgressNotifier, ConversationLogger, LlmGateway, NoAgentProgress, RunSessionInput,
    RunSessionUseCase, new_session_id,
};
use webpilot_domain::Goal;
use webpilot_infrastructure::{
    ChromeController, ConfigLoader, FileConfig, JsonlConversationLogger, OpenRouterGateway,
};
use webpilot_presentation::{Cli, ConsoleFormatter, ProgressReporter, SimpleProgress};

/// Exit status of a session that ended without finishing its goal
const EXIT_ABORTED: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())?
    };
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    // === Dependency Injection ===
    let gateway = Arc::new(OpenRouterGateway::new(config.openrouter_config()));

    if cli.list_models {
        let models = gateway
            .available_models()
            .await
            .context("Could not list models")?;
        for model in models {
            println!("{}", model);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let goal = match cli.goal.as_deref() {
        Some(goal) => goal,
        None => bail!("A goal is required. Use --list-models or --show-config to inspect setup."),
    };
    let goal = cli
        .constraints
        .iter()
        .fold(Goal::new(goal)?, |goal, c| goal.with_constraint(c.as_str()));
    let candidates = config.candidates()?;

    let session_id = new_session_id();
    info!("Starting session {}", session_id);

    let mut chrome_options = config.chrome_options();
    if let Some(dir) = chrome_options.screenshot_dir.take() {
        chrome_options.screenshot_dir = Some(dir.join(&session_id));
    }
    let browser = Arc::new(ChromeController::new(chrome_options));

    let cancellation = CancellationToken::new();
    spawn_interrupt_handler(cancellation.clone());

    let mut use_case = RunSessionUseCase::new(gateway, browser, config.session_config())
        .with_cancellation(cancellation);

    if let Some(path) = config.logging.transcript_path(&session_id) {
        match JsonlConversationLogger::create(&path, &session_id) {
            Ok(logger) => {
                info!("Writing transcript to {}", path.display());
                let logger: Arc<dyn ConversationLogger> = Arc::new(logger);
                use_case = use_case.with_logger(logger);
            }
            Err(e) => warn!("Could not create transcript {}: {}", path.display(), e),
        }
    }

    let progress: Box<dyn AgentProgressNotifier> = if cli.quiet {
        Box::new(NoAgentProgress)
    } else if std::io::stderr().is_terminal() {
        Box::new(ProgressReporter::new())
    } else {
        Box::new(SimpleProgress)
    };

    let input = RunSessionInput::new(goal, candidates).with_session_id(session_id);
    let report = use_case
        .execute_with_progress(input, progress.as_ref())
        .await;

    let format = config.output.format.unwrap_or_default();
    println!("{}", ConsoleFormatter::render(&report, format));

    if report.outcome.is_finished() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_ABORTED))
    }
}

/// Install the tracing subscriber.
///
/// `-v` count picks the default level; `RUST_LOG` overrides it. With
/// `--log-file`, logs go through a non-blocking file writer whose guard must
/// outlive `main`.
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .context("--log-file must name a file")?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

/// Cancel the session on the first Ctrl-C; the browser is still released.
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping the session");
            token.cancel();
        }
    });
}

/// Command-line flags are the highest-priority configuration layer.
fn apply_cli_overrides(config: &mut FileConfig, cli: &Cli) {
    if !cli.model.is_empty() {
        config.models.candidates = cli.model.clone();
    }
    if let Some(url) = &cli.start_url {
        config.browser.start_url = url.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        config.browser.endpoint = Some(endpoint.clone());
    }
    if cli.headed {
        config.browser.headless = false;
    }
    if let Some(dir) = &cli.screenshot_dir {
        config.browser.screenshot_dir = Some(dir.clone());
    }
    if let Some(max) = cli.max_cycles {
        config.agent.max_cycles = max;
    }
    if let Some(secs) = cli.session_timeout {
        config.agent.session_timeout_secs = Some(secs);
    }
    if let Some(dir) = &cli.transcript_dir {
        config.logging.transcript_dir = Some(dir.clone());
    }
    if let Some(format) = cli.output {
        config.output.format = Some(format);
    }
}
