//! Run Session use case
//!
//! Drives one agent session through the decide → act → observe cycle:
//!
//! | Phase     | Next                                               |
//! |-----------|----------------------------------------------------|
//! | Init      | Deciding, once the start page has been observed    |
//! | Deciding  | Acting; Finished on `finish`; Deciding on bad reply |
//! | Acting    | Observing on success, Deciding on failure          |
//! | Observing | Deciding                                           |
//!
//! Any live phase may end in Aborted. The caller always receives a
//! [`SessionReport`]; internal faults are converted to an [`AbortCause`].

use crate::config::SessionConfig;
use crate::ports::agent_progress::{AgentProgressNotifier, NoAgentProgress};
use crate::ports::browser::{BrowserController, BrowserError, BrowserLease};
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::llm_gateway::LlmGateway;
use crate::use_cases::fallback::{FallbackError, FallbackOrchestrator};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use webpilot_domain::{
    AbortCause, Action, ActionResult, AgentPhase, AgentPromptTemplate, Decision, FailureRecord,
    Goal, MAX_WAIT_MS, Message, ModelCandidate, Observation, SessionOutcome, SessionReport, Transcript, Turn,
    parse_decision,
};

/// Input for one session
#[derive(Debug, Clone)]
pub struct RunSessionInput {
    pub goal: Goal,
    /// Ordered fallback list, consulted afresh for every decision
    pub candidates: Vec<ModelCandidate>,
    /// Generated with [`new_session_id`] when absent
    pub session_id: Option<String>,
}

impl RunSessionInput {
    pub fn new(goal: Goal, candidates: Vec<ModelCandidate>) -> Self {
        Self {
            goal,
            candidates,
            session_id: None,
        }
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }
}

/// `session-<unix-millis>`
pub fn new_session_id() -> String {
    format!("session-{}", chrono::Utc::now().timestamp_millis())
}

/// Why a suspension point gave up before its future completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancelled,
    Deadline,
}

impl From<Interrupt> for AbortCause {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::Cancelled => AbortCause::Cancelled,
            Interrupt::Deadline => AbortCause::DeadlineExceeded,
        }
    }
}

/// Race `future` against cancellation and the session deadline
async fn guarded<F: Future>(
    future: F,
    cancellation: &CancellationToken,
    deadline: Option<tokio::time::Instant>,
) -> Result<F::Output, Interrupt> {
    let expiry = async move {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(Interrupt::Cancelled),
        _ = expiry => Err(Interrupt::Deadline),
        output = future => Ok(output),
    }
}

fn abort_cause_for(error: FallbackError) -> AbortCause {
    match error {
        FallbackError::Auth { model, message, .. } => AbortCause::Auth { model, message },
        FallbackError::AllProvidersFailed(failures) => AbortCause::AllProvidersFailed { failures },
        FallbackError::Cancelled => AbortCause::Cancelled,
        FallbackError::NoCandidates | FallbackError::InvalidRequest(_) => {
            warn!("Decision request could not be sent: {}", error);
            AbortCause::AllProvidersFailed {
                failures: Vec::new(),
            }
        }
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Mutable state of one session, owned by the running future
struct SessionRun<'a> {
    phase: AgentPhase,
    transcript: Transcript,
    progress: &'a dyn AgentProgressNotifier,
}

impl SessionRun<'_> {
    fn enter(&mut self, next: AgentPhase) {
        match self.phase.transition(next) {
            Ok(phase) => {
                self.phase = phase;
                self.progress.on_phase_change(&phase);
            }
            Err(e) => warn!("Ignoring phase change: {}", e),
        }
    }
}

/// Use case for running one browser agent session
pub struct RunSessionUseCase<G, B>
where
    G: LlmGateway + ?Sized + 'static,
    B: BrowserController + ?Sized + 'static,
{
    orchestrator: FallbackOrchestrator<G>,
    browser: Arc<B>,
    config: SessionConfig,
    logger: Arc<dyn ConversationLogger>,
    cancellation_token: Option<CancellationToken>,
}

impl<G, B> RunSessionUseCase<G, B>
where
    G: LlmGateway + ?Sized + 'static,
    B: BrowserController + ?Sized + 'static,
{
    pub fn new(gateway: Arc<G>, browser: Arc<B>, config: SessionConfig) -> Self {
        Self {
            orchestrator: FallbackOrchestrator::new(gateway).with_call_timeout(config.call_timeout),
            browser,
            config,
            logger: Arc::new(NoConversationLogger),
            cancellation_token: None,
        }
    }

    /// Record session events to a structured log
    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the session without progress reporting
    pub async fn execute(&self, input: RunSessionInput) -> SessionReport {
        self.execute_with_progress(input, &NoAgentProgress).await
    }

    /// Run the session with progress callbacks
    ///
    /// The browser is released exactly once, including when this future is
    /// dropped before completion.
    pub async fn execute_with_progress(
        &self,
        input: RunSessionInput,
        progress: &dyn AgentProgressNotifier,
    ) -> SessionReport {
        let started = Instant::now();
        let session_id = input.session_id.clone().unwrap_or_else(new_session_id);
        let cancellation = self.cancellation_token.clone().unwrap_or_default();
        // A limit too far out to represent is no deadline at all
        let deadline = self
            .config
            .session_timeout
            .and_then(|limit| tokio::time::Instant::now().checked_add(limit));

        info!(session = %session_id, "Starting session: {}", input.goal.description());
        self.logger.log(ConversationEvent::new(
            "session_started",
            json!({
                "session_id": session_id,
                "goal": input.goal.description(),
                "constraints": input.goal.constraints(),
                "candidates": input
                    .candidates
                    .iter()
                    .map(|c| c.id.as_str())
                    .collect::<Vec<_>>(),
                "max_cycles": self.config.max_cycles,
            }),
        ));

        let lease = BrowserLease::new(self.browser.clone());
        let mut run = SessionRun {
            phase: AgentPhase::Init,
            transcript: Transcript::new(),
            progress,
        };

        let outcome = self
            .drive(&input, &lease, &mut run, &cancellation, deadline)
            .await;
        lease.release();

        let elapsed_ms = millis(started.elapsed());
        match &outcome {
            SessionOutcome::Finished { result } => {
                info!(session = %session_id, cycles = run.transcript.len(), "Session finished");
                self.logger.log(ConversationEvent::new(
                    "session_finished",
                    json!({
                        "session_id": session_id,
                        "cycles": run.transcript.len(),
                        "result": result,
                        "elapsed_ms": elapsed_ms,
                    }),
                ));
            }
            SessionOutcome::Aborted { cause } => {
                warn!(session = %session_id, cycles = run.transcript.len(), "Session aborted: {}", cause);
                self.logger.log(ConversationEvent::new(
                    "session_aborted",
                    json!({
                        "session_id": session_id,
                        "cycles": run.transcript.len(),
                        "cause": cause,
                        "elapsed_ms": elapsed_ms,
                    }),
                ));
            }
        }

        SessionReport {
            session_id,
            goal: input.goal,
            outcome,
            transcript: run.transcript,
            elapsed_ms,
        }
    }

    async fn drive(
        &self,
        input: &RunSessionInput,
        lease: &BrowserLease<B>,
        run: &mut SessionRun<'_>,
        cancellation: &CancellationToken,
        deadline: Option<tokio::time::Instant>,
    ) -> SessionOutcome {
        // ==================== Init ====================
        let mut current = match guarded(lease.browser().start(), cancellation, deadline).await {
            Ok(Ok(observation)) => observation,
            Ok(Err(e)) => {
                return self.abort(
                    run,
                    AbortCause::SessionStart {
                        message: e.to_string(),
                    },
                );
            }
            Err(interrupt) => return self.abort(run, interrupt.into()),
        };
        debug!(url = %current.url, "Browser session started");
        run.enter(AgentPhase::Deciding);

        loop {
            if run.transcript.len() >= self.config.max_cycles {
                return self.abort(
                    run,
                    AbortCause::CycleLimitExceeded {
                        cycles: run.transcript.len(),
                    },
                );
            }
            let cycle = run.transcript.len() + 1;
            run.progress.on_cycle_start(cycle, self.config.max_cycles);

            // ==================== Deciding ====================
            let decision = match self
                .decide(input, run, &current, cycle, cancellation, deadline)
                .await
            {
                Ok(decision) => decision,
                Err(cause) => return self.abort(run, cause),
            };

            if let Action::Finish { result } = &decision.action {
                run.enter(AgentPhase::Finished);
                return SessionOutcome::Finished {
                    result: result.clone(),
                };
            }

            // ==================== Acting ====================
            run.enter(AgentPhase::Acting);
            let result = match guarded(
                self.perform(lease.browser(), &decision.action),
                cancellation,
                deadline,
            )
            .await
            {
                Ok(result) => result,
                Err(interrupt) => return self.abort(run, interrupt.into()),
            };
            run.progress.on_action_result(&decision.action, &result);

            let next = match &result {
                ActionResult::Succeeded { observation } => Ok(observation.clone()),
                ActionResult::Failed { message, .. } => Err(message.clone()),
            };
            let turn = run.transcript.record(current.clone(), decision, result);
            self.log_turn(turn);

            match next {
                Ok(observation) => {
                    // ==================== Observing ====================
                    run.enter(AgentPhase::Observing);
                    current = observation;
                }
                Err(message) => {
                    // Every attempted action is a turn, so the failed tail is
                    // the run of consecutive failures
                    let consecutive_failures = run.transcript.trailing_failures();
                    if consecutive_failures >= self.config.max_action_failures {
                        return self.abort(
                            run,
                            AbortCause::ActionFailureLimitExceeded {
                                failures: consecutive_failures,
                                last_error: message,
                            },
                        );
                    }
                }
            }
            run.enter(AgentPhase::Deciding);
        }
    }

    /// Ask the fallback orchestrator until a reply decodes into an action
    async fn decide(
        &self,
        input: &RunSessionInput,
        run: &mut SessionRun<'_>,
        observation: &Observation,
        cycle: usize,
        cancellation: &CancellationToken,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<Decision, AbortCause> {
        let mut messages = AgentPromptTemplate::decision_messages(
            &input.goal,
            self.max_wait_ms(),
            run.transcript.recent(self.config.history_window),
            observation,
            self.config.max_observation_chars,
        );
        let max_attempts = self.config.max_parse_retries + 1;
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            self.logger.log(ConversationEvent::new(
                "llm_request",
                json!({
                    "cycle": cycle,
                    "attempt": attempt,
                    "messages": messages,
                }),
            ));

            let round = guarded(
                self.orchestrator
                    .decide(&messages, &input.candidates, cancellation),
                cancellation,
                deadline,
            )
            .await?;

            let success = match round {
                Ok(success) => success,
                Err(e) => {
                    self.report_failures(run.progress, e.failures(), cycle);
                    return Err(abort_cause_for(e));
                }
            };
            self.report_failures(run.progress, &success.failures, cycle);

            let response = success.response;
            self.logger.log(ConversationEvent::new(
                "llm_response",
                json!({
                    "cycle": cycle,
                    "attempt": attempt,
                    "model": response.model,
                    "content": response.content,
                    "usage": response.usage,
                }),
            ));

            match parse_decision(&response.content) {
                Ok(decision) => {
                    debug!(model = %response.model, action = decision.action.name(), "Decision parsed");
                    run.progress.on_decision(&response.model, &decision);
                    return Ok(decision);
                }
                Err(e) => {
                    warn!(model = %response.model, attempt, "Reply could not be decoded: {}", e);
                    self.logger.log(ConversationEvent::new(
                        "action_parse_failed",
                        json!({
                            "cycle": cycle,
                            "attempt": attempt,
                            "model": response.model,
                            "error": e.to_string(),
                        }),
                    ));

                    if attempt >= max_attempts {
                        return Err(AbortCause::DecisionParseExhausted {
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }

                    run.progress
                        .on_parse_retry(attempt, self.config.max_parse_retries, &e);
                    let reply = if response.content.trim().is_empty() {
                        "(empty reply)".to_string()
                    } else {
                        response.content
                    };
                    messages.push(Message::assistant(reply));
                    messages.push(Message::system(AgentPromptTemplate::parse_correction(&e)));
                    run.enter(AgentPhase::Deciding);
                }
            }
        }
    }

    /// Longest `wait` the browser will honor within one action
    fn max_wait_ms(&self) -> u64 {
        millis(self.config.action_timeout).min(MAX_WAIT_MS)
    }

    /// Perform one action bounded by the action timeout
    ///
    /// The bound carries a tenth of slack so the controller's own waits
    /// report their specific failure first.
    async fn perform(&self, browser: &B, action: &Action) -> ActionResult {
        let timeout = self.config.action_timeout;
        let limit = timeout.saturating_add(timeout / 10);
        let outcome = match tokio::time::timeout(limit, browser.perform(action)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(BrowserError::ActionTimeout(millis(limit))),
        };

        match outcome {
            Ok(observation) => {
                debug!(action = action.name(), url = %observation.url, "Action performed");
                ActionResult::Succeeded { observation }
            }
            Err(e) => {
                warn!(action = action.name(), "Action failed: {}", e);
                ActionResult::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        }
    }

    fn abort(&self, run: &mut SessionRun<'_>, cause: AbortCause) -> SessionOutcome {
        run.enter(AgentPhase::Aborted);
        SessionOutcome::Aborted { cause }
    }

    fn report_failures(
        &self,
        progress: &dyn AgentProgressNotifier,
        failures: &[FailureRecord],
        cycle: usize,
    ) {
        for failure in failures {
            progress.on_model_failure(failure);
            self.logger.log(ConversationEvent::new(
                "provider_failure",
                json!({
                    "cycle": cycle,
                    "model": failure.model,
                    "kind": failure.kind,
                    "message": failure.message,
                }),
            ));
        }
    }

    fn log_turn(&self, turn: &Turn) {
        match &turn.result {
            ActionResult::Succeeded { observation } => self.logger.log(ConversationEvent::new(
                "action_performed",
                json!({
                    "cycle": turn.cycle,
                    "action": turn.decision.action,
                    "thought": turn.decision.thought,
                    "url": observation.url,
                    "title": observation.title,
                    "content_chars": observation.content.chars().count(),
                    "screenshot": observation.screenshot,
                }),
            )),
            ActionResult::Failed { kind, message } => self.logger.log(ConversationEvent::new(
                "action_failed",
                json!({
                    "cycle": turn.cycle,
                    "action": turn.decision.action,
                    "thought": turn.decision.thought,
                    "kind": kind,
                    "message": message,
                }),
            )),
        }
    }
}
