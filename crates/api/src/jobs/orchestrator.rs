//! Central scrape orchestrator service.
//!
//! Coordinates validation, session creation, worker launch, and the
//! translation of worker output into session updates.

use std::sync::Arc;
use std::time::Duration;

use banner_core::error::CoreError;
use banner_core::output::{self, LineBuffer, ResultSummary};
use banner_core::request::{ScrapeRequest, SubmitScrape};
use banner_core::session::Outcome;
use banner_core::store::SessionStore;
use banner_core::types::SessionId;
use banner_core::worker::command::scrape_args;
use banner_core::worker::{self, WorkerCommand, WorkerEvent, WorkerExit, WorkerProcess};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::WorkerConfig;

/// Failure detail when the worker exits cleanly without a usable result.
pub const MSG_NO_RESULT: &str = "no valid structured result in output";

/// Failure detail for jobs cancelled by server shutdown.
pub const MSG_CANCELLED: &str = "job cancelled: server shutting down";

/// Failure detail when the worker event stream ends without an exit.
const MSG_SUPERVISION_LOST: &str = "worker supervision ended unexpectedly";

/// How long cancelled jobs get to record their outcome during shutdown.
const CANCEL_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Characters of stdout logged when no result could be extracted.
const OUTPUT_PREVIEW_CHARS: usize = 500;

/// Orchestrates scrape jobs from submission to terminal state.
///
/// Manages the full lifecycle:
/// 1. Validate and normalise the submission.
/// 2. Create a `Running` session.
/// 3. Launch the worker process.
/// 4. Record progress lines as they stream in.
/// 5. Finalize the session from the exit status and output.
///
/// Each job runs as a task on an internal [`TaskTracker`] so that
/// [`shutdown`](Self::shutdown) can wait for, or cancel, in-flight work.
pub struct JobOrchestrator {
    store: Arc<SessionStore>,
    worker: WorkerConfig,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl JobOrchestrator {
    /// Create an orchestrator that records into `store` and launches
    /// workers as described by `worker`.
    pub fn new(store: Arc<SessionStore>, worker: WorkerConfig) -> Self {
        Self {
            store,
            worker,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// The session store jobs report into.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Submit a scrape job and return its session id without waiting for it.
    ///
    /// Only validation errors are returned. A worker that cannot be launched
    /// still yields an id; its session is immediately `Failed`.
    pub fn submit(&self, raw: &SubmitScrape) -> Result<SessionId, CoreError> {
        let request = raw.normalize()?;
        let command = self.command_for(&request);
        let url = request.url.clone();
        let region = request.location.code;

        let id = self.store.create(request);

        match worker::spawn(&command, self.cancel.child_token()) {
            Ok(process) => {
                tracing::info!(
                    session_id = %id,
                    url = %url,
                    region,
                    pid = ?process.pid(),
                    "Scrape started"
                );
                self.tracker
                    .spawn(supervise(Arc::clone(&self.store), id, process));
            }
            Err(e) => {
                tracing::error!(
                    session_id = %id,
                    program = %command.program,
                    error = %e,
                    "Failed to launch worker"
                );
                finalize(
                    &self.store,
                    id,
                    Outcome::Failed(format!("failed to launch worker: {e}")),
                );
            }
        }

        Ok(id)
    }

    /// Stop accepting tracked work and wind down running jobs.
    ///
    /// Waits up to `grace` for jobs to finish on their own, then cancels the
    /// rest (killing their workers) and waits for them to record a final
    /// state.
    pub async fn shutdown(&self, grace: Duration) {
        self.tracker.close();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            tracing::info!("All scrape jobs finished");
            return;
        }

        tracing::warn!(
            remaining = self.tracker.len(),
            "Cancelling in-flight scrape jobs"
        );
        self.cancel.cancel();
        if tokio::time::timeout(CANCEL_DRAIN_TIMEOUT, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::error!(
                remaining = self.tracker.len(),
                "Scrape jobs did not stop after cancellation"
            );
        }
    }

    fn command_for(&self, request: &ScrapeRequest) -> WorkerCommand {
        let mut command = WorkerCommand::new(&self.worker.program);
        if let Some(script) = &self.worker.script {
            command = command.arg(script.to_string_lossy());
        }
        command
            .args(scrape_args(request))
            .working_directory(&self.worker.working_dir)
            .timeout(self.worker.timeout)
    }
}

/// Drive one job: feed worker output into the store until the worker exits.
async fn supervise(store: Arc<SessionStore>, id: SessionId, mut process: WorkerProcess) {
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut lines = LineBuffer::new();

    while let Some(event) = process.next_event().await {
        match event {
            WorkerEvent::Stdout(chunk) => {
                stdout.push_str(&chunk);
                if let Some(completed) = lines.push(&chunk) {
                    record_progress(&store, id, &completed);
                }
            }
            WorkerEvent::Stderr(chunk) => {
                tracing::warn!(session_id = %id, stderr = %chunk.trim_end(), "Worker stderr");
                stderr.push_str(&chunk);
            }
            WorkerEvent::Exited(exit) => {
                if let Some(rest) = lines.finish() {
                    record_progress(&store, id, &rest);
                }
                let outcome = outcome_for_exit(exit, &stdout, &stderr);
                log_outcome(id, exit, &outcome, &stdout);
                finalize(&store, id, outcome);
                return;
            }
        }
    }

    tracing::error!(session_id = %id, "Worker event stream closed without exit");
    finalize(&store, id, Outcome::Failed(MSG_SUPERVISION_LOST.into()));
}

fn record_progress(store: &SessionStore, id: SessionId, text: &str) {
    for message in output::extract_progress_lines(text) {
        tracing::debug!(session_id = %id, progress = %message, "Worker progress");
        if let Err(e) = store.append_progress(&id, message) {
            tracing::error!(session_id = %id, error = %e, "Failed to record progress");
        }
    }
}

fn finalize(store: &SessionStore, id: SessionId, outcome: Outcome) {
    if let Err(e) = store.finalize(&id, outcome) {
        tracing::error!(session_id = %id, error = %e, "Failed to finalize session");
    }
}

/// Classify how a worker ended into the session's terminal outcome.
///
/// - exit 0 with an extractable result: `Completed`
/// - exit 0 without one: `Failed` with [`MSG_NO_RESULT`]
/// - nonzero exit or signal: `Failed` with stderr, or a generic message
/// - timeout or cancellation: `Failed` describing why the worker was killed
pub fn outcome_for_exit(exit: WorkerExit, stdout: &str, stderr: &str) -> Outcome {
    match exit {
        WorkerExit::Exited { code: Some(0) } => match output::extract_result(stdout) {
            Some(result) => Outcome::Completed(result),
            None => Outcome::Failed(MSG_NO_RESULT.into()),
        },
        WorkerExit::Exited { code } => {
            let stderr = stderr.trim();
            if !stderr.is_empty() {
                Outcome::Failed(stderr.to_string())
            } else if let Some(code) = code {
                Outcome::Failed(format!("worker exited with code {code}"))
            } else {
                Outcome::Failed("worker terminated by signal".into())
            }
        }
        WorkerExit::TimedOut { after } => {
            Outcome::Failed(format!("worker timed out after {}s", after.as_secs()))
        }
        WorkerExit::Cancelled => Outcome::Failed(MSG_CANCELLED.into()),
    }
}

fn log_outcome(id: SessionId, exit: WorkerExit, outcome: &Outcome, stdout: &str) {
    match outcome {
        Outcome::Completed(result) => {
            let summary = ResultSummary::of(result);
            tracing::info!(
                session_id = %id,
                homepage = summary.homepage,
                promotions = summary.promotions,
                "Scrape completed"
            );
        }
        Outcome::Failed(detail) if exit.is_success() => {
            let preview: String = stdout.chars().take(OUTPUT_PREVIEW_CHARS).collect();
            tracing::error!(
                session_id = %id,
                error = %detail,
                output = %preview,
                "Scrape produced no result"
            );
        }
        Outcome::Failed(detail) => {
            tracing::error!(
                session_id = %id,
                exit = ?exit,
                error = %detail,
                "Scrape failed"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
