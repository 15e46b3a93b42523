//! Worker launch description, events and errors.

use std::path::PathBuf;
use std::time::Duration;

use crate::request::ScrapeRequest;

/// Program, arguments and limits for one worker launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child (inherits the server's if `None`).
    pub working_directory: Option<PathBuf>,
    /// Kill the worker if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_directory: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fixed argument contract of the scraper.
///
/// ```text
/// --url <url> --location <region> --headless <true|false> --json
/// ```
///
/// `<region>` is the resolved region identifier (`UK`), not the numeric
/// location code the client submitted (`2`). Workers that expect the code
/// must map it back through [`locations::all`](crate::locations::all).
pub fn scrape_args(request: &ScrapeRequest) -> Vec<String> {
    vec![
        "--url".into(),
        request.url.clone(),
        "--location".into(),
        request.location.code.into(),
        "--headless".into(),
        request.headless.to_string(),
        "--json".into(),
    ]
}

/// Output and lifecycle notifications from a running worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A chunk of stdout. Not necessarily a whole line.
    Stdout(String),
    /// A chunk of stderr. Not necessarily a whole line.
    Stderr(String),
    /// The process is gone. Always the final event.
    Exited(WorkerExit),
}

/// Why a worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The process exited on its own. `code` is `None` when it was killed
    /// by a signal.
    Exited { code: Option<i32> },
    /// Killed after exceeding [`WorkerCommand::timeout`].
    TimedOut { after: Duration },
    /// Killed because supervision was cancelled.
    Cancelled,
}

impl WorkerExit {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Exited { code: Some(0) })
    }
}

/// The worker could not be started at all.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker executable not found: {0}")]
    NotFound(String),

    #[error("Permission denied launching worker: {0}")]
    PermissionDenied(String),

    #[error("I/O error launching worker {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl WorkerError {
    pub(crate) fn from_spawn(program: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(program.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(program.to_string()),
            _ => Self::Io {
                program: program.to_string(),
                source: err,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
