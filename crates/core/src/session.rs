//! Session record and lifecycle types.

use serde::Serialize;
use serde_json::Value;

use crate::request::ScrapeRequest;
use crate::types::{SessionId, Timestamp};

/// Lifecycle state of a session.
///
/// `Running` is the only non-terminal state. Serialized as `running`,
/// `completed` and `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    #[serde(rename = "error")]
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "error",
        }
    }
}

/// One progress line reported by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEntry {
    /// When the line was extracted, not when the worker printed it.
    pub timestamp: Timestamp,
    pub message: String,
}

/// Terminal outcome applied by [`SessionStore::finalize`](crate::store::SessionStore::finalize).
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(Value),
    Failed(String),
}

impl Outcome {
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Completed(_) => SessionStatus::Completed,
            Self::Failed(_) => SessionStatus::Failed,
        }
    }
}

/// A tracked scrape job.
///
/// Only [`SessionStore`](crate::store::SessionStore) mutates sessions; every
/// value handed out is an owned snapshot.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub request: ScrapeRequest,
    pub status: SessionStatus,
    pub progress: Vec<ProgressEntry>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl Session {
    pub(crate) fn new(id: SessionId, request: ScrapeRequest, started_at: Timestamp) -> Self {
        Self {
            id,
            request,
            status: SessionStatus::Running,
            progress: Vec::new(),
            result: None,
            error: None,
            started_at,
            finished_at: None,
        }
    }

    /// Wall-clock run time in milliseconds, available once completed.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.status, self.finished_at) {
            (SessionStatus::Completed, Some(finished)) => {
                Some((finished - self.started_at).num_milliseconds())
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
