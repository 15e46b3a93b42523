//! Interpretation of worker stdout.
//!
//! The worker prints free-form text. Two things are pulled out of it:
//!
//! - progress lines, recognised by a leading `[*]`, `[+]` or `[-]` marker,
//!   extracted incrementally as output arrives;
//! - the structured result, a single JSON object carrying a top-level
//!   `homepage` field, expected at the end of the output but possibly
//!   preceded by unrelated text (including stray `{` lines).
//!
//! Everything here is pure and independent of the process plumbing.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Top-level field that identifies a genuine scrape result.
pub const RESULT_MARKER_FIELD: &str = "homepage";

/// Secondary result field counted for log summaries.
pub const PROMOTIONS_FIELD: &str = "promotions";

/// Info (`[*]`), success (`[+]`) and failure (`[-]`) markers.
const PROGRESS_MARKER_PATTERN: &str = r"^\s*\[[*+-]\]";

static PROGRESS_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PROGRESS_MARKER_PATTERN).expect("valid regex"));

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Whether `line` starts (after leading whitespace) with a progress marker.
pub fn is_progress_line(line: &str) -> bool {
    PROGRESS_MARKER_RE.is_match(line)
}

/// Progress messages contained in `new_text`, in order.
///
/// Blank lines and lines without a marker are dropped. Messages are trimmed.
/// Pass only newly arrived text, otherwise lines are reported twice.
pub fn extract_progress_lines(new_text: &str) -> Vec<String> {
    new_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && is_progress_line(line))
        .map(str::to_string)
        .collect()
}

/// Reassembles lines split across output chunks.
///
/// [`push`](Self::push) returns only text that ends in a newline, holding
/// any trailing partial line back until the rest of it arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the newly completed lines, if any.
    pub fn push(&mut self, chunk: &str) -> Option<String> {
        self.pending.push_str(chunk);
        let end = self.pending.rfind('\n')? + 1;
        let rest = self.pending.split_off(end);
        Some(std::mem::replace(&mut self.pending, rest))
    }

    /// Remaining partial line once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Find the trailing structured result in the full worker output.
///
/// Lines are visited from last to first. For each line whose trimmed text
/// starts with `{`, the output from that line to the end is parsed as one
/// JSON value; it is accepted only if it is an object with a top-level
/// [`RESULT_MARKER_FIELD`]. Returns the first accepted value, or `None`.
pub fn extract_result(stdout: &str) -> Option<Value> {
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(stdout.match_indices('\n').map(|(i, _)| i + 1))
        .collect();

    line_starts.iter().rev().find_map(|&start| {
        let tail = &stdout[start..];
        let line = tail.split('\n').next().unwrap_or_default();
        if !line.trim_start().starts_with('{') {
            return None;
        }
        serde_json::from_str::<Value>(tail)
            .ok()
            .filter(is_scrape_result)
    })
}

/// Whether `value` is an object carrying [`RESULT_MARKER_FIELD`].
pub fn is_scrape_result(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.contains_key(RESULT_MARKER_FIELD))
}

/// Entry counts of an extracted result, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultSummary {
    pub homepage: usize,
    pub promotions: usize,
}

impl ResultSummary {
    pub fn of(result: &Value) -> Self {
        let count = |field: &str| result.get(field).and_then(Value::as_array).map_or(0, Vec::len);
        Self {
            homepage: count(RESULT_MARKER_FIELD),
            promotions: count(PROMOTIONS_FIELD),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
