//! Scrape job orchestration.
//!
//! The [`JobOrchestrator`] turns a validated submission into a session plus a
//! supervised worker process. It is held in [`AppState`](crate::state::AppState)
//! as an `Arc<JobOrchestrator>`.

pub mod orchestrator;

pub use orchestrator::JobOrchestrator;
