//! Banner scrape API server library.
//!
//! Exposes the building blocks (config, state, job orchestration, error
//! handling, routes) so integration tests and the binary entrypoint can both
//! access them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod router;
pub mod routes;
pub mod state;
