//! Domain logic for the banner scrape job service.
//!
//! Everything here is free of HTTP concerns: location lookup, request
//! normalisation, the session store, worker-process supervision and the
//! interpretation of worker output. The `api` crate wires these together.

pub mod error;
pub mod locations;
pub mod output;
pub mod request;
pub mod session;
pub mod store;
pub mod types;
pub mod worker;
