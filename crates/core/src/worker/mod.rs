//! External worker process supervision.
//!
//! [`spawn`] launches the scraper as a child process and streams its output
//! back as [`WorkerEvent`]s. Stream chunks are delivered as they arrive and
//! are not line-aligned; [`WorkerEvent::Exited`] is always the last event.

pub mod command;
pub mod process;

pub use command::{WorkerCommand, WorkerError, WorkerEvent, WorkerExit};
pub use process::{spawn, WorkerProcess};
