//! Child process spawning and output streaming.
//!
//! One task per output stream forwards raw chunks; a supervisor task waits
//! for the child (or its timeout, or cancellation), lets the readers drain,
//! and only then emits [`WorkerEvent::Exited`].

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::command::{WorkerCommand, WorkerError, WorkerEvent, WorkerExit};

/// Bytes requested per read from a worker pipe.
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// How long to wait for pipes to close after killing a worker.
///
/// Grandchildren can keep a pipe open after the worker itself is gone.
const KILL_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Handle to a running worker's event stream.
#[derive(Debug)]
pub struct WorkerProcess {
    pid: Option<u32>,
    events: mpsc::UnboundedReceiver<WorkerEvent>,
}

impl WorkerProcess {
    /// OS process id, if the child was still running when spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Next output chunk or the final exit notification.
    ///
    /// Returns `None` once everything, including `Exited`, has been received.
    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        self.events.recv().await
    }
}

enum Stop {
    Exited(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

/// Launch `command` and start streaming its output.
///
/// Launch failures (missing executable, permission denied) are returned
/// here rather than as events. Triggering `cancel` kills the worker.
pub fn spawn(
    command: &WorkerCommand,
    cancel: CancellationToken,
) -> Result<WorkerProcess, WorkerError> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = &command.working_directory {
        cmd.current_dir(dir);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| WorkerError::from_spawn(&command.program, e))?;
    let pid = child.id();

    let (tx, rx) = mpsc::unbounded_channel();

    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(forward(stdout, tx.clone(), WorkerEvent::Stdout)));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(forward(stderr, tx.clone(), WorkerEvent::Stderr)));
    }

    tokio::spawn(supervise(child, readers, tx, command.timeout, cancel));

    Ok(WorkerProcess { pid, events: rx })
}

async fn supervise(
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<WorkerEvent>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
) {
    let deadline = async {
        match timeout {
            Some(limit) => {
                tokio::time::sleep(limit).await;
                limit
            }
            None => std::future::pending().await,
        }
    };

    let stop = tokio::select! {
        status = child.wait() => Stop::Exited(status),
        limit = deadline => Stop::TimedOut(limit),
        () = cancel.cancelled() => Stop::Cancelled,
    };

    let exit = match stop {
        Stop::Exited(status) => WorkerExit::Exited {
            code: status.ok().and_then(|s| s.code()),
        },
        Stop::TimedOut(after) => {
            let _ = child.kill().await;
            WorkerExit::TimedOut { after }
        }
        Stop::Cancelled => {
            let _ = child.kill().await;
            WorkerExit::Cancelled
        }
    };

    for mut reader in readers {
        let drained = match exit {
            WorkerExit::Exited { .. } => tokio::select! {
                _ = &mut reader => true,
                () = cancel.cancelled() => false,
            },
            _ => tokio::time::timeout(KILL_DRAIN_GRACE, &mut reader)
                .await
                .is_ok(),
        };
        if !drained {
            reader.abort();
        }
    }

    let _ = tx.send(WorkerEvent::Exited(exit));
}

/// Forward a pipe as decoded text chunks until EOF.
async fn forward<R: AsyncRead + Unpin>(
    mut stream: R,
    tx: mpsc::UnboundedSender<WorkerEvent>,
    wrap: fn(String) -> WorkerEvent,
) {
    let mut buf = vec![0u8; READ_CHUNK_BYTES];
    let mut pending = Vec::new();

    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                let text = take_decodable(&mut pending);
                if !text.is_empty() && tx.send(wrap(text)).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }

    if !pending.is_empty() {
        let _ = tx.send(wrap(String::from_utf8_lossy(&pending).into_owned()));
    }
}

/// Decode as much of `pending` as possible.
///
/// Invalid bytes are replaced with U+FFFD. Only an incomplete UTF-8 sequence
/// at the very end stays in `pending`, to be completed by the next read.
fn take_decodable(pending: &mut Vec<u8>) -> String {
    let mut text = String::with_capacity(pending.len());
    let mut rest: &[u8] = pending.as_slice();

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                text.push_str(valid);
                rest = &[];
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                text.push_str(&String::from_utf8_lossy(valid));
                match e.error_len() {
                    Some(len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        rest = &after[len..];
                    }
                    None => {
                        rest = after;
                        break;
                    }
                }
            }
        }
    }

    let consumed = pending.len() - rest.len();
    pending.drain(..consumed);
    text
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
