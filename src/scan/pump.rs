//! Output pumps draining scanner stdout and stderr into a session.

use std::fmt;
use std::process::ExitStatus;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

use super::command::ScanProcess;
use super::progress::extract_progress;
use super::sanitize::split_lines;
use super::session::ScanSession;

/// Which process stream a pump drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpRole {
    /// stdout: updates progress and signals completion.
    Primary,
    /// stderr: forwards lines only.
    Secondary,
}

impl fmt::Display for PumpRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("stdout"),
            Self::Secondary => f.write_str("stderr"),
        }
    }
}

/// Read `reader` to end-of-stream, forwarding every line into `session`.
///
/// Returns the number of lines forwarded. Read errors end the pump the same
/// way end-of-stream does.
pub async fn pump_lines<R>(reader: R, role: PumpRole, session: &ScanSession) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut forwarded = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let raw = String::from_utf8_lossy(&buf);
                for line in split_lines(&raw) {
                    if role == PumpRole::Primary {
                        if let Some(progress) = extract_progress(&line) {
                            session.update_progress(progress);
                        }
                    }
                    session.push_line(line);
                    forwarded += 1;
                }
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id(),
                    stream = %role,
                    error = %e,
                    "Failed to read scanner output"
                );
                break;
            }
        }
    }

    tracing::debug!(session_id = %session.id(), stream = %role, forwarded, "Output stream closed");
    forwarded
}

/// Own the child until it exits, signalling or killing it on request.
///
/// Stop signals are sent from here so they can never reach a pid that has
/// already been reaped.
fn supervise_exit(session: Arc<ScanSession>, mut process: ScanProcess) -> JoinHandle<()> {
    let kill = session.kill_token();
    tokio::spawn(async move {
        let status = loop {
            tokio::select! {
                status = process.wait() => break status,
                () = session.interrupt_requested() => {
                    if let Err(e) = process.interrupt() {
                        tracing::debug!(
                            session_id = %session.id(),
                            error = %e,
                            "Stop request failed"
                        );
                    }
                }
                () = kill.cancelled() => {
                    if let Err(e) = process.start_kill() {
                        tracing::debug!(
                            session_id = %session.id(),
                            error = %e,
                            "Kill request failed"
                        );
                    }
                    break process.wait().await;
                }
            }
        };

        let status: Option<ExitStatus> = match status {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id(),
                    error = %e,
                    "Failed to wait for scanner"
                );
                None
            }
        };
        session.record_exit(status);
    })
}

/// Start both output pumps and the exit supervisor for a freshly spawned
/// scanner.
///
/// The session is marked done once stdout and stderr have both reached
/// end-of-stream and the process has been reaped.
pub(crate) fn spawn_pumps(session: Arc<ScanSession>, mut process: ScanProcess) {
    let stdout = process.take_stdout();
    let stderr = process.take_stderr();

    let stderr_pump = stderr.map(|stderr| {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            pump_lines(stderr, PumpRole::Secondary, &session).await;
        })
    });

    let exit = supervise_exit(Arc::clone(&session), process);

    tokio::spawn(async move {
        if let Some(stdout) = stdout {
            pump_lines(stdout, PumpRole::Primary, &session).await;
        }

        if let Some(handle) = stderr_pump {
            if let Err(e) = handle.await {
                tracing::warn!(session_id = %session.id(), error = %e, "stderr pump failed");
            }
        }

        if let Err(e) = exit.await {
            tracing::warn!(session_id = %session.id(), error = %e, "Exit supervisor failed");
        }

        session.finish();
    });
}
