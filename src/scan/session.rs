//! A single scan session: one scanner process and its observable state.

use std::fmt;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::command::ScanCommand;
use super::log::{EventLog, LogCursor};
use super::progress::Progress;
use super::pump;
use super::ScanError;

/// Opaque scan session identifier (32 lowercase hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Point-in-time view of a session, as returned by the status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    /// Current progress counter.
    pub progress: u64,
    /// Total progress counter.
    pub total: u64,
    /// Whether the scanner has exited and its stdout has been drained.
    pub done: bool,
}

impl ScanStatus {
    /// The progress pair of this snapshot.
    #[must_use]
    pub fn progress_pair(&self) -> Progress {
        Progress::new(self.progress, self.total)
    }
}

/// Mutable session state guarded by the session mutex.
#[derive(Debug, Default)]
struct SessionState {
    progress: Progress,
    done: bool,
    exited: bool,
    exit_code: Option<i32>,
    finished_at: Option<DateTime<Utc>>,
}

/// A live binding between one scanner process and its derived state.
#[derive(Debug)]
pub struct ScanSession {
    id: SessionId,
    target: String,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    state: Mutex<SessionState>,
    log: Arc<EventLog>,
    /// Wakes the exit supervisor to signal the child it owns.
    interrupt: Notify,
    /// Cancelled to make the exit supervisor force-kill the child.
    kill: CancellationToken,
}

impl ScanSession {
    /// Create a session record without a process attached.
    #[must_use]
    pub fn new(id: SessionId, target: impl Into<String>, pid: Option<u32>) -> Self {
        Self {
            id,
            target: target.into(),
            pid,
            started_at: Utc::now(),
            state: Mutex::new(SessionState::default()),
            log: Arc::new(EventLog::new()),
            interrupt: Notify::new(),
            kill: CancellationToken::new(),
        }
    }

    /// Spawn the scanner for `target` and start pumping its output.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::InvalidInput` for an empty target and
    /// `ScanError::SpawnFailure` if the process cannot be launched. No pumps
    /// are started in either case.
    pub fn start(
        id: SessionId,
        command: &ScanCommand,
        target: &str,
        skip: &str,
    ) -> Result<Arc<Self>, ScanError> {
        let process = command.spawn(target, skip)?;
        let session = Arc::new(Self::new(id, target.trim(), process.id()));

        tracing::info!(
            session_id = %session.id,
            target = %session.target,
            pid = ?session.pid,
            "Scan session started"
        );

        pump::spawn_pumps(Arc::clone(&session), process);
        Ok(session)
    }

    /// Get the session identifier.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Get the scan target.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Get the scanner process ID, if one was assigned at spawn.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// When the session was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Take a consistent snapshot of progress and completion.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> ScanStatus {
        let state = self.state.lock().expect("Mutex poisoned");
        ScanStatus {
            progress: state.progress.current,
            total: state.progress.total,
            done: state.done,
        }
    }

    /// Whether the session has completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.snapshot().done
    }

    /// Whether the scanner process has been reaped.
    ///
    /// This can precede `done`, which also waits for output to drain.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    #[must_use]
    pub fn has_exited(&self) -> bool {
        let state = self.state.lock().expect("Mutex poisoned");
        state.exited || state.done
    }

    /// Exit code of the scanner, once it has exited normally.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.state.lock().expect("Mutex poisoned").exit_code
    }

    /// When the session completed, if it has.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().expect("Mutex poisoned").finished_at
    }

    /// Whether the session finished at least `ttl` ago.
    #[must_use]
    pub fn finished_longer_than(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let Some(finished) = self.finished_at() else {
            return false;
        };
        chrono::Duration::from_std(ttl).is_ok_and(|ttl| now.signed_duration_since(finished) >= ttl)
    }

    /// Subscribe to the session's output from its first line.
    #[must_use]
    pub fn subscribe(&self) -> LogCursor {
        self.log.subscribe()
    }

    /// Number of output lines recorded so far.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.log.len()
    }

    /// Ask the scanner to stop.
    ///
    /// The exit supervisor sends an interrupt, falling back to a terminate
    /// request and then to a kill. It only signals a child it has not yet
    /// reaped. Never waits and never fails; a finished session is left
    /// untouched.
    pub fn request_stop(&self) {
        if self.has_exited() {
            tracing::debug!(session_id = %self.id, "Stop requested after scanner exit");
            return;
        }

        tracing::info!(session_id = %self.id, pid = ?self.pid, "Stopping scan");

        if self.pid.is_some() {
            self.interrupt.notify_one();
        } else {
            self.kill.cancel();
        }
    }

    /// Force-kill the scanner if it is still running.
    pub fn force_kill(&self) {
        if !self.has_exited() {
            tracing::warn!(session_id = %self.id, pid = ?self.pid, "Force-killing scanner");
            self.kill.cancel();
        }
    }

    /// Resolves once a stop has been requested since the last wake.
    pub(crate) async fn interrupt_requested(&self) {
        self.interrupt.notified().await;
    }

    pub(crate) fn kill_token(&self) -> CancellationToken {
        self.kill.clone()
    }

    pub(crate) fn push_line(&self, line: String) {
        self.log.push(line);
    }

    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    pub(crate) fn update_progress(&self, progress: Progress) {
        self.state.lock().expect("Mutex poisoned").progress = progress;
    }

    /// Record that the scanner process was reaped. The pid must not be
    /// signalled after this.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    pub(crate) fn record_exit(&self, status: Option<ExitStatus>) {
        let mut state = self.state.lock().expect("Mutex poisoned");
        state.exited = true;
        state.exit_code = status.and_then(|s| s.code());
        drop(state);

        tracing::debug!(session_id = %self.id, exit_status = ?status, "Scanner exited");
    }

    /// Mark the session complete. Only the first call has any effect.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    pub(crate) fn finish(&self) {
        let mut state = self.state.lock().expect("Mutex poisoned");
        if state.done {
            return;
        }
        state.done = true;
        state.finished_at = Some(Utc::now());
        let exit_code = state.exit_code;
        drop(state);

        tracing::info!(
            session_id = %self.id,
            exit_code = ?exit_code,
            lines = self.line_count(),
            elapsed_ms = (Utc::now() - self.started_at()).num_milliseconds(),
            "Scan session finished"
        );
    }
}
