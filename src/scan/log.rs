//! Append-only event log shared by a session's pumps and subscribers.
//!
//! The log is a broadcast record rather than a queue: every subscriber gets
//! its own [`LogCursor`] and reads the full ordered content independently.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

/// Ordered record of sanitized output lines for one session.
#[derive(Debug)]
pub struct EventLog {
    lines: Mutex<Vec<String>>,
    /// Current line count, used only to wake waiting cursors.
    len_tx: watch::Sender<usize>,
}

impl EventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            lines: Mutex::new(Vec::new()),
            len_tx,
        }
    }

    /// Append a line and wake every waiting cursor.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock().expect("Mutex poisoned");
        lines.push(line);
        // Sent under the lock so the published length never goes backwards.
        self.len_tx.send_replace(lines.len());
    }

    /// Number of lines recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.lock().expect("Mutex poisoned").len()
    }

    /// Returns `true` if nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a copy of the line at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the internal `Mutex` is poisoned.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<String> {
        self.lines.lock().expect("Mutex poisoned").get(index).cloned()
    }

    /// Create a cursor that reads the log from its first line.
    #[must_use]
    pub fn subscribe(self: &Arc<Self>) -> LogCursor {
        LogCursor {
            log: Arc::clone(self),
            next: 0,
            changed: self.len_tx.subscribe(),
        }
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Independent read position into an [`EventLog`].
#[derive(Debug)]
pub struct LogCursor {
    log: Arc<EventLog>,
    next: usize,
    changed: watch::Receiver<usize>,
}

impl LogCursor {
    /// Returns `true` if lines exist past this cursor's position.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.next < self.log.len()
    }

    /// Take the next line without waiting.
    pub fn try_next(&mut self) -> Option<String> {
        let line = self.log.get(self.next)?;
        self.next += 1;
        Some(line)
    }

    /// Take the next line, waiting at most `wait` for one to arrive.
    pub async fn next_timeout(&mut self, wait: Duration) -> Option<String> {
        if let Some(line) = self.try_next() {
            return Some(line);
        }

        // Mark the current length as seen, then re-check to close the gap
        // between the first check and the wait.
        self.changed.borrow_and_update();
        if let Some(line) = self.try_next() {
            return Some(line);
        }

        match tokio::time::timeout(wait, self.changed.changed()).await {
            Ok(Ok(())) => self.try_next(),
            Ok(Err(_)) | Err(_) => None,
        }
    }
}
