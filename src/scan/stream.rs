//! Event stream adapter: turns a session into a self-terminating push feed.
//!
//! Each wake of the adapter emits at most one output line, then always a
//! progress heartbeat carrying the latest snapshot. Once the session is done
//! and the subscriber has consumed every line, a single `Complete` event is
//! emitted and the stream ends.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_core::Stream;

use super::log::LogCursor;
use super::progress::Progress;
use super::session::ScanSession;

/// Default bounded wait per adapter iteration.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_millis(500);

/// Shortest bounded wait the adapter will use.
pub const MIN_HEARTBEAT: Duration = Duration::from_millis(10);

/// One emission of a session event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A sanitized output line.
    Data(String),
    /// Full replacement of the progress pair.
    Progress(Progress),
    /// The session finished and all lines were delivered.
    Complete,
}

impl ScanEvent {
    /// SSE `event:` tag, if the event carries one.
    #[must_use]
    pub fn event_name(&self) -> Option<&'static str> {
        match self {
            Self::Data(_) => None,
            Self::Progress(_) => Some("progress"),
            Self::Complete => Some("complete"),
        }
    }

    /// Payload for the SSE `data:` field.
    #[must_use]
    pub fn data(&self) -> String {
        match self {
            Self::Data(line) => line.clone(),
            Self::Progress(p) => {
                format!("{{\"progress\": {}, \"total\": {}}}", p.current, p.total)
            }
            Self::Complete => "done".to_string(),
        }
    }

    /// Returns `true` for the terminal event.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Adapter state for one subscriber.
struct Adapter {
    session: Arc<ScanSession>,
    cursor: LogCursor,
    heartbeat: Duration,
    queued: VecDeque<ScanEvent>,
    closed: bool,
}

impl Adapter {
    /// Run one OPEN iteration, queueing its emissions.
    async fn tick(&mut self) {
        if let Some(line) = self.cursor.next_timeout(self.heartbeat).await {
            self.queued.push_back(ScanEvent::Data(line));
        }

        let snapshot = self.session.snapshot();
        self.queued.push_back(ScanEvent::Progress(snapshot.progress_pair()));

        // `done` is only set after both pumps finished appending, so a done
        // snapshot plus an exhausted cursor means nothing is left to send.
        if snapshot.done && !self.cursor.has_pending() {
            self.queued.push_back(ScanEvent::Complete);
            self.closed = true;
            tracing::debug!(session_id = %self.session.id(), "Event stream complete");
        }
    }
}

/// Subscribe to `session` and produce its event feed.
///
/// `heartbeat` bounds how long each iteration waits for a new line, which
/// sets the cadence of progress events when the scanner is quiet. Values
/// below [`MIN_HEARTBEAT`] are raised to it.
pub fn event_stream(
    session: Arc<ScanSession>,
    heartbeat: Duration,
) -> impl Stream<Item = ScanEvent> + Send + 'static {
    let adapter = Adapter {
        cursor: session.subscribe(),
        session,
        heartbeat: heartbeat.max(MIN_HEARTBEAT),
        queued: VecDeque::new(),
        closed: false,
    };

    futures_util::stream::unfold(adapter, |mut adapter| async move {
        if let Some(event) = adapter.queued.pop_front() {
            return Some((event, adapter));
        }
        if adapter.closed {
            return None;
        }
        adapter.tick().await;
        let event = adapter.queued.pop_front()?;
        Some((event, adapter))
    })
}
