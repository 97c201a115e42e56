//! Process-wide registry of scan sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_core::Stream;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::command::ScanCommand;
use super::session::{ScanSession, ScanStatus, SessionId};
use super::stream::{event_stream, ScanEvent, DEFAULT_HEARTBEAT};
use super::ScanError;

/// Lifecycle policy applied to every session in a registry.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Bounded wait per stream iteration; drives the progress heartbeat.
    pub heartbeat: Duration,
    /// Force-kill a stopped scanner still running after this long.
    pub stop_grace: Option<Duration>,
    /// Evict sessions this long after they finish.
    pub ttl: Option<Duration>,
    /// How often the reaper looks for expired sessions.
    pub reap_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            heartbeat: DEFAULT_HEARTBEAT,
            stop_grace: None,
            ttl: None,
            reap_interval: Duration::from_secs(60),
        }
    }
}

/// Map of session id to session, plus the command used to start scans.
#[derive(Debug)]
pub struct ScanRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<ScanSession>>>,
    command: ScanCommand,
    options: SessionOptions,
}

impl ScanRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(command: ScanCommand, options: SessionOptions) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            command,
            options,
        }
    }

    /// Register a session under `id`, replacing nothing.
    ///
    /// Returns `false` if the id is already taken.
    pub async fn put(&self, id: SessionId, session: Arc<ScanSession>) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            return false;
        }
        sessions.insert(id, session);
        true
    }

    /// Look up a session.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::NotFound` for an unknown id.
    pub async fn get(&self, id: &str) -> Result<Arc<ScanSession>, ScanError> {
        self.sessions
            .read()
            .await
            .get(&SessionId::from(id))
            .cloned()
            .ok_or_else(|| ScanError::NotFound(id.to_string()))
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no session is registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Ids of every registered session.
    pub async fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Start a scan of `target` and register it under a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::InvalidInput` for an empty target and
    /// `ScanError::SpawnFailure` if the scanner cannot be launched. Nothing
    /// is registered on error.
    pub async fn start_scan(&self, target: &str, skip: &str) -> Result<SessionId, ScanError> {
        if target.trim().is_empty() {
            return Err(ScanError::target_required());
        }

        // The scanner is spawned without holding the lock; the insert
        // re-checks the id.
        loop {
            let id = self.unused_id().await;
            let session = ScanSession::start(id.clone(), &self.command, target, skip)?;
            if self.put(id.clone(), Arc::clone(&session)).await {
                return Ok(id);
            }
            tracing::warn!(session_id = %id, "Session id taken during spawn, retrying");
            session.force_kill();
        }
    }

    async fn unused_id(&self) -> SessionId {
        let sessions = self.sessions.read().await;
        loop {
            let candidate = SessionId::generate();
            if !sessions.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Open an event stream for a session.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::NotFound` for an unknown id, before any event.
    pub async fn stream_events(
        &self,
        id: &str,
    ) -> Result<impl Stream<Item = ScanEvent> + Send + 'static, ScanError> {
        let session = self.get(id).await?;
        tracing::debug!(session_id = %session.id(), "Stream subscriber attached");
        Ok(event_stream(session, self.options.heartbeat))
    }

    /// Request that a session's scanner stop.
    ///
    /// Delivery failures are swallowed. When a stop grace period is
    /// configured, a scanner still running after it is force-killed.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::NotFound` for an unknown id.
    pub async fn stop_scan(&self, id: &str) -> Result<(), ScanError> {
        let session = self.get(id).await?;
        session.request_stop();

        if let Some(grace) = self.options.stop_grace {
            if !session.has_exited() {
                tokio::spawn(async move {
                    tokio::time::sleep(grace).await;
                    session.force_kill();
                });
            }
        }
        Ok(())
    }

    /// Current progress and completion of a session.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::NotFound` for an unknown id.
    pub async fn status(&self, id: &str) -> Result<ScanStatus, ScanError> {
        Ok(self.get(id).await?.snapshot())
    }

    /// Remove sessions that finished at least `ttl` ago.
    ///
    /// Running sessions are never removed. Returns the number evicted.
    pub async fn reap_finished(&self, ttl: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.finished_longer_than(ttl, now));
        let reaped = before - sessions.len();
        if reaped > 0 {
            tracing::info!(reaped, remaining = sessions.len(), "Reaped finished sessions");
        }
        reaped
    }

    /// Spawn the periodic reaper if a session TTL is configured.
    pub fn spawn_reaper(self: &Arc<Self>, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        let ttl = self.options.ttl?;
        let interval = self.options.reap_interval;
        let registry = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        registry.reap_finished(ttl).await;
                    }
                }
            }
        }))
    }
}
