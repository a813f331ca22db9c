//! The Session Manager (spec §4.5, component C5): a `DashMap`-backed registry of
//! per-session cooperative mutexes, mirroring the teacher's `McpManager` registry pattern
//! but keyed by session rather than by running subprocess.

use std::sync::Arc;
use std::time::Duration;

use cairn_core::{Session, SessionId, Turn};
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};

use crate::record::SessionRecord;

/// How long the sweeper waits to acquire a session's mutex before giving up on that
/// session for this sweep cycle (spec §5: "must acquire the session's mutex (with a short
/// timeout) before destroying it; a session in active use is never destroyed mid-request").
const SWEEP_LOCK_TIMEOUT: Duration = Duration::from_millis(200);

pub struct SessionManager {
    registry: DashMap<SessionId, Arc<Mutex<Session>>>,
    timeout: Duration,
    window_k: usize,
    pub sweep_interval: Duration,
}

impl SessionManager {
    pub fn new(timeout: Duration, window_k: usize, sweep_interval: Duration) -> Self {
        Self { registry: DashMap::new(), timeout, window_k, sweep_interval }
    }

    /// `create() -> SessionRecord` (spec §4.5): new identifier, now-timestamp, empty
    /// history, zeroed clarification counter.
    pub fn create(&self) -> SessionRecord {
        self.create_with_history(Vec::new())
    }

    /// `create()` seeded with a caller-supplied history (spec's resolved Open Question on
    /// `conversation_history`): honored only at creation, to pre-populate the rolling
    /// window, trimmed to `window_k` exactly as `append_turn` would. Every turn appended
    /// afterward comes from the session's own server-side history, not the caller again.
    pub fn create_with_history(&self, seed: Vec<Turn>) -> SessionRecord {
        let mut session = Session::new(self.timeout, self.window_k);
        for turn in seed {
            session.append_turn(turn);
        }
        let record = SessionRecord::from_session(&session, session.created_at);
        self.registry.insert(session.id, Arc::new(Mutex::new(session)));
        record
    }

    /// `get(id) -> SessionRecord or SessionNotFound` (spec §4.5): advances `last_activity`
    /// to now on hit.
    #[instrument(skip(self))]
    pub async fn get(&self, id: SessionId) -> Result<SessionRecord, cairn_error::Error> {
        let arc = self.handle(id)?;
        let mut session = arc.lock().await;
        let now = Utc::now();
        if session.is_expired_at(now) {
            drop(session);
            self.registry.remove(&id);
            return Err(cairn_error::Error::SessionNotFound(id.as_uuid()));
        }
        session.touch(now);
        Ok(SessionRecord::from_session(&session, now))
    }

    /// `extend(id) -> remaining_seconds or SessionNotFound` (spec §4.5): explicit
    /// activity-nudge.
    #[instrument(skip(self))]
    pub async fn extend(&self, id: SessionId) -> Result<i64, cairn_error::Error> {
        let record = self.get(id).await?;
        Ok(record.remaining_seconds)
    }

    /// `end(id)` (spec §4.5): idempotent destroy.
    pub fn end(&self, id: SessionId) {
        self.registry.remove(&id);
    }

    /// `append_turn(id, turn)` (spec §4.5): appends and trims to window K.
    pub async fn append_turn(&self, id: SessionId, turn: Turn) -> Result<(), cairn_error::Error> {
        let arc = self.handle(id)?;
        let mut session = arc.lock().await;
        session.append_turn(turn);
        Ok(())
    }

    /// Acquire the session's mutex for the duration of one `ask` (spec §5: "a session
    /// holds a cooperative mutex for the duration of one `ask`, preventing interleaved
    /// state transitions of its FSM"). The returned guard derefs to `&mut Session`.
    #[instrument(skip(self))]
    pub async fn lock_session(&self, id: SessionId) -> Result<OwnedMutexGuard<Session>, cairn_error::Error> {
        let arc = self.handle(id)?;
        let mut guard = arc.lock_owned().await;
        let now = Utc::now();
        if guard.is_expired_at(now) {
            drop(guard);
            self.registry.remove(&id);
            return Err(cairn_error::Error::SessionNotFound(id.as_uuid()));
        }
        guard.touch(now);
        Ok(guard)
    }

    fn handle(&self, id: SessionId) -> Result<Arc<Mutex<Session>>, cairn_error::Error> {
        self.registry
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(cairn_error::Error::SessionNotFound(id.as_uuid()))
    }

    /// Spawn the background expiry sweeper (spec §4.5: "once per `sweep_interval`
    /// (default 60s) destroy any session whose `last_activity + timeout < now`").
    pub fn spawn_sweeper(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.sweep_interval);
            loop {
                ticker.tick().await;
                self.sweep_once().await;
            }
        })
    }

    async fn sweep_once(&self) {
        let now = Utc::now();
        let candidates: Vec<SessionId> = self.registry.iter().map(|kv| *kv.key()).collect();
        let mut swept = 0usize;
        for id in candidates {
            let Some(arc) = self.registry.get(&id).map(|e| e.value().clone()) else {
                continue;
            };
            match tokio::time::timeout(SWEEP_LOCK_TIMEOUT, arc.lock()).await {
                Ok(guard) => {
                    if guard.is_expired_at(now) {
                        drop(guard);
                        self.registry.remove(&id);
                        swept += 1;
                    }
                }
                Err(_) => {
                    warn!(%id, "session in active use; deferring expiry check to next sweep");
                }
            }
        }
        if swept > 0 {
            info!(swept, "expired sessions swept");
        }
    }
}
