//! A read-only snapshot of a [`cairn_core::Session`] for facade/HTTP consumption (spec §6:
//! `POST /sessions` and `GET /sessions/{id}` response shapes).

use chrono::{DateTime, Utc};

use cairn_core::{Session, SessionId};

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub remaining_seconds: i64,
    pub timeout_minutes: u64,
    pub clarify_count: u32,
}

impl SessionRecord {
    pub fn from_session(session: &Session, now: DateTime<Utc>) -> Self {
        Self {
            id: session.id,
            created_at: session.created_at,
            remaining_seconds: session.remaining_seconds(now),
            timeout_minutes: session.timeout.as_secs() / 60,
            clarify_count: session.clarify_count,
        }
    }
}
