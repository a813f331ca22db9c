//! `Session` and `Turn` (spec §3). This crate defines only the data; lifecycle
//! (creation, expiry, the sliding inactivity timeout) is owned by `cairn-session`.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::SessionId;
use crate::passage::RetrievedPassage;

/// Default sliding inactivity timeout (spec §3).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default rolling dialog history window, in turns (spec §3).
pub const DEFAULT_WINDOW_K: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn of dialog, appended in order and trimmed to the session's window size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Cited passage identifiers and computed metrics, present only on assistant turns
    /// that produced a direct answer.
    pub sources: Vec<String>,
    pub metrics: Option<serde_json::Value>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
            sources: Vec::new(),
            metrics: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            sources: Vec::new(),
            metrics: None,
        }
    }
}

/// Per-session state: identity, activity clock, rolling dialog memory, and the
/// clarification budget counter for the question currently in flight.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub timeout: Duration,
    pub window_k: usize,
    history: VecDeque<Turn>,
    /// Number of clarifications already asked for the currently pending user question.
    /// Reset to 0 whenever the router reaches ANSWER (spec §4.4).
    pub clarify_count: u32,
    /// The unresolved question a pending clarification is waiting on, if any.
    pub pending_question: Option<String>,
    pub last_retrieval: Option<Vec<RetrievedPassage>>,
}

impl Session {
    pub fn new(timeout: Duration, window_k: usize) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            created_at: now,
            last_activity: now,
            timeout,
            window_k,
            history: VecDeque::new(),
            clarify_count: 0,
            pending_question: None,
            last_retrieval: None,
        }
    }

    /// Append a turn, trimming to `window_k` (spec §3: "bounded sliding window").
    pub fn append_turn(&mut self, turn: Turn) {
        self.history.push_back(turn);
        while self.history.len() > self.window_k {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> &VecDeque<Turn> {
        &self.history
    }

    /// The most recent assistant turn, if any — used by the router's INGEST node to
    /// detect whether the new utterance is a clarification response.
    pub fn last_assistant_turn(&self) -> Option<&Turn> {
        self.history.iter().rev().find(|t| t.role == Role::Assistant)
    }

    /// `last_activity + timeout < now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.timeout) {
            Ok(d) => self.last_activity + d < now,
            Err(_) => false,
        }
    }

    /// Monotonic bump of `last_activity`; never moves it backward (spec §8 invariant).
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        let timeout = chrono::Duration::from_std(self.timeout).unwrap_or_default();
        ((self.last_activity + timeout) - now).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_trims_to_window() {
        let mut s = Session::new(DEFAULT_TIMEOUT, 2);
        s.append_turn(Turn::user("a"));
        s.append_turn(Turn::assistant("b"));
        s.append_turn(Turn::user("c"));
        assert_eq!(s.history().len(), 2);
        assert_eq!(s.history()[0].text, "b");
        assert_eq!(s.history()[1].text, "c");
    }

    #[test]
    fn touch_never_moves_last_activity_backward() {
        let mut s = Session::new(DEFAULT_TIMEOUT, DEFAULT_WINDOW_K);
        let t0 = s.last_activity;
        s.touch(t0 - chrono::Duration::seconds(5));
        assert_eq!(s.last_activity, t0);
        let t1 = t0 + chrono::Duration::seconds(5);
        s.touch(t1);
        assert_eq!(s.last_activity, t1);
    }

    #[test]
    fn expiry_follows_last_activity_plus_timeout() {
        let mut s = Session::new(Duration::from_secs(1), DEFAULT_WINDOW_K);
        assert!(!s.is_expired_at(Utc::now()));
        s.last_activity = Utc::now() - chrono::Duration::seconds(5);
        assert!(s.is_expired_at(Utc::now()));
    }
}
