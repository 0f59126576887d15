//! Tracked sessions: the authoritative session → pane cache.
//!
//! Entries are only inserted after a pane is confirmed to exist and are
//! removed when the session is deleted or its pane is closed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::SessionMapping;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedSession {
    pub session_id: String,
    pub pane_id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl TrackedSession {
    pub fn mapping(&self) -> SessionMapping {
        SessionMapping {
            session_id: self.session_id.clone(),
            pane_id: self.pane_id.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, TrackedSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `session_id` in `pane_id`. Replaces any previous entry.
    pub fn track(
        &mut self,
        session_id: &str,
        pane_id: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> &TrackedSession {
        self.sessions.insert(
            session_id.to_string(),
            TrackedSession {
                session_id: session_id.to_string(),
                pane_id: pane_id.to_string(),
                description: description.to_string(),
                created_at: now,
                last_seen_at: now,
            },
        );
        &self.sessions[session_id]
    }

    pub fn untrack(&mut self, session_id: &str) -> Option<TrackedSession> {
        self.sessions.remove(session_id)
    }

    pub fn get(&self, session_id: &str) -> Option<&TrackedSession> {
        self.sessions.get(session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn mark_seen(&mut self, session_id: &str, now: DateTime<Utc>) {
        if let Some(entry) = self.sessions.get_mut(session_id) {
            entry.last_seen_at = now;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Snapshot of mappings for the decision engine, oldest first.
    pub fn mappings(&self) -> Vec<SessionMapping> {
        let mut out: Vec<SessionMapping> =
            self.sessions.values().map(TrackedSession::mapping).collect();
        out.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        out
    }

    /// All tracked sessions, oldest first.
    pub fn sessions(&self) -> Vec<&TrackedSession> {
        let mut out: Vec<&TrackedSession> = self.sessions.values().collect();
        out.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        out
    }

    pub fn drain(&mut self) -> Vec<TrackedSession> {
        self.sessions.drain().map(|(_, s)| s).collect()
    }
}
