//! Deferred attach queue: sessions that could not get a pane yet.
//!
//! FIFO, bounded, with a hard TTL per entry. Time is passed in by the caller.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default lifetime of a deferred entry.
pub const DEFERRED_TTL: Duration = Duration::from_secs(5 * 60);

/// Default queue bound.
pub const MAX_DEFERRED_SESSIONS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredSession {
    pub session_id: String,
    pub title: String,
    pub queued_at: Instant,
}

impl DeferredSession {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.queued_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    AlreadyQueued,
    /// Queue at capacity; the new request was dropped.
    Full,
}

#[derive(Debug, Clone)]
pub struct DeferredQueue {
    entries: VecDeque<DeferredSession>,
    capacity: usize,
    ttl: Duration,
}

impl Default for DeferredQueue {
    fn default() -> Self {
        Self::new(MAX_DEFERRED_SESSIONS, DEFERRED_TTL)
    }
}

impl DeferredQueue {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            ttl,
        }
    }

    pub fn enqueue(&mut self, session_id: &str, title: &str, now: Instant) -> EnqueueOutcome {
        if self.contains(session_id) {
            return EnqueueOutcome::AlreadyQueued;
        }
        if self.entries.len() >= self.capacity {
            return EnqueueOutcome::Full;
        }
        self.entries.push_back(DeferredSession {
            session_id: session_id.to_string(),
            title: title.to_string(),
            queued_at: now,
        });
        EnqueueOutcome::Queued
    }

    pub fn remove(&mut self, session_id: &str) -> Option<DeferredSession> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.session_id == session_id)?;
        self.entries.remove(idx)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.entries.iter().any(|e| e.session_id == session_id)
    }

    pub fn front(&self) -> Option<&DeferredSession> {
        self.entries.front()
    }

    pub fn pop_front(&mut self) -> Option<DeferredSession> {
        self.entries.pop_front()
    }

    pub fn is_expired(&self, entry: &DeferredSession, now: Instant) -> bool {
        entry.age(now) > self.ttl
    }

    /// Drop expired entries from the head, returning them.
    pub fn pop_expired(&mut self, now: Instant) -> Vec<DeferredSession> {
        let mut expired = Vec::new();
        while let Some(head) = self.entries.front() {
            if !self.is_expired(head, now) {
                break;
            }
            if let Some(entry) = self.entries.pop_front() {
                expired.push(entry);
            }
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeferredSession> {
        self.entries.iter()
    }
}
