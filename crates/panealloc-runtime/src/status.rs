//! Session status registry: which sessions the agent runtime currently
//! reports a status for. Fed by `session.status` notifications and read by
//! the readiness wait and the liveness reconcile.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Answers "does this session currently have a status entry".
pub trait SessionStatusProbe: Send + Sync {
    fn has_status(&self, session_id: &str) -> bool;
}

impl<T: SessionStatusProbe + ?Sized> SessionStatusProbe for Arc<T> {
    fn has_status(&self, session_id: &str) -> bool {
        (**self).has_status(session_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

/// Shared, cloneable status map.
#[derive(Debug, Clone, Default)]
pub struct StatusRegistry {
    inner: Arc<RwLock<HashMap<String, SessionStatus>>>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, session_id: &str, status: &str, now: DateTime<Utc>) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(
            session_id.to_string(),
            SessionStatus {
                status: status.to_string(),
                updated_at: now,
            },
        );
    }

    pub fn remove(&self, session_id: &str) -> Option<SessionStatus> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.remove(session_id)
    }

    pub fn get(&self, session_id: &str) -> Option<SessionStatus> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(session_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl SessionStatusProbe for StatusRegistry {
    fn has_status(&self, session_id: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_then_probe() {
        let reg = StatusRegistry::new();
        assert!(!reg.has_status("ses_1"));
        reg.update("ses_1", "busy", Utc::now());
        assert!(reg.has_status("ses_1"));
        assert_eq!(reg.get("ses_1").map(|s| s.status), Some("busy".to_string()));
    }

    #[test]
    fn clones_share_state() {
        let reg = StatusRegistry::new();
        let other = reg.clone();
        other.update("ses_1", "idle", Utc::now());
        assert!(reg.has_status("ses_1"));
        assert!(reg.remove("ses_1").is_some());
        assert!(!other.has_status("ses_1"));
        assert_eq!(other.len(), 0);
    }
}
