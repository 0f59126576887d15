//! Session events as sent by the agent runtime.

use serde::{Deserialize, Serialize};

/// Title used when a child session arrives without one.
pub const DEFAULT_SESSION_TITLE: &str = "subagent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCreated {
    pub id: String,
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SessionCreated {
    /// Only child sessions (those with a parent) get a pane.
    pub fn is_worker(&self) -> bool {
        self.parent_id.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn display_title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => DEFAULT_SESSION_TITLE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDeleted {
    #[serde(rename = "sessionID")]
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatusUpdate {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub status: String,
}
