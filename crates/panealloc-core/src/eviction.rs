//! Eviction policy: the least-recently-created tracked agent pane goes first.

use crate::types::{PaneInfo, SessionMapping};

/// Oldest live agent pane that has a session mapping.
///
/// Panes without a mapping were not opened by us and are never returned.
pub fn find_oldest_agent_pane<'a>(
    agent_panes: &'a [PaneInfo],
    mappings: &[SessionMapping],
) -> Option<&'a PaneInfo> {
    let mut oldest: Option<(&PaneInfo, &SessionMapping)> = None;
    for pane in agent_panes {
        let Some(mapping) = mappings.iter().find(|m| m.pane_id == pane.id) else {
            continue;
        };
        match oldest {
            Some((_, current)) if current.created_at <= mapping.created_at => {}
            _ => oldest = Some((pane, mapping)),
        }
    }
    oldest.map(|(pane, _)| pane)
}

/// Session currently shown in `pane_id`, if any.
pub fn session_for_pane<'a>(mappings: &'a [SessionMapping], pane_id: &str) -> Option<&'a str> {
    mappings
        .iter()
        .find(|m| m.pane_id == pane_id)
        .map(|m| m.session_id.as_str())
}
