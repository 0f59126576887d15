//! Decision engine: turn a window snapshot and a spawn request into an
//! ordered list of pane actions, or a reason why nothing can be done now.

use crate::eviction::{find_oldest_agent_pane, session_for_pane};
use crate::split::{find_minimal_evictions, is_splittable_at_count};
use crate::target::{find_initial_target, find_spawn_target};
use crate::types::{CapacityConfig, PaneAction, SessionMapping, SpawnDecision, WindowState};

pub const REASON_NO_MAIN_PANE: &str = "no main pane found";
pub const REASON_WINDOW_TOO_SMALL: &str = "window too small for agent panes";
pub const REASON_MAIN_PANE_TOO_SMALL: &str = "mainPane too small to split";
pub const REASON_CLOSED_ONE: &str = "closed 1 pane to make room for split";
pub const REASON_REPLACED_OLDEST: &str = "replaced oldest pane";
pub const REASON_NO_TARGET: &str = "no split target available (defer attach)";

/// Decide how to give `session_id` a pane.
///
/// Strict layouts never evict: when their axis is full the request is denied
/// and the caller defers it. Grid layouts close the oldest tracked pane when
/// one eviction is enough, and replace it in place when more would be needed.
pub fn decide_spawn_actions(
    state: &WindowState,
    session_id: &str,
    description: &str,
    config: &CapacityConfig,
    mappings: &[SessionMapping],
) -> SpawnDecision {
    let Some(main) = state.main_pane.as_ref() else {
        return SpawnDecision::deny(REASON_NO_MAIN_PANE);
    };

    let agent_count = state.agent_panes.len() as u32;
    let agent_area_width = config.agent_area_width(state.window_width);
    let min_width = config.agent_pane_min_width;

    if agent_count > 0 && agent_area_width < min_width {
        return SpawnDecision::deny(REASON_WINDOW_TOO_SMALL);
    }

    let spawn = |target_pane_id: String, split_direction| PaneAction::Spawn {
        session_id: session_id.to_string(),
        description: description.to_string(),
        target_pane_id,
        split_direction,
    };

    if agent_count == 0 {
        return match find_initial_target(state, main, config) {
            Some(target) => SpawnDecision::spawn(vec![spawn(
                target.target_pane_id,
                target.split_direction,
            )]),
            None => SpawnDecision::deny(REASON_MAIN_PANE_TOO_SMALL),
        };
    }

    let strict = config.layout.is_strict();
    if (strict || is_splittable_at_count(agent_area_width, agent_count, min_width))
        && let Some(target) = find_spawn_target(state, config)
    {
        return SpawnDecision::spawn(vec![spawn(
            target.target_pane_id,
            target.split_direction,
        )]);
    }

    if strict {
        return SpawnDecision::deny(REASON_NO_TARGET);
    }

    let Some(oldest) = find_oldest_agent_pane(&state.agent_panes, mappings) else {
        return SpawnDecision::deny(REASON_NO_TARGET);
    };
    let oldest_session = session_for_pane(mappings, &oldest.id)
        .unwrap_or_default()
        .to_string();

    if find_minimal_evictions(agent_area_width, agent_count, min_width) == Some(1) {
        return SpawnDecision::with_reason(
            vec![
                PaneAction::Close {
                    pane_id: oldest.id.clone(),
                    session_id: oldest_session,
                },
                spawn(main.id.clone(), config.layout.initial_direction()),
            ],
            REASON_CLOSED_ONE,
        );
    }

    // Also reached when no eviction count frees a splittable column.
    SpawnDecision::with_reason(
        vec![PaneAction::Replace {
            pane_id: oldest.id.clone(),
            new_session_id: session_id.to_string(),
            description: description.to_string(),
            old_session_id: oldest_session,
        }],
        REASON_REPLACED_OLDEST,
    )
}

/// `Close` for the pane mapped to `session_id`, or `None` if it is already gone.
pub fn decide_close_action(
    state: &WindowState,
    session_id: &str,
    mappings: &[SessionMapping],
) -> Option<PaneAction> {
    let mapping = mappings.iter().find(|m| m.session_id == session_id)?;
    state.agent_pane(&mapping.pane_id)?;
    Some(PaneAction::Close {
        pane_id: mapping.pane_id.clone(),
        session_id: session_id.to_string(),
    })
}
