//! Spawn target finder: which pane to split, and along which axis, to make
//! room for one more agent pane.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::capacity::{GridSlot, compute_grid_plan, map_pane_to_slot};
use crate::split::can_split_pane;
use crate::types::{CapacityConfig, LayoutKind, PaneInfo, SplitDirection, WindowState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnTarget {
    pub target_pane_id: String,
    pub split_direction: SplitDirection,
}

impl SpawnTarget {
    fn new(pane: &PaneInfo, split_direction: SplitDirection) -> Self {
        Self {
            target_pane_id: pane.id.clone(),
            split_direction,
        }
    }
}

/// Find a split target for the next agent pane, or `None` if the layout is full.
pub fn find_spawn_target(state: &WindowState, config: &CapacityConfig) -> Option<SpawnTarget> {
    let main = state.main_pane.as_ref()?;
    if state.agent_panes.is_empty() {
        return find_initial_target(state, main, config);
    }
    if config.layout.is_strict() {
        find_strict_target(&state.agent_panes, config)
    } else {
        find_grid_target(state, main, config)
    }
}

/// First split of the window: divide the main pane itself.
///
/// Before any agent pane exists tmux may already report the main pane at a
/// fraction of the window, so the full window size is what gets checked.
pub fn find_initial_target(
    state: &WindowState,
    main: &PaneInfo,
    config: &CapacityConfig,
) -> Option<SpawnTarget> {
    let direction = config.layout.initial_direction();
    let whole_window = PaneInfo {
        width: state.window_width,
        height: state.window_height,
        ..main.clone()
    };
    can_split_pane(&whole_window, direction, config.agent_pane_min_width)
        .then(|| SpawnTarget::new(main, direction))
}

/// Strict layouts only ever split agent panes along the layout's follow-up axis.
fn find_strict_target(agent_panes: &[PaneInfo], config: &CapacityConfig) -> Option<SpawnTarget> {
    let direction = config.layout.followup_direction();
    let row_major = matches!(config.layout, LayoutKind::MainHorizontal);
    ordered(agent_panes, row_major)
        .into_iter()
        .find(|pane| can_split_pane(pane, direction, config.agent_pane_min_width))
        .map(|pane| SpawnTarget::new(pane, direction))
}

fn find_grid_target(
    state: &WindowState,
    main: &PaneInfo,
    config: &CapacityConfig,
) -> Option<SpawnTarget> {
    let min_width = config.agent_pane_min_width;
    let main_width = main.left + main.width;
    let plan = compute_grid_plan(
        state.window_width,
        state.window_height,
        state.agent_panes.len() as u32 + 1,
        config,
        Some(main_width),
    );

    if !plan.is_degenerate() {
        let mut occupied: HashMap<GridSlot, &PaneInfo> = HashMap::new();
        for pane in ordered(&state.agent_panes, true) {
            occupied
                .entry(map_pane_to_slot(pane, &plan, main_width))
                .or_insert(pane);
        }

        let free_slot = (0..plan.rows)
            .flat_map(|row| (0..plan.cols).map(move |col| GridSlot { row, col }))
            .find(|slot| !occupied.contains_key(slot));

        if let Some(slot) = free_slot {
            if slot.col > 0
                && let Some(left) = occupied.get(&GridSlot {
                    row: slot.row,
                    col: slot.col - 1,
                })
                && can_split_pane(left, SplitDirection::Horizontal, min_width)
            {
                return Some(SpawnTarget::new(left, SplitDirection::Horizontal));
            }
            if slot.row > 0
                && let Some(above) = occupied.get(&GridSlot {
                    row: slot.row - 1,
                    col: slot.col,
                })
                && can_split_pane(above, SplitDirection::Vertical, min_width)
            {
                return Some(SpawnTarget::new(above, SplitDirection::Vertical));
            }
        }
    }

    let candidates = ordered(&state.agent_panes, true);
    candidates
        .iter()
        .find(|pane| can_split_pane(pane, SplitDirection::Vertical, min_width))
        .map(|pane| SpawnTarget::new(pane, SplitDirection::Vertical))
        .or_else(|| {
            candidates
                .iter()
                .find(|pane| can_split_pane(pane, SplitDirection::Horizontal, min_width))
                .map(|pane| SpawnTarget::new(pane, SplitDirection::Horizontal))
        })
}

/// Agent panes left-to-right then top-to-bottom (`row_major`), or
/// top-to-bottom then left-to-right.
fn ordered(panes: &[PaneInfo], row_major: bool) -> Vec<&PaneInfo> {
    let mut sorted: Vec<&PaneInfo> = panes.iter().collect();
    if row_major {
        sorted.sort_by_key(|p| (p.left, p.top));
    } else {
        sorted.sort_by_key(|p| (p.top, p.left));
    }
    sorted
}
