//! Grid capacity planning for the agent area beside the main pane.

use serde::{Deserialize, Serialize};

use crate::types::{
    CapacityConfig, DIVIDER_SIZE, MAIN_PANE_RATIO, MAX_GRID_SIZE, MIN_PANE_HEIGHT, PaneInfo,
};

/// How many minimum-sized panes fit in the agent area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCapacity {
    pub cols: u32,
    pub rows: u32,
    pub total: u32,
}

/// Logical grid chosen for a given pane count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPlan {
    pub cols: u32,
    pub rows: u32,
    pub slot_width: u32,
    pub slot_height: u32,
}

impl GridPlan {
    /// The "cannot grid-place" plan: a single cell with no area.
    pub const DEGENERATE: Self = Self {
        cols: 1,
        rows: 1,
        slot_width: 0,
        slot_height: 0,
    };

    pub fn is_degenerate(&self) -> bool {
        self.slot_width == 0 || self.slot_height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSlot {
    pub row: u32,
    pub col: u32,
}

/// Width available to agent panes.
///
/// With a known main pane width the agent area is whatever remains after the
/// main pane and its divider; otherwise the main pane is assumed to take
/// `MAIN_PANE_RATIO` of the window.
pub fn agent_area_width(window_width: u32, main_pane_width: Option<u32>) -> u32 {
    match main_pane_width {
        Some(main) => window_width
            .saturating_sub(main)
            .saturating_sub(DIVIDER_SIZE),
        None => (f64::from(window_width) * (1.0 - MAIN_PANE_RATIO)).floor() as u32,
    }
}

/// Count the slots of `min_pane_width` × `MIN_PANE_HEIGHT` that fit, one
/// divider cell between neighbours.
pub fn calculate_capacity(
    window_width: u32,
    window_height: u32,
    min_pane_width: u32,
    main_pane_width: Option<u32>,
) -> GridCapacity {
    let available = agent_area_width(window_width, main_pane_width);
    let cols = ((available + DIVIDER_SIZE) / (min_pane_width + DIVIDER_SIZE)).min(MAX_GRID_SIZE);
    let rows =
        ((window_height + DIVIDER_SIZE) / (MIN_PANE_HEIGHT + DIVIDER_SIZE)).min(MAX_GRID_SIZE);
    GridCapacity {
        cols,
        rows,
        total: cols * rows,
    }
}

/// Pick the smallest-area grid holding `pane_count` panes.
///
/// Ties go to the grid with fewer rows. Returns [`GridPlan::DEGENERATE`] when
/// no grid within capacity can hold them.
pub fn compute_grid_plan(
    window_width: u32,
    window_height: u32,
    pane_count: u32,
    config: &CapacityConfig,
    main_pane_width: Option<u32>,
) -> GridPlan {
    let capacity = calculate_capacity(
        window_width,
        window_height,
        config.agent_pane_min_width,
        main_pane_width,
    );
    let needed = pane_count.max(1);

    let mut best: Option<(u32, u32)> = None;
    for rows in 1..=capacity.rows {
        for cols in 1..=capacity.cols {
            if cols * rows < needed {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_cols, best_rows)) => cols * rows < best_cols * best_rows,
            };
            if better {
                best = Some((cols, rows));
            }
        }
    }

    let Some((cols, rows)) = best else {
        return GridPlan::DEGENERATE;
    };

    let available = agent_area_width(window_width, main_pane_width);
    let slot_width = available.saturating_sub((cols - 1) * DIVIDER_SIZE) / cols;
    let slot_height = window_height.saturating_sub((rows - 1) * DIVIDER_SIZE) / rows;

    GridPlan {
        cols,
        rows,
        slot_width,
        slot_height,
    }
}

/// Map an existing pane's absolute position onto a slot of `plan`.
pub fn map_pane_to_slot(pane: &PaneInfo, plan: &GridPlan, main_pane_width: u32) -> GridSlot {
    let offset = main_pane_width + DIVIDER_SIZE;
    let rel_left = pane.left.saturating_sub(offset);

    let col = if plan.slot_width == 0 {
        0
    } else {
        rel_left / plan.slot_width
    };
    let row = if plan.slot_height == 0 {
        0
    } else {
        pane.top / plan.slot_height
    };

    GridSlot {
        row: row.min(plan.rows.saturating_sub(1)),
        col: col.min(plan.cols.saturating_sub(1)),
    }
}
