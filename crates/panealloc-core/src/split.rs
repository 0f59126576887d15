//! Split availability: can a pane be divided without dropping below the
//! minimum pane size, and how many panes must go before it can.

use crate::types::{DIVIDER_SIZE, MAX_ROWS_PER_COLUMN, MIN_PANE_HEIGHT, PaneInfo, SplitDirection};

/// Smallest width that still yields two panes of `min_pane_width` after a
/// horizontal split.
pub fn min_split_width(min_pane_width: u32) -> u32 {
    2 * min_pane_width + DIVIDER_SIZE
}

/// Smallest height that still yields two panes of `MIN_PANE_HEIGHT` after a
/// vertical split.
pub fn min_split_height() -> u32 {
    2 * MIN_PANE_HEIGHT + DIVIDER_SIZE
}

pub fn can_split_pane(pane: &PaneInfo, direction: SplitDirection, min_pane_width: u32) -> bool {
    match direction {
        SplitDirection::Horizontal => pane.width >= min_split_width(min_pane_width),
        SplitDirection::Vertical => pane.height >= min_split_height(),
    }
}

/// Preferred split direction for `pane`, or `None` when it cannot be split.
///
/// When both directions are possible the longer side is divided.
pub fn best_split_direction(pane: &PaneInfo, min_pane_width: u32) -> Option<SplitDirection> {
    let horizontal = can_split_pane(pane, SplitDirection::Horizontal, min_pane_width);
    let vertical = can_split_pane(pane, SplitDirection::Vertical, min_pane_width);
    match (horizontal, vertical) {
        (true, true) if pane.width >= pane.height => Some(SplitDirection::Horizontal),
        (true, true) => Some(SplitDirection::Vertical),
        (true, false) => Some(SplitDirection::Horizontal),
        (false, true) => Some(SplitDirection::Vertical),
        (false, false) => None,
    }
}

/// Whether a column layout holding `pane_count` agent panes still leaves each
/// column wide enough to split once more.
///
/// Columns hold at most `MAX_ROWS_PER_COLUMN` panes; an empty area counts as
/// one column.
pub fn is_splittable_at_count(agent_area_width: u32, pane_count: u32, min_pane_width: u32) -> bool {
    let columns = pane_count.div_ceil(MAX_ROWS_PER_COLUMN).max(1);
    let column_width = agent_area_width.saturating_sub((columns - 1) * DIVIDER_SIZE) / columns;
    column_width >= min_split_width(min_pane_width)
}

/// Smallest number of panes to evict so the remainder is splittable again.
///
/// `None` when even evicting every pane would not help.
pub fn find_minimal_evictions(
    agent_area_width: u32,
    current_count: u32,
    min_pane_width: u32,
) -> Option<u32> {
    (1..=current_count).find(|&k| {
        is_splittable_at_count(agent_area_width, current_count - k, min_pane_width)
    })
}
