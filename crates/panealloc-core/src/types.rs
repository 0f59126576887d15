use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Geometry constants ───────────────────────────────────────────

/// Cells consumed by one tmux pane border.
pub const DIVIDER_SIZE: u32 = 1;

/// Minimum usable pane height. Independent of the configurable widths.
pub const MIN_PANE_HEIGHT: u32 = 11;

/// Upper bound for both grid dimensions.
pub const MAX_GRID_SIZE: u32 = 4;

/// Rows a single agent column is allowed to hold before a new column is needed.
pub const MAX_ROWS_PER_COLUMN: u32 = 3;

/// Share of the window assumed to belong to the main pane when its width is unknown.
pub const MAIN_PANE_RATIO: f64 = 0.5;

// ─── Panes & Window ───────────────────────────────────────────────

/// One pane as reported by a window snapshot. Offsets are window-relative.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaneInfo {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub left: u32,
    pub top: u32,
    pub title: String,
    pub is_active: bool,
}

impl PaneInfo {
    pub fn right(&self) -> u32 {
        self.left + self.width
    }
}

/// Geometry of the window at one point in time. Ephemeral: query, use, drop.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowState {
    pub window_width: u32,
    pub window_height: u32,
    pub main_pane: Option<PaneInfo>,
    pub agent_panes: Vec<PaneInfo>,
}

impl WindowState {
    pub fn agent_pane(&self, pane_id: &str) -> Option<&PaneInfo> {
        self.agent_panes.iter().find(|p| p.id == pane_id)
    }

    pub fn contains_pane(&self, pane_id: &str) -> bool {
        self.main_pane.as_ref().is_some_and(|p| p.id == pane_id)
            || self.agent_pane(pane_id).is_some()
    }
}

// ─── Layout & Direction ───────────────────────────────────────────

/// How agent panes are arranged around the main pane.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    /// Free 2D packing to the right of the main pane.
    #[default]
    Grid,
    /// Main pane on the left, agents stacked in a column on the right.
    MainVertical,
    /// Main pane on top, agents side by side underneath.
    MainHorizontal,
}

impl LayoutKind {
    pub const ALL: [Self; 3] = [Self::Grid, Self::MainVertical, Self::MainHorizontal];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::MainVertical => "main-vertical",
            Self::MainHorizontal => "main-horizontal",
        }
    }

    /// Strict layouts have a fixed split axis and never evict to make room.
    pub fn is_strict(self) -> bool {
        !matches!(self, Self::Grid)
    }

    /// Direction of the first split, which always divides the main pane.
    pub fn initial_direction(self) -> SplitDirection {
        match self {
            Self::MainHorizontal => SplitDirection::Vertical,
            Self::Grid | Self::MainVertical => SplitDirection::Horizontal,
        }
    }

    /// Direction used when splitting an existing agent pane in a strict layout.
    pub fn followup_direction(self) -> SplitDirection {
        match self {
            Self::MainHorizontal => SplitDirection::Horizontal,
            Self::Grid | Self::MainVertical => SplitDirection::Vertical,
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "main-vertical" => Ok(Self::MainVertical),
            "main-horizontal" => Ok(Self::MainHorizontal),
            _ => Err(format!("unknown layout: {s}")),
        }
    }
}

/// tmux split axis. `Horizontal` places the new pane beside the target
/// (`split-window -h`), `Vertical` places it underneath (`split-window -v`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitDirection {
    #[serde(rename = "-h")]
    Horizontal,
    #[serde(rename = "-v")]
    Vertical,
}

impl SplitDirection {
    pub fn as_flag(self) -> &'static str {
        match self {
            Self::Horizontal => "-h",
            Self::Vertical => "-v",
        }
    }
}

impl fmt::Display for SplitDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag())
    }
}

// ─── Capacity config ──────────────────────────────────────────────

/// Sizing rules for one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityConfig {
    pub layout: LayoutKind,
    /// Main pane share of the window width, always within 20..=80.
    pub main_pane_size_percent: u32,
    pub main_pane_min_width: u32,
    pub agent_pane_min_width: u32,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            layout: LayoutKind::Grid,
            main_pane_size_percent: 60,
            main_pane_min_width: 120,
            agent_pane_min_width: 40,
        }
    }
}

impl CapacityConfig {
    pub const MIN_MAIN_PANE_PERCENT: u32 = 20;
    pub const MAX_MAIN_PANE_PERCENT: u32 = 80;

    pub fn new(
        layout: LayoutKind,
        main_pane_size_percent: u32,
        main_pane_min_width: u32,
        agent_pane_min_width: u32,
    ) -> Self {
        Self {
            layout,
            main_pane_size_percent: clamp_main_pane_percent(main_pane_size_percent),
            main_pane_min_width,
            agent_pane_min_width,
        }
    }

    /// Width the main pane should occupy in a window `window_width` cells wide.
    pub fn main_pane_width(&self, window_width: u32) -> u32 {
        let percent = clamp_main_pane_percent(self.main_pane_size_percent);
        let by_percent = window_width * percent / 100;
        by_percent.max(self.main_pane_min_width).min(window_width)
    }

    /// Height of the main pane when it spans the top of the window.
    pub fn main_pane_height(&self, window_height: u32) -> u32 {
        window_height * clamp_main_pane_percent(self.main_pane_size_percent) / 100
    }

    /// Width left for agent panes once the main pane and its divider are placed.
    pub fn agent_area_width(&self, window_width: u32) -> u32 {
        window_width
            .saturating_sub(self.main_pane_width(window_width))
            .saturating_sub(DIVIDER_SIZE)
    }
}

pub fn clamp_main_pane_percent(percent: u32) -> u32 {
    percent.clamp(
        CapacityConfig::MIN_MAIN_PANE_PERCENT,
        CapacityConfig::MAX_MAIN_PANE_PERCENT,
    )
}

// ─── Sessions ─────────────────────────────────────────────────────

/// Read-only session → pane view consulted by the decision engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMapping {
    pub session_id: String,
    pub pane_id: String,
    pub created_at: DateTime<Utc>,
}

// ─── Actions & Decisions ──────────────────────────────────────────

/// One mutation of the window layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaneAction {
    Spawn {
        session_id: String,
        description: String,
        target_pane_id: String,
        split_direction: SplitDirection,
    },
    Close {
        pane_id: String,
        session_id: String,
    },
    Replace {
        pane_id: String,
        new_session_id: String,
        description: String,
        old_session_id: String,
    },
}

impl PaneAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "spawn",
            Self::Close { .. } => "close",
            Self::Replace { .. } => "replace",
        }
    }
}

/// Outcome of the decision engine. `actions` run in order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpawnDecision {
    pub can_spawn: bool,
    pub actions: Vec<PaneAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SpawnDecision {
    pub fn spawn(actions: Vec<PaneAction>) -> Self {
        Self {
            can_spawn: true,
            actions,
            reason: None,
        }
    }

    /// A positive decision that also explains an eviction.
    pub fn with_reason(actions: Vec<PaneAction>, reason: impl Into<String>) -> Self {
        Self {
            can_spawn: true,
            actions,
            reason: Some(reason.into()),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            can_spawn: false,
            actions: Vec::new(),
            reason: Some(reason.into()),
        }
    }
}
