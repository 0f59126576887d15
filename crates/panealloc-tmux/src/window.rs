//! Window snapshot: list the panes of one tmux window and derive its
//! main pane and agent panes.

use panealloc_core::{PaneInfo, WindowState};
use serde::{Deserialize, Serialize};

use crate::error::TmuxError;
use crate::executor::TmuxCommandRunner;

/// Tab-delimited format for `tmux list-panes -t <pane> -F`.
/// The title goes last so it may contain anything but a newline.
pub const WINDOW_PANES_FORMAT: &str = "#{pane_id}\t#{pane_width}\t#{pane_height}\t#{pane_left}\t#{pane_top}\t#{pane_active}\t#{window_width}\t#{window_height}\t#{pane_title}";

const FIELD_COUNT: usize = 9;

/// One parsed `list-panes` row, with the window size it was reported against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowPane {
    pub pane: PaneInfo,
    pub window_width: u32,
    pub window_height: u32,
}

/// Snapshot the window containing `reference_pane`.
///
/// Any failure (tmux unreachable, pane gone, garbage output) is an error; the
/// caller treats it as "no snapshot".
pub fn query_window_state(
    runner: &impl TmuxCommandRunner,
    reference_pane: &str,
) -> Result<WindowState, TmuxError> {
    let output = runner.run(&["list-panes", "-t", reference_pane, "-F", WINDOW_PANES_FORMAT])?;
    let rows = parse_window_panes(&output)?;
    build_window_state(rows, reference_pane)
}

pub fn parse_window_panes(output: &str) -> Result<Vec<WindowPane>, TmuxError> {
    let mut panes = Vec::new();
    for (idx, line) in output.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        panes.push(parse_line(line, idx + 1)?);
    }
    Ok(panes)
}

fn parse_line(line: &str, line_num: usize) -> Result<WindowPane, TmuxError> {
    let parts: Vec<&str> = line.splitn(FIELD_COUNT, '\t').collect();
    if parts.len() < FIELD_COUNT - 1 {
        return Err(TmuxError::ParseError {
            line_num,
            detail: format!(
                "expected at least {} tab-separated fields, got {}",
                FIELD_COUNT - 1,
                parts.len()
            ),
        });
    }

    let number = |idx: usize, name: &str| -> Result<u32, TmuxError> {
        parts[idx]
            .trim()
            .parse::<u32>()
            .map_err(|_| TmuxError::ParseError {
                line_num,
                detail: format!("invalid {name}: {:?}", parts[idx]),
            })
    };

    let id = parts[0].trim();
    if id.is_empty() {
        return Err(TmuxError::ParseError {
            line_num,
            detail: "empty pane id".to_string(),
        });
    }

    Ok(WindowPane {
        pane: PaneInfo {
            id: id.to_string(),
            width: number(1, "pane_width")?,
            height: number(2, "pane_height")?,
            left: number(3, "pane_left")?,
            top: number(4, "pane_top")?,
            title: parts.get(8).map(|s| s.to_string()).unwrap_or_default(),
            is_active: matches!(parts[5].trim(), "1" | "true"),
        },
        window_width: number(6, "window_width")?,
        window_height: number(7, "window_height")?,
    })
}

/// Split parsed rows into main pane and agent panes.
///
/// The main pane is the leftmost, then widest, then topmost pane; remaining
/// ties prefer `reference_pane`, then the lower pane id, so an unchanged
/// layout always yields the same main pane.
pub fn build_window_state(
    rows: Vec<WindowPane>,
    reference_pane: &str,
) -> Result<WindowState, TmuxError> {
    let Some(first) = rows.first() else {
        return Err(TmuxError::EmptyWindow(reference_pane.to_string()));
    };
    let (window_width, window_height) = (first.window_width, first.window_height);

    let mut panes: Vec<PaneInfo> = rows.into_iter().map(|r| r.pane).collect();
    panes.sort_by(|a, b| {
        a.left
            .cmp(&b.left)
            .then_with(|| b.width.cmp(&a.width))
            .then_with(|| a.top.cmp(&b.top))
            .then_with(|| (b.id == reference_pane).cmp(&(a.id == reference_pane)))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut panes = panes.into_iter();
    let main_pane = panes.next();
    let mut agent_panes: Vec<PaneInfo> = panes.collect();
    agent_panes.sort_by(|a, b| a.left.cmp(&b.left).then_with(|| a.top.cmp(&b.top)));

    Ok(WindowState {
        window_width,
        window_height,
        main_pane,
        agent_panes,
    })
}
