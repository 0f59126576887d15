//! Error types for the tmux backend.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("tmux command failed: {0}")]
    CommandFailed(String),

    #[error("failed to parse list-panes line {line_num}: {detail}")]
    ParseError { line_num: usize, detail: String },

    #[error("tmux reported no panes for {0}")]
    EmptyWindow(String),

    #[error("window has no main pane")]
    NoMainPane,

    #[error("tmux did not report the id of the new pane")]
    MissingPaneId,

    #[error("tmux io error: {0}")]
    Io(#[from] std::io::Error),
}
