//! panealloc-tmux: tmux IO boundary.
//! Subprocess execution, window snapshots, and the action executor that
//! turns pane actions into tmux commands. No allocation decisions here.

pub mod actions;
pub mod error;
pub mod executor;
pub mod window;

pub use actions::{ActionExecutor, ActionOutcome, AttachSettings, DEFAULT_ATTACH_COMMAND};
pub use error::TmuxError;
pub use executor::{TmuxCommandRunner, TmuxExecutor, TmuxSocket};
pub use window::{WINDOW_PANES_FORMAT, WindowPane, parse_window_panes, query_window_state};
