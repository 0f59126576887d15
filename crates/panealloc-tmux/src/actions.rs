//! Action executor: apply a decided [`PaneAction`] to tmux.
//!
//! Every successful topology change is followed by re-asserting the main
//! pane size against a fresh snapshot, since the geometry the decision was
//! made on is stale by then.

use panealloc_core::{CapacityConfig, LayoutKind, PaneAction, SplitDirection, WindowState};
use serde::{Deserialize, Serialize};

use crate::error::TmuxError;
use crate::executor::TmuxCommandRunner;
use crate::window::query_window_state;

/// Command run inside a new agent pane. `{server_url}` and `{session_id}`
/// are substituted shell-quoted.
pub const DEFAULT_ATTACH_COMMAND: &str = "opencode attach {server_url} --session {session_id}";

const MAX_TITLE_CHARS: usize = 30;

/// Everything the executor needs besides the action itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachSettings {
    /// Pane the daemon runs next to; identifies the managed window.
    pub reference_pane: String,
    pub capacity: CapacityConfig,
    pub server_url: String,
    pub attach_command: String,
}

impl AttachSettings {
    pub fn command_for(&self, session_id: &str) -> String {
        self.attach_command
            .replace("{server_url}", &shell_quote(&self.server_url))
            .replace("{session_id}", &shell_quote(session_id))
    }
}

/// Result of one executor call. A failed spawn may still report the id of a
/// partially created pane so the caller can close it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub pane_id: Option<String>,
}

impl ActionOutcome {
    fn ok(pane_id: impl Into<String>) -> Self {
        Self {
            success: true,
            pane_id: Some(pane_id.into()),
        }
    }

    fn failed(pane_id: Option<String>) -> Self {
        Self {
            success: false,
            pane_id,
        }
    }
}

pub struct ActionExecutor<R> {
    runner: R,
    settings: AttachSettings,
}

impl<R: TmuxCommandRunner> ActionExecutor<R> {
    pub fn new(runner: R, settings: AttachSettings) -> Self {
        Self { runner, settings }
    }

    pub fn settings(&self) -> &AttachSettings {
        &self.settings
    }

    /// Fresh snapshot of the managed window.
    pub fn snapshot(&self) -> Result<WindowState, TmuxError> {
        query_window_state(&self.runner, &self.settings.reference_pane)
    }

    pub fn execute(&self, action: &PaneAction) -> ActionOutcome {
        match action {
            PaneAction::Spawn {
                session_id,
                description,
                target_pane_id,
                split_direction,
            } => self.spawn(session_id, description, target_pane_id, *split_direction),
            PaneAction::Close { pane_id, .. } => {
                if self.close(pane_id) {
                    ActionOutcome::ok(pane_id.clone())
                } else {
                    ActionOutcome::failed(None)
                }
            }
            PaneAction::Replace {
                pane_id,
                new_session_id,
                description,
                ..
            } => self.replace(pane_id, new_session_id, description),
        }
    }

    /// Split `target_pane_id` and attach `session_id` in the new pane.
    pub fn spawn(
        &self,
        session_id: &str,
        description: &str,
        target_pane_id: &str,
        direction: SplitDirection,
    ) -> ActionOutcome {
        let command = self.settings.command_for(session_id);
        let output = match self.runner.run(&[
            "split-window",
            direction.as_flag(),
            "-d",
            "-P",
            "-F",
            "#{pane_id}",
            "-t",
            target_pane_id,
            &command,
        ]) {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(session_id, target_pane_id, "split-window failed: {e}");
                return ActionOutcome::failed(None);
            }
        };

        let pane_id = output.trim();
        if pane_id.is_empty() {
            tracing::warn!(session_id, "{}", TmuxError::MissingPaneId);
            return ActionOutcome::failed(None);
        }

        if let Err(e) = self.set_title(pane_id, description) {
            tracing::warn!(session_id, pane_id, "could not title new pane: {e}");
            return ActionOutcome::failed(Some(pane_id.to_string()));
        }

        tracing::info!(
            session_id,
            pane_id,
            target_pane_id,
            direction = %direction,
            "spawned agent pane"
        );
        self.after_topology_change();
        ActionOutcome::ok(pane_id)
    }

    /// Interrupt the pane's process, then kill the pane.
    pub fn close(&self, pane_id: &str) -> bool {
        self.runner.run_quiet(&["send-keys", "-t", pane_id, "C-c"]);
        match self.runner.run(&["kill-pane", "-t", pane_id]) {
            Ok(_) => {
                tracing::info!(pane_id, "closed agent pane");
                self.after_topology_change();
                true
            }
            Err(e) => {
                tracing::warn!(pane_id, "kill-pane failed: {e}");
                false
            }
        }
    }

    /// Reuse `pane_id` for `new_session_id` without changing the layout.
    pub fn replace(&self, pane_id: &str, new_session_id: &str, description: &str) -> ActionOutcome {
        let command = self.settings.command_for(new_session_id);
        if let Err(e) = self
            .runner
            .run(&["respawn-pane", "-k", "-t", pane_id, &command])
        {
            tracing::warn!(pane_id, new_session_id, "respawn-pane failed: {e}");
            return ActionOutcome::failed(None);
        }
        if let Err(e) = self.set_title(pane_id, description) {
            tracing::debug!(pane_id, "could not retitle replaced pane: {e}");
        }
        tracing::info!(pane_id, new_session_id, "replaced agent pane");
        self.after_topology_change();
        ActionOutcome::ok(pane_id)
    }

    /// Re-assert the configured main pane size on the current layout.
    pub fn enforce_main_pane_width(&self) -> Result<(), TmuxError> {
        let state = self.snapshot()?;
        let main = state.main_pane.as_ref().ok_or(TmuxError::NoMainPane)?;
        if state.agent_panes.is_empty() {
            return Ok(());
        }

        let capacity = &self.settings.capacity;
        let main_width = capacity.main_pane_width(state.window_width);

        let current_width = match capacity.layout {
            LayoutKind::MainHorizontal => {
                let height = capacity.main_pane_height(state.window_height).to_string();
                self.runner
                    .run(&["set-window-option", "-t", &main.id, "main-pane-height", &height])?;
                self.runner
                    .run(&["select-layout", "-t", &main.id, "main-horizontal"])?;
                return Ok(());
            }
            LayoutKind::MainVertical => {
                let width = main_width.to_string();
                self.runner
                    .run(&["set-window-option", "-t", &main.id, "main-pane-width", &width])?;
                self.runner
                    .run(&["select-layout", "-t", &main.id, "main-vertical"])?;
                // select-layout reflows every pane; compare against the new geometry.
                let relaid = self.snapshot()?;
                relaid.main_pane.ok_or(TmuxError::NoMainPane)?.width
            }
            LayoutKind::Grid => main.width,
        };

        if current_width != main_width {
            let width = main_width.to_string();
            self.runner
                .run(&["resize-pane", "-t", &main.id, "-x", &width])?;
            tracing::debug!(pane_id = %main.id, width = main_width, "resized main pane");
        }
        Ok(())
    }

    fn after_topology_change(&self) {
        if let Err(e) = self.enforce_main_pane_width() {
            tracing::warn!("could not enforce main pane width: {e}");
        }
    }

    fn set_title(&self, pane_id: &str, description: &str) -> Result<(), TmuxError> {
        let title = pane_title(description);
        self.runner
            .run(&["select-pane", "-t", pane_id, "-T", &title])
            .map(|_| ())
    }
}

fn pane_title(description: &str) -> String {
    let trimmed = description.trim();
    if trimmed.chars().count() <= MAX_TITLE_CHARS {
        return trimmed.to_string();
    }
    let mut title: String = trimmed.chars().take(MAX_TITLE_CHARS - 1).collect();
    title.push('\u{2026}');
    title
}

/// Single-quote `s` for `sh -c`.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
