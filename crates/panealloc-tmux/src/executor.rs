//! TmuxCommandRunner trait and TmuxExecutor (sync subprocess wrapper).

use std::sync::Arc;

use crate::error::TmuxError;

/// Runs one tmux command and returns its stdout. Mockable in tests.
pub trait TmuxCommandRunner: Send + Sync {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError>;

    /// Best-effort variant: failures are logged at debug level and reported as `false`.
    fn run_quiet(&self, args: &[&str]) -> bool {
        match self.run(args) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(command = ?args.first(), "tmux command ignored: {e}");
                false
            }
        }
    }
}

impl<T: TmuxCommandRunner + ?Sized> TmuxCommandRunner for &T {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        (**self).run(args)
    }
}

impl<T: TmuxCommandRunner + ?Sized> TmuxCommandRunner for Arc<T> {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        (**self).run(args)
    }
}

/// Which tmux server to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TmuxSocket {
    /// `tmux -S <path>`
    Path(String),
    /// `tmux -L <name>`
    Name(String),
}

/// Real tmux executor using `std::process::Command`.
#[derive(Debug, Clone)]
pub struct TmuxExecutor {
    tmux_bin: String,
    socket: Option<TmuxSocket>,
}

impl TmuxExecutor {
    pub fn new(tmux_bin: impl Into<String>) -> Self {
        Self {
            tmux_bin: tmux_bin.into(),
            socket: None,
        }
    }

    #[must_use]
    pub fn with_socket(mut self, socket: TmuxSocket) -> Self {
        self.socket = Some(socket);
        self
    }

    pub fn tmux_bin(&self) -> &str {
        &self.tmux_bin
    }

    fn command(&self, args: &[&str]) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.tmux_bin);
        match &self.socket {
            Some(TmuxSocket::Path(path)) => {
                cmd.args(["-S", path]);
            }
            Some(TmuxSocket::Name(name)) => {
                cmd.args(["-L", name]);
            }
            None => {}
        }
        cmd.args(args);
        cmd
    }
}

impl Default for TmuxExecutor {
    fn default() -> Self {
        Self::new("tmux")
    }
}

impl TmuxCommandRunner for TmuxExecutor {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        let output = self.command(args).output().map_err(TmuxError::Io)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TmuxError::CommandFailed(format!(
                "{} exited with code {}: {}",
                args.first().copied().unwrap_or("tmux"),
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
