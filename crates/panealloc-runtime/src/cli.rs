//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use panealloc_core::LayoutKind;

#[derive(Parser)]
#[command(name = "panealloc", about = "tmux pane allocator for agent sessions")]
pub struct Cli {
    /// UDS socket path (default: $XDG_RUNTIME_DIR/panealloc/panealloc.sock)
    #[arg(long, short = 's', global = true)]
    pub socket_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the allocator next to the main pane
    Daemon(DaemonOpts),
    /// Show tracked, deferred and pending sessions (JSON)
    Status,
    /// Report a created session
    Created(CreatedOpts),
    /// Report a deleted session
    Deleted(DeletedOpts),
    /// Report a session status change
    StatusUpdate(StatusUpdateOpts),
}

#[derive(clap::Args, Default)]
pub struct DaemonOpts {
    /// TOML config file with a [tmux] table
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// tmux binary
    #[arg(long)]
    pub tmux_bin: Option<String>,

    /// tmux socket: a path, or a name as for `tmux -L`
    #[arg(long)]
    pub tmux_socket: Option<String>,

    /// Main pane of the managed window
    #[arg(long, env = "TMUX_PANE")]
    pub pane: Option<String>,

    /// Agent server URL passed to the attach command
    #[arg(long, env = "PANEALLOC_SERVER_URL")]
    pub server_url: Option<String>,

    /// grid, main-vertical or main-horizontal
    #[arg(long)]
    pub layout: Option<LayoutKind>,

    /// Main pane size in percent (20-80)
    #[arg(long)]
    pub main_pane_size: Option<u32>,
}

#[derive(clap::Args)]
pub struct CreatedOpts {
    pub session_id: String,

    /// Parent session; sessions without one are not given a pane
    #[arg(long)]
    pub parent: Option<String>,

    #[arg(long)]
    pub title: Option<String>,
}

#[derive(clap::Args)]
pub struct DeletedOpts {
    pub session_id: String,
}

#[derive(clap::Args)]
pub struct StatusUpdateOpts {
    pub session_id: String,
    pub status: String,
}

/// Default socket path using $USER for per-user isolation.
pub fn default_socket_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return format!("{dir}/panealloc/panealloc.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    format!("/tmp/panealloc-{user}/panealloc.sock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_daemon_overrides() {
        let cli = Cli::try_parse_from([
            "panealloc",
            "daemon",
            "--pane",
            "%3",
            "--layout",
            "main-vertical",
            "--main-pane-size",
            "70",
        ])
        .expect("parse");
        let Command::Daemon(opts) = cli.command else {
            panic!("expected daemon");
        };
        assert_eq!(opts.pane.as_deref(), Some("%3"));
        assert_eq!(opts.layout, Some(LayoutKind::MainVertical));
        assert_eq!(opts.main_pane_size, Some(70));
    }

    #[test]
    fn rejects_unknown_layout() {
        assert!(Cli::try_parse_from(["panealloc", "daemon", "--layout", "tiled"]).is_err());
    }

    #[test]
    fn parses_created_event() {
        let cli = Cli::try_parse_from([
            "panealloc",
            "-s",
            "/tmp/x.sock",
            "created",
            "ses_2",
            "--parent",
            "ses_1",
        ])
        .expect("parse");
        assert_eq!(cli.socket_path.as_deref(), Some("/tmp/x.sock"));
        let Command::Created(opts) = cli.command else {
            panic!("expected created");
        };
        assert_eq!(opts.session_id, "ses_2");
        assert_eq!(opts.parent.as_deref(), Some("ses_1"));
        assert!(opts.title.is_none());
    }
}
