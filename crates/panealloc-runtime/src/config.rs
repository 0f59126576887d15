//! Daemon configuration: an optional TOML file with a `[tmux]` table,
//! overridden by command-line flags.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use panealloc_core::{CapacityConfig, LayoutKind};
use panealloc_tmux::{AttachSettings, DEFAULT_ATTACH_COMMAND, TmuxSocket};

use crate::cli::DaemonOpts;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:4096";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Contents of the config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub tmux: TmuxTable,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TmuxTable {
    pub enabled: bool,
    pub layout: LayoutKind,
    pub main_pane_size: u32,
    pub main_pane_min_width: u32,
    pub agent_pane_min_width: u32,
    pub server_url: Option<String>,
    pub attach_command: Option<String>,
    pub tmux_bin: Option<String>,
    pub tmux_socket: Option<String>,
}

impl Default for TmuxTable {
    fn default() -> Self {
        let capacity = CapacityConfig::default();
        Self {
            enabled: true,
            layout: capacity.layout,
            main_pane_size: capacity.main_pane_size_percent,
            main_pane_min_width: capacity.main_pane_min_width,
            agent_pane_min_width: capacity.agent_pane_min_width,
            server_url: None,
            attach_command: None,
            tmux_bin: None,
            tmux_socket: None,
        }
    }
}

/// Fully resolved daemon settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    pub enabled: bool,
    pub tmux_bin: String,
    pub tmux_socket: Option<TmuxSocket>,
    pub attach: AttachSettings,
}

pub fn parse_config(text: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
}

/// Merge flags over the file and validate the result.
pub fn resolve(file: FileConfig, opts: &DaemonOpts) -> Result<DaemonConfig, ConfigError> {
    let table = file.tmux;

    let reference_pane = opts
        .pane
        .clone()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| {
            ConfigError::Invalid("no main pane: run inside tmux or pass --pane".to_string())
        })?;

    let requested = opts.main_pane_size.unwrap_or(table.main_pane_size);
    let (min, max) = (
        CapacityConfig::MIN_MAIN_PANE_PERCENT,
        CapacityConfig::MAX_MAIN_PANE_PERCENT,
    );
    if !(min..=max).contains(&requested) {
        tracing::warn!(
            requested,
            min,
            max,
            "main pane size out of range, clamping"
        );
    }
    if table.main_pane_min_width == 0 || table.agent_pane_min_width == 0 {
        return Err(ConfigError::Invalid(
            "pane minimum widths must be positive".to_string(),
        ));
    }

    let capacity = CapacityConfig::new(
        opts.layout.unwrap_or(table.layout),
        requested,
        table.main_pane_min_width,
        table.agent_pane_min_width,
    );

    let attach_command = table
        .attach_command
        .unwrap_or_else(|| DEFAULT_ATTACH_COMMAND.to_string());
    if !attach_command.contains("{session_id}") {
        return Err(ConfigError::Invalid(
            "attach_command must contain {session_id}".to_string(),
        ));
    }

    let server_url = opts
        .server_url
        .clone()
        .or(table.server_url)
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

    let tmux_socket = opts
        .tmux_socket
        .clone()
        .or(table.tmux_socket)
        .map(|s| {
            if s.contains('/') {
                TmuxSocket::Path(s)
            } else {
                TmuxSocket::Name(s)
            }
        });

    Ok(DaemonConfig {
        enabled: table.enabled,
        tmux_bin: opts
            .tmux_bin
            .clone()
            .or(table.tmux_bin)
            .unwrap_or_else(|| "tmux".to_string()),
        tmux_socket,
        attach: AttachSettings {
            reference_pane,
            capacity,
            server_url,
            attach_command,
        },
    })
}
