//! Daemon wiring: config → executor → manager → UDS server, until a signal.

use panealloc_tmux::{ActionExecutor, TmuxExecutor};

use crate::cli::DaemonOpts;
use crate::config::{DaemonConfig, FileConfig, load_config, resolve};
use crate::manager::{ManagerSettings, PaneManager};
use crate::server::{self, ServerContext};
use crate::status::StatusRegistry;

pub async fn run_daemon(opts: DaemonOpts, socket_path: &str) -> anyhow::Result<()> {
    let file = match &opts.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let config = resolve(file, &opts)?;
    tracing::info!(
        pane = %config.attach.reference_pane,
        layout = %config.attach.capacity.layout,
        main_pane_size = config.attach.capacity.main_pane_size_percent,
        enabled = config.enabled,
        "configuration loaded"
    );

    let statuses = StatusRegistry::new();
    let settings = ManagerSettings {
        enabled: config.enabled,
        ..ManagerSettings::default()
    };
    let (manager, worker) = PaneManager::start(build_executor(&config), statuses.clone(), settings);

    // Start UDS server
    let ctx = ServerContext {
        manager: manager.clone(),
        statuses,
    };
    let server_socket = socket_path.to_string();
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server::run_server(&server_socket, ctx).await {
            tracing::error!("UDS server error: {e}");
        }
    });

    // Wait for shutdown signal (ctrl-c or SIGTERM)
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            tokio::select! {
                _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            tracing::info!("received ctrl-c, shutting down");
        }
    };

    tokio::select! {
        () = shutdown => {}
        _ = &mut server_handle => {
            tracing::warn!("server exited unexpectedly");
        }
    }

    server_handle.abort();
    manager.shutdown().await;
    if let Err(e) = worker.await {
        tracing::warn!("manager task failed: {e}");
    }

    // Cleanup socket
    let _ = std::fs::remove_file(socket_path);
    tracing::info!("daemon stopped");
    Ok(())
}

fn build_executor(config: &DaemonConfig) -> ActionExecutor<TmuxExecutor> {
    let mut tmux = TmuxExecutor::new(config.tmux_bin.clone());
    if let Some(socket) = &config.tmux_socket {
        tmux = tmux.with_socket(socket.clone());
    }
    ActionExecutor::new(tmux, config.attach.clone())
}
