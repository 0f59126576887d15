//! panealloc: tmux pane allocator for agent sub-sessions.
//! One daemon per managed window; session events arrive over a UDS socket.

use clap::Parser;

mod cli;
mod client;
mod config;
mod daemon;
mod events;
mod manager;
mod server;
mod status;
mod ticker;

#[cfg(test)]
mod fake_tmux;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);

    match args.command {
        cli::Command::Daemon(opts) => {
            let filter = std::env::var("PANEALLOC_LOG")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string());
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .init();

            tracing::info!("panealloc daemon starting");
            daemon::run_daemon(opts, &socket_path).await?;
        }
        cli::Command::Status => {
            client::cmd_status(&socket_path).await?;
        }
        cli::Command::Created(opts) => {
            client::cmd_created(
                &socket_path,
                &opts.session_id,
                opts.parent.as_deref(),
                opts.title.as_deref(),
            )
            .await?;
        }
        cli::Command::Deleted(opts) => {
            client::cmd_deleted(&socket_path, &opts.session_id).await?;
        }
        cli::Command::StatusUpdate(opts) => {
            client::cmd_status_update(&socket_path, &opts.session_id, &opts.status).await?;
        }
    }

    Ok(())
}
