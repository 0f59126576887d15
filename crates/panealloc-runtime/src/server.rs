//! UDS JSON-RPC server: minimal hand-rolled implementation.
//! Connection-per-request, newline-delimited JSON.
//!
//! Methods:
//! - `session.created` `{id, parentID?, title?}` → `{queued}`
//! - `session.deleted` `{sessionID}` → `{ok}`
//! - `session.status` `{sessionID, status}` → `{ok}`
//! - `list_sessions` → manager view

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

use crate::events::{SessionCreated, SessionDeleted, SessionStatusUpdate};
use crate::manager::PaneManager;
use crate::status::StatusRegistry;

const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

/// Shared handles every connection needs.
#[derive(Clone)]
pub struct ServerContext {
    pub manager: PaneManager,
    pub statuses: StatusRegistry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Run the UDS JSON-RPC server.
pub async fn run_server(socket_path: &str, ctx: ServerContext) -> anyhow::Result<()> {
    // Create socket directory with mode 0700
    let socket_dir = std::path::Path::new(socket_path)
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid socket path"))?;

    std::fs::create_dir_all(socket_dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700))?;
    }

    // Check for stale socket
    if std::path::Path::new(socket_path).exists() {
        if tokio::net::UnixStream::connect(socket_path).await.is_err() {
            std::fs::remove_file(socket_path)?;
            tracing::info!("removed stale socket at {socket_path}");
        } else {
            anyhow::bail!("another daemon is already running at {socket_path}");
        }
    }

    let listener = UnixListener::bind(socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!("UDS server listening on {socket_path}");

    loop {
        let (stream, _) = listener.accept().await?;
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, ctx).await {
                tracing::debug!("connection error: {e}");
            }
        });
    }
}

async fn handle_connection(
    stream: tokio::net::UnixStream,
    ctx: ServerContext,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let request: Value = serde_json::from_str(line.trim())?;
    let method = request["method"].as_str().unwrap_or("");
    let id = request["id"].clone();

    let response = match dispatch(&ctx, method, &request["params"]).await {
        Ok(result) => json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": id,
        }),
        Err(err) => {
            tracing::debug!(method, code = err.code, "rpc error: {}", err.message);
            json!({
                "jsonrpc": "2.0",
                "error": {"code": err.code, "message": err.message},
                "id": id,
            })
        }
    };
    let mut resp = serde_json::to_string(&response)?;
    resp.push('\n');
    writer.write_all(resp.as_bytes()).await?;

    Ok(())
}

pub(crate) async fn dispatch(
    ctx: &ServerContext,
    method: &str,
    params: &Value,
) -> Result<Value, RpcError> {
    match method {
        "session.created" => {
            let event: SessionCreated = parse_params(params)?;
            let queued = ctx.manager.session_created(&event);
            Ok(json!({"queued": queued}))
        }
        "session.deleted" => {
            let event: SessionDeleted = parse_params(params)?;
            ctx.statuses.remove(&event.session_id);
            ctx.manager.session_deleted(&event.session_id);
            Ok(json!({"ok": true}))
        }
        "session.status" => {
            let event: SessionStatusUpdate = parse_params(params)?;
            ctx.statuses.update(&event.session_id, &event.status, Utc::now());
            tracing::debug!(
                session_id = %event.session_id,
                status = %event.status,
                known = ctx.statuses.len(),
                "session status"
            );
            Ok(json!({"ok": true}))
        }
        "list_sessions" => {
            let view = ctx
                .manager
                .inspect()
                .await
                .ok_or_else(|| RpcError::new(INTERNAL_ERROR, "manager stopped"))?;
            let mut value = serde_json::to_value(view)
                .map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))?;
            if let Some(tracked) = value["tracked"].as_array_mut() {
                for entry in tracked {
                    let status = entry["session_id"]
                        .as_str()
                        .and_then(|id| ctx.statuses.get(id))
                        .map(|s| s.status);
                    entry["status"] = json!(status);
                }
            }
            Ok(value)
        }
        _ => Err(RpcError::new(METHOD_NOT_FOUND, "method not found")),
    }
}

fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T, RpcError> {
    serde_json::from_value(params.clone())
        .map_err(|e| RpcError::new(INVALID_PARAMS, format!("invalid params: {e}")))
}
