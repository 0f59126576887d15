//! UDS JSON-RPC client for CLI subcommands.

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub(crate) async fn rpc_call(
    socket_path: &str,
    method: &str,
    params: Value,
) -> anyhow::Result<Value> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot connect to daemon at {socket_path}: {e}"))?;

    let (reader, mut writer) = stream.into_split();

    let request = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });
    let mut req = serde_json::to_string(&request)?;
    req.push('\n');
    writer.write_all(req.as_bytes()).await?;
    writer.shutdown().await?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let response: Value = serde_json::from_str(line.trim())?;

    if let Some(error) = response.get("error") {
        anyhow::bail!("RPC error: {error}");
    }

    Ok(response["result"].clone())
}

/// `panealloc status`: pretty-printed manager view.
pub async fn cmd_status(socket_path: &str) -> anyhow::Result<()> {
    let view = rpc_call(socket_path, "list_sessions", json!({})).await?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

pub async fn cmd_created(
    socket_path: &str,
    session_id: &str,
    parent: Option<&str>,
    title: Option<&str>,
) -> anyhow::Result<()> {
    let params = created_params(session_id, parent, title);
    let result = rpc_call(socket_path, "session.created", params).await?;
    if result["queued"].as_bool() != Some(true) {
        eprintln!("session {session_id} ignored");
    }
    Ok(())
}

pub async fn cmd_deleted(socket_path: &str, session_id: &str) -> anyhow::Result<()> {
    rpc_call(socket_path, "session.deleted", json!({"sessionID": session_id})).await?;
    Ok(())
}

pub async fn cmd_status_update(
    socket_path: &str,
    session_id: &str,
    status: &str,
) -> anyhow::Result<()> {
    rpc_call(
        socket_path,
        "session.status",
        json!({"sessionID": session_id, "status": status}),
    )
    .await?;
    Ok(())
}

fn created_params(session_id: &str, parent: Option<&str>, title: Option<&str>) -> Value {
    let mut params = json!({"id": session_id});
    if let Some(parent) = parent {
        params["parentID"] = json!(parent);
    }
    if let Some(title) = title {
        params["title"] = json!(title);
    }
    params
}
