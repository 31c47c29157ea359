//! Stdio JSON-RPC client for a spawned MCP server process.
//!
//! One request is in flight at a time from the chat loop's perspective, but
//! responses are matched by request id through a pending map so the reader
//! task never has to care about ordering.

use rust_mcp_schema::schema_utils::{
    ClientMessage, FromMessage, MessageFromClient, NotificationFromClient, RequestFromClient,
    ServerMessage,
};
use rust_mcp_schema::{
    CallToolRequestParams, CallToolResult, ClientCapabilities, Implementation,
    InitializeRequestParams, InitializeResult, ListToolsResult, RequestId, RpcError,
    LATEST_PROTOCOL_VERSION,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::debug;

/// Pending request map plus a closed flag so requests issued after the server
/// goes away fail immediately instead of waiting on a reply that will never
/// arrive.
#[derive(Default)]
struct PendingState {
    requests: HashMap<RequestId, oneshot::Sender<ServerMessage>>,
    closed: bool,
}

pub struct StdioClient {
    stdin: Mutex<ChildStdin>,
    child: Mutex<Option<Child>>,
    pending: Arc<Mutex<PendingState>>,
    next_request_id: AtomicI64,
}

impl StdioClient {
    /// Spawns `command script` with piped stdio and starts the reader tasks.
    /// No handshake happens here; callers run [`StdioClient::initialize`].
    /// Orderly teardown goes through [`StdioClient::shutdown`]; the child is
    /// additionally killed on drop so an unwinding exit cannot orphan it.
    pub async fn spawn(command: &str, script: &Path) -> Result<Arc<Self>, String> {
        debug!(command = %command, script = %script.display(), "Starting MCP stdio server");
        let mut cmd = Command::new(command);
        cmd.arg(script)
            .kill_on_drop(true)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = cmd.spawn().map_err(|err| err.to_string())?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| "Unable to retrieve stdin.".to_string())?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| "Unable to retrieve stdout.".to_string())?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| "Unable to retrieve stderr.".to_string())?;

        let pending: Arc<Mutex<PendingState>> = Arc::new(Mutex::new(PendingState::default()));
        let client = Arc::new(Self {
            stdin: Mutex::new(stdin),
            child: Mutex::new(Some(child)),
            pending: pending.clone(),
            next_request_id: AtomicI64::new(0),
        });

        Self::spawn_stdout_reader(pending, stdout);
        Self::spawn_stderr_drain(stderr);

        Ok(client)
    }

    fn spawn_stdout_reader(pending: Arc<Mutex<PendingState>>, stdout: tokio::process::ChildStdout) {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                let value = match serde_json::from_str::<Value>(&line) {
                    Ok(value) => value,
                    Err(_) => continue,
                };
                if let Some(items) = value.as_array() {
                    for item in items {
                        if let Ok(message) = serde_json::from_value::<ServerMessage>(item.clone()) {
                            Self::dispatch_message(&pending, message).await;
                        }
                    }
                } else if let Ok(message) = serde_json::from_value::<ServerMessage>(value) {
                    Self::dispatch_message(&pending, message).await;
                }
            }
            // Server stdout closed: fail every waiter and reject new requests.
            let mut pending = pending.lock().await;
            pending.closed = true;
            pending.requests.clear();
        });
    }

    fn spawn_stderr_drain(stderr: tokio::process::ChildStderr) {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                debug!(stderr = %line, "MCP server stderr");
            }
        });
    }

    async fn dispatch_message(pending: &Arc<Mutex<PendingState>>, message: ServerMessage) {
        match &message {
            ServerMessage::Response(response) => {
                debug!(response_id = ?response.id, "Received MCP stdio response");
                if let Some(tx) = pending.lock().await.requests.remove(&response.id) {
                    let _ = tx.send(message);
                }
            }
            ServerMessage::Error(error) => {
                debug!(
                    error_id = ?error.id,
                    error_code = error.error.code,
                    "Received MCP stdio error"
                );
                if let Some(id) = error.id.as_ref() {
                    if let Some(tx) = pending.lock().await.requests.remove(id) {
                        let _ = tx.send(message);
                    }
                }
            }
            ServerMessage::Request(request) => {
                // No server-request surface in this client; log and move on.
                debug!(method = %request.method(), "Ignoring MCP server request");
            }
            ServerMessage::Notification(_) => {
                debug!("Received MCP stdio notification");
            }
        }
    }

    fn next_request_id(&self) -> RequestId {
        let id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        RequestId::Integer(id)
    }

    pub async fn send_request(&self, request: RequestFromClient) -> Result<ServerMessage, String> {
        let request_id = self.next_request_id();
        let message = ClientMessage::from_message(
            MessageFromClient::RequestFromClient(request),
            Some(request_id.clone()),
        )
        .map_err(|err| err.to_string())?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if pending.closed {
                return Err("MCP server closed the connection.".to_string());
            }
            pending.requests.insert(request_id.clone(), tx);
        }

        debug!(request_id = ?request_id, "Sending MCP stdio request");
        if let Err(err) = self.write_message(&message).await {
            self.pending.lock().await.requests.remove(&request_id);
            return Err(err);
        }

        rx.await
            .map_err(|_| "MCP stdio response channel closed.".to_string())
    }

    pub async fn send_notification(
        &self,
        notification: NotificationFromClient,
    ) -> Result<(), String> {
        let message =
            ClientMessage::from_message(MessageFromClient::NotificationFromClient(notification), None)
                .map_err(|err| err.to_string())?;
        self.write_message(&message).await
    }

    async fn write_message(&self, message: &ClientMessage) -> Result<(), String> {
        let payload = serde_json::to_string(message).map_err(|err| err.to_string())?;
        let mut stdin = self.stdin.lock().await;
        debug!(bytes = payload.len(), "Writing MCP stdio client message");
        stdin
            .write_all(payload.as_bytes())
            .await
            .map_err(|err| err.to_string())?;
        stdin.write_all(b"\n").await.map_err(|err| err.to_string())?;
        stdin.flush().await.map_err(|err| err.to_string())?;
        Ok(())
    }

    /// Runs the MCP handshake: `initialize` request followed by the
    /// `initialized` notification.
    pub async fn initialize(&self) -> Result<InitializeResult, String> {
        let response = self
            .send_request(RequestFromClient::InitializeRequest(client_details()))
            .await?;
        let result = parse_initialize_result(response)?;
        self.send_notification(NotificationFromClient::InitializedNotification(None))
            .await?;
        Ok(result)
    }

    pub async fn list_tools(&self) -> Result<ListToolsResult, String> {
        let response = self
            .send_request(RequestFromClient::ListToolsRequest(None))
            .await?;
        parse_list_tools(response)
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, String> {
        let mut params = CallToolRequestParams::new(name);
        if !arguments.is_empty() {
            params = params.with_arguments(arguments);
        }
        let response = self
            .send_request(RequestFromClient::CallToolRequest(params))
            .await?;
        parse_call_tool(response)
    }

    /// Kills and reaps the server process. The child handle is consumed, so a
    /// second call is a no-op.
    pub async fn shutdown(&self) {
        let child = self.child.lock().await.take();
        if let Some(mut child) = child {
            debug!("Stopping MCP stdio server");
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        let mut pending = self.pending.lock().await;
        pending.closed = true;
        pending.requests.clear();
    }
}

fn client_details() -> InitializeRequestParams {
    InitializeRequestParams {
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "squall".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some("Squall MCP Client".to_string()),
            description: None,
            icons: Vec::new(),
            website_url: None,
        },
        meta: None,
        protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
    }
}

pub(crate) fn parse_initialize_result(message: ServerMessage) -> Result<InitializeResult, String> {
    let value = parse_response_value(message)?;
    let result =
        serde_json::from_value::<InitializeResult>(value).map_err(|err| err.to_string())?;
    if result.protocol_version.trim().is_empty() {
        return Err("Unexpected initialize response.".to_string());
    }
    Ok(result)
}

pub(crate) fn parse_list_tools(message: ServerMessage) -> Result<ListToolsResult, String> {
    let value = parse_response_value(message)?;
    serde_json::from_value::<ListToolsResult>(value).map_err(|err| err.to_string())
}

pub(crate) fn parse_call_tool(message: ServerMessage) -> Result<CallToolResult, String> {
    let value = parse_response_value(message)?;
    serde_json::from_value::<CallToolResult>(value).map_err(|err| err.to_string())
}

fn parse_response_value(message: ServerMessage) -> Result<Value, String> {
    match message {
        ServerMessage::Response(response) => {
            serde_json::to_value(&response.result).map_err(|err| err.to_string())
        }
        ServerMessage::Error(error) => Err(format_rpc_error(&error.error)),
        other => Err(format!("Unexpected MCP server message: {other:?}")),
    }
}

fn format_rpc_error(error: &RpcError) -> String {
    let mut output = format!("MCP error {}: {}", error.code, error.message);
    if let Some(data) = &error.data {
        if let Some(details) = data.as_str() {
            if !details.is_empty() {
                output.push('\n');
                output.push_str(details);
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_initialize_rejects_blank_protocol_version() {
        let message = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 0,
            "result": {
                "capabilities": {},
                "protocolVersion": " ",
                "serverInfo": {"name": "weather", "version": "0.1.0"}
            }
        }))
        .expect("message should parse");

        assert!(parse_initialize_result(message).is_err());
    }

    #[test]
    fn parse_list_tools_extracts_names() {
        let message = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "tools": [
                    {"name": "get_alerts", "inputSchema": {"type": "object"}},
                    {"name": "get_forecast", "inputSchema": {"type": "object"}}
                ]
            }
        }))
        .expect("message should parse");

        let list = parse_list_tools(message).expect("tools should parse");
        let names: Vec<&str> = list.tools.iter().map(|tool| tool.name.as_str()).collect();
        assert_eq!(names, vec!["get_alerts", "get_forecast"]);
    }

    #[test]
    fn parse_call_tool_surfaces_rpc_errors() {
        let message = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 2,
            "error": {"code": -32602, "message": "Invalid state code"}
        }))
        .expect("message should parse");

        let err = parse_call_tool(message).expect_err("expected rpc error");
        assert_eq!(err, "MCP error -32602: Invalid state code");
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_fails_later_requests() {
        let client = StdioClient::spawn("true", Path::new("/dev/null"))
            .await
            .expect("spawn");

        client.shutdown().await;
        // Second call finds no child handle left to release.
        client.shutdown().await;

        let err = client
            .send_request(RequestFromClient::PingRequest(None))
            .await
            .expect_err("expected closed-connection error");
        assert_eq!(err, "MCP server closed the connection.");
    }

    #[test]
    fn rpc_error_appends_string_data() {
        let error: RpcError = serde_json::from_value(serde_json::json!({
            "code": -32000,
            "message": "boom",
            "data": "stack trace here"
        }))
        .expect("error should parse");
        assert_eq!(format_rpc_error(&error), "MCP error -32000: boom\nstack trace here");
    }
}
