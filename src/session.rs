//! Session lifecycle: spawn the tool provider, run the handshake, populate
//! the registry, and invoke tools with soft-failure semantics.

use crate::mcp::client::StdioClient;
use crate::mcp::registry::ToolRegistry;
use rust_mcp_schema::{CallToolResult, ContentBlock};
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Interpreter used to spawn the tool provider script.
const SERVER_COMMAND: &str = "python3";

/// Errors that abort startup before the chat loop begins. Everything that can
/// go wrong after startup is surfaced as user-visible text instead.
#[derive(Debug)]
pub enum SetupError {
    /// The server target is not a script type we know how to spawn.
    InvalidServerTarget { path: PathBuf },
    /// Spawning the subprocess or completing the handshake failed.
    SessionEstablishment { message: String },
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::InvalidServerTarget { path } => {
                write!(
                    f,
                    "Server script must be a Python (.py) file: {}",
                    path.display()
                )
            }
            SetupError::SessionEstablishment { message } => {
                write!(f, "Failed to establish MCP session: {message}")
            }
        }
    }
}

impl StdError for SetupError {}

/// The live connection state for one run of the client: the stdio transport
/// plus the tool registry populated at handshake time.
pub struct Session {
    client: Arc<StdioClient>,
    registry: ToolRegistry,
}

impl Session {
    /// Spawns the tool provider, runs the initialize handshake, and fetches
    /// the tool list. Prints the discovered tool names on success. On any
    /// failure after the spawn, the subprocess is torn down before returning.
    pub async fn connect(server_script: &Path) -> Result<Self, SetupError> {
        validate_server_target(server_script)?;

        let client = StdioClient::spawn(SERVER_COMMAND, server_script)
            .await
            .map_err(establishment_failure)?;

        let init = match client.initialize().await {
            Ok(init) => init,
            Err(message) => {
                client.shutdown().await;
                return Err(establishment_failure(message));
            }
        };
        debug!(
            server = %init.server_info.name,
            version = %init.server_info.version,
            protocol = %init.protocol_version,
            "MCP session initialized"
        );

        let tools = match client.list_tools().await {
            Ok(tools) => tools,
            Err(message) => {
                client.shutdown().await;
                return Err(establishment_failure(message));
            }
        };
        let registry = ToolRegistry::from_list(tools);
        println!("\nConnected to server with tools: {:?}", registry.names());

        Ok(Self { client, registry })
    }

    /// Invokes a tool and normalizes the outcome to text. Never fails: an
    /// unknown tool or a failed remote call becomes a user-visible message so
    /// the chat loop keeps running.
    pub async fn invoke_tool(&self, name: &str, arguments: Map<String, Value>) -> String {
        if !self.registry.contains(name) {
            return format!("Tool {name} not available.");
        }
        match self.client.call_tool(name, arguments).await {
            Ok(result) => flatten_tool_result(&result),
            Err(message) => format!("Error calling tool {name}: {message}"),
        }
    }

    /// Releases the subprocess and transport. Idempotent.
    pub async fn shutdown(&self) {
        self.client.shutdown().await;
    }
}

fn validate_server_target(path: &Path) -> Result<(), SetupError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("py") => Ok(()),
        _ => Err(SetupError::InvalidServerTarget {
            path: path.to_path_buf(),
        }),
    }
}

fn establishment_failure(message: String) -> SetupError {
    SetupError::SessionEstablishment { message }
}

/// Joins the result's content blocks with newlines: text blocks verbatim,
/// anything else through its JSON representation.
fn flatten_tool_result(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .map(content_block_to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn content_block_to_string(block: &ContentBlock) -> String {
    match block {
        ContentBlock::TextContent(text) => text.text.clone(),
        other => serde_json::to_string(other)
            .unwrap_or_else(|_| "Unsupported tool content.".to_string()),
    }
}
