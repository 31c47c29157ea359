//! Squall is a terminal chat client that bridges a local Ollama model with an
//! MCP tool server spawned as a subprocess.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`mcp`] provides Model Context Protocol integration: the stdio JSON-RPC
//!   client and the tool registry populated at handshake time.
//! - [`session`] owns the live connection (transport + registry) and exposes
//!   soft-failure tool invocation.
//! - [`router`] inspects user queries for the two weather trigger phrases and
//!   decides between a tool call and the chat-model fallback.
//! - [`api`] defines the chat payloads and performs the per-turn model call.
//! - [`chat_loop`] runs the sequential read-route-print cycle.
//!
//! The runtime entrypoint lives in the binary crate (`src/main.rs`), which
//! wires configuration, session establishment, and guaranteed shutdown around
//! [`chat_loop::run`].

pub mod api;
pub mod chat_loop;
pub mod core;
pub mod mcp;
pub mod router;
pub mod session;
