//! MCP tool server.
//!
//! Exposes four mock tools (weather, calculator, text analysis, file search)
//! over a REST interface and a JSON-RPC 2.0 Model Context Protocol surface,
//! with an SSE keep-alive stream and an optional STDIO transport.

pub mod core;
pub mod tools;
