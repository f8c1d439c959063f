//! Core Server Framework Module
//!
//! - config.rs: environment configuration
//! - error.rs: tool and configuration errors
//! - protocol.rs: JSON-RPC 2.0 envelopes and MCP tool results
//! - registry.rs: the tool registry
//! - dispatcher.rs: JSON-RPC method routing
//! - sse.rs: SSE keep-alive emitter
//! - server.rs: HTTP and STDIO transports

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod sse;
