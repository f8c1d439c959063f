//! Tools Module
//!
//! One module per tool. Each exports a `register` function that adds its
//! descriptor to a registry and a `run` function that computes the result
//! from the call arguments. None of them perform I/O.

pub mod calculator;
pub mod file_search;
pub mod text_analysis;
pub mod weather;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::error::ToolError;
use crate::core::protocol::ToolResult;
use crate::core::registry::ToolKind;

/// Successful tool output: a human-readable line plus the structured payload
/// a chat client renders into a widget.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub structured: Map<String, Value>,
}

impl ToolOutput {
    pub fn into_tool_result(self) -> ToolResult {
        ToolResult::text(self.text, Some(self.structured))
    }
}

/// Run the handler for `kind` against the call arguments.
pub fn invoke(kind: ToolKind, arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
    match kind {
        ToolKind::Weather => weather::run(arguments),
        ToolKind::Calculator => calculator::run(arguments),
        ToolKind::TextAnalysis => text_analysis::run(arguments),
        ToolKind::FileSearch => file_search::run(arguments),
    }
}

/// Deserialize the argument map into a tool's argument record.
///
/// A type mismatch here is a contract violation, not a tool failure.
fn parse_args<T: DeserializeOwned>(arguments: &Map<String, Value>) -> Result<T, ToolError> {
    Ok(serde_json::from_value(Value::Object(arguments.clone()))?)
}

fn require(value: Option<String>, param: &str) -> Result<String, ToolError> {
    value.ok_or_else(|| ToolError::missing(param))
}

/// Payloads are always built with `json!({...})`, so anything else is empty.
fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
