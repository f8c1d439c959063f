//! Tool Registry
//!
//! The registry is an explicitly constructed, immutable table of tool
//! descriptors. The server builds one at startup and shares it read-only;
//! tests build their own with whatever subset they need.

use serde::Serialize;
use serde_json::Value;

use crate::tools;

/// The closed set of tools this server knows how to run.
///
/// Handlers are selected by matching on this enum, so adding a tool without
/// a handler does not compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Weather,
    Calculator,
    TextAnalysis,
    FileSearch,
}

impl ToolKind {
    /// Stable wire name used in `tools/call` and `POST /tools/{name}`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Calculator => "calculator",
            Self::TextAnalysis => "text-analysis",
            Self::FileSearch => "file-search",
        }
    }
}

/// MCP tool definition structure.
///
/// Serialized as-is in `tools/list` and `GET /mcp/tools`.
#[derive(Serialize, Debug, Clone)]
pub struct ToolDescriptor {
    #[serde(skip)]
    pub kind: ToolKind,
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// JSON Schema defining the tool's input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// Status line shown by the chat client while the tool runs.
    #[serde(skip)]
    pub invoking: &'static str,
    /// Status line shown by the chat client once the tool returns.
    #[serde(skip)]
    pub invoked: &'static str,
}

impl ToolDescriptor {
    /// Widget template the chat client renders the structured result with.
    pub fn output_template(&self) -> String {
        format!("ui://widget/{}-widget.html", self.name)
    }
}

/// Result of resolving a tool name against a registry.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    Found(&'a ToolDescriptor),
    Unknown,
}

/// Ordered registry of available MCP tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The four built-in tools, in their fixed listing order.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        tools::weather::register(&mut registry);
        tools::calculator::register(&mut registry);
        tools::text_analysis::register(&mut registry);
        tools::file_search::register(&mut registry);
        registry
    }

    /// Register a tool. Re-registering a name replaces the earlier
    /// descriptor in place, keeping its position.
    pub fn register(&mut self, descriptor: ToolDescriptor) {
        match self.tools.iter_mut().find(|t| t.name == descriptor.name) {
            Some(existing) => *existing = descriptor,
            None => self.tools.push(descriptor),
        }
    }

    /// All descriptors in insertion order.
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn describe(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn resolve(&self, name: &str) -> Lookup<'_> {
        match self.describe(name) {
            Some(descriptor) => Lookup::Found(descriptor),
            None => Lookup::Unknown,
        }
    }
}
