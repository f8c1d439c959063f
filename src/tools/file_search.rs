//! File Search Tool Implementation
//!
//! Returns names built from fixed templates around the query; the filesystem
//! is never touched.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ToolOutput, into_map, parse_args, require, timestamp};
use crate::core::error::ToolError;
use crate::core::registry::{ToolDescriptor, ToolKind, ToolRegistry};

pub fn register(registry: &mut ToolRegistry) {
    registry.register(ToolDescriptor {
        kind: ToolKind::FileSearch,
        name: ToolKind::FileSearch.name(),
        title: "File Search",
        description: "Search for files in the system",
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query for files"
                },
                "file_type": {
                    "type": "string",
                    "description": "Optional file type filter (e.g., 'txt', 'pdf')"
                }
            },
            "required": ["query"]
        }),
        invoking: "Searching files...",
        invoked: "Search completed.",
    });
}

#[derive(Debug, Deserialize)]
struct FileSearchArgs {
    query: Option<String>,
    #[serde(alias = "fileType")]
    file_type: Option<String>,
}

/// Candidate names for `query`, in listing order.
pub fn candidates(query: &str) -> Vec<String> {
    vec![
        format!("document_{query}_1.txt"),
        format!("report_{query}_2024.pdf"),
        format!("data_{query}.csv"),
        format!("notes_{query}.md"),
    ]
}

/// Candidates whose name ends with `.<file_type>` (case-sensitive).
pub fn search(query: &str, file_type: Option<&str>) -> Vec<String> {
    let files = candidates(query);
    match file_type {
        Some(ext) => {
            let suffix = format!(".{ext}");
            files.into_iter().filter(|f| f.ends_with(&suffix)).collect()
        }
        None => files,
    }
}

pub fn run(arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
    let args: FileSearchArgs = parse_args(arguments)?;
    let query = require(args.query, "query")?;
    // an empty filter means no filter
    let file_type = args.file_type.filter(|t| !t.is_empty());

    let files = search(&query, file_type.as_deref());

    let mut text = format!("Found {} files matching '{query}'", files.len());
    if let Some(t) = &file_type {
        text.push_str(&format!(" with type '{t}'"));
    }
    text.push_str(&format!("\nFiles: {}", files.join(", ")));

    Ok(ToolOutput {
        text,
        structured: into_map(json!({
            "query": query,
            "file_type": file_type,
            "count": files.len(),
            "files": files,
            "timestamp": timestamp(),
        })),
    })
}
