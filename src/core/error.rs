//! Error types shared by the tools, the dispatcher and the HTTP layer.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

/// Failure raised by a tool handler.
///
/// `InvalidArgument` and `Computation` are business-logic failures: the MCP
/// surface reports them inside a successful envelope with `isError: true`.
/// `MalformedArguments` means the arguments could not be read at all and is
/// reported as a protocol-level internal error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Computation(String),

    #[error("malformed arguments: {0}")]
    MalformedArguments(String),
}

impl ToolError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn missing(param: &str) -> Self {
        Self::InvalidArgument(format!("Missing required parameter: {param}"))
    }

    /// True when the failure is a broken handler contract rather than a
    /// tool-level failure.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::MalformedArguments(_))
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedArguments(e.to_string())
    }
}

impl ResponseError for ToolError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) | Self::Computation(_) => StatusCode::BAD_REQUEST,
            Self::MalformedArguments(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "detail": self.to_string()
        }))
    }
}

/// Invalid process configuration, detected at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer in range, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("invalid transport mode {0:?}; must be 'stdio', 'http', or 'both'")]
    InvalidTransport(String),
}
