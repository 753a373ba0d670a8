//! Error taxonomy shared by every tool.

use serde_json::{json, Value};
use thiserror::Error;

/// Error codes AWS services use to signal a missing resource.
const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchKey",
    "NoSuchBucket",
    "NotFound",
    "ResourceNotFoundException",
    "ParameterNotFound",
    "ExecutionDoesNotExist",
    "StateMachineDoesNotExist",
];

/// A failed call to an AWS service, carrying the service's own error code and message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{service}.{operation} failed{}: {code} - {message}", status_suffix(.status))]
pub struct UpstreamError {
    pub service: String,
    pub operation: String,
    /// HTTP status, `None` when the request never got a response.
    pub status: Option<u16>,
    pub code: String,
    pub message: String,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl UpstreamError {
    pub fn new(
        service: impl Into<String>,
        operation: impl Into<String>,
        status: Option<u16>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Error for a request that failed before a response was received.
    pub fn transport(
        service: impl Into<String>,
        operation: impl Into<String>,
        err: impl std::fmt::Display,
    ) -> Self {
        Self::new(service, operation, None, "TransportError", err.to_string())
    }

    /// Whether the upstream error means the addressed resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404) || NOT_FOUND_CODES.contains(&self.code.as_str())
    }
}

/// Errors that can occur during tool execution
#[derive(Debug, Error)]
pub enum ToolError {
    /// Input parameters were missing, malformed or mutually exclusive.
    /// Always raised before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream service error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Browser session not found: {0}")]
    SessionNotFound(String),

    /// The call went through but the payload reports a failure.
    #[error("Partial success: {message}")]
    PartialSuccess { message: String, payload: Value },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

impl ToolError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stable snake-case tag for the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Validation(_) => "validation_error",
            ToolError::Upstream(_) => "upstream_service_error",
            ToolError::SessionNotFound(_) => "session_not_found",
            ToolError::PartialSuccess { .. } => "partial_success",
            ToolError::Timeout(_) => "timeout",
            ToolError::Io(_) => "io_error",
            ToolError::Serialization(_) => "serialization_error",
            ToolError::Custom(_) => "error",
        }
    }

    /// The upstream error, if this is one.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            ToolError::Upstream(e) => Some(e),
            _ => None,
        }
    }

    /// JSON rendering for hosts that expect a structured error body.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        match self {
            ToolError::Upstream(e) => {
                body["service"] = json!(e.service);
                body["operation"] = json!(e.operation);
                body["status"] = json!(e.status);
                body["code"] = json!(e.code);
            }
            ToolError::PartialSuccess { payload, .. } => {
                body["payload"] = payload.clone();
            }
            _ => {}
        }
        body
    }
}

impl From<String> for ToolError {
    fn from(s: String) -> Self {
        Self::Custom(s)
    }
}

impl From<&str> for ToolError {
    fn from(s: &str) -> Self {
        Self::Custom(s.to_string())
    }
}
