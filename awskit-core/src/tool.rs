use base64::Engine;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ToolError;

/// Binary payload returned by media-producing tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    /// Raw bytes (not base64 encoded)
    pub data: Vec<u8>,
    pub mime_type: String,
    pub filename: Option<String>,
}

/// Result types that tools can return.
///
/// Most tools return `Json` or `Text`. Media tools return `Blob`, usually wrapped in
/// `Many` together with companion JSON metadata and a short text summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ToolResult {
    /// Plain text response
    Text(String),

    /// Structured JSON data - use for complex responses
    Json(Value),

    /// Binary data with a media type tag
    Blob(Blob),

    /// Several results delivered together, in order
    Many(Vec<ToolResult>),
}

impl ToolResult {
    /// Create a JSON result from any serializable type
    pub fn json<T: Serialize>(value: T) -> Result<Self, serde_json::Error> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Create a text result from a string
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Create a blob result from raw bytes
    pub fn blob(data: Vec<u8>, mime_type: impl Into<String>, filename: Option<String>) -> Self {
        Self::Blob(Blob {
            data,
            mime_type: mime_type.into(),
            filename,
        })
    }

    /// Get the text content if this is a Text variant, or convert to string description
    pub fn as_text(&self) -> String {
        match self {
            ToolResult::Text(s) => s.clone(),
            ToolResult::Json(v) => v.to_string(),
            ToolResult::Blob(blob) => describe_blob(blob),
            ToolResult::Many(parts) => parts
                .iter()
                .map(ToolResult::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Get a reference to the text content if this is a Text variant
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ToolResult::Text(s) => Some(s),
            _ => None,
        }
    }

    /// First JSON value in this result, looking through `Many`.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ToolResult::Json(v) => Some(v),
            ToolResult::Many(parts) => parts.iter().find_map(ToolResult::as_json),
            _ => None,
        }
    }

    /// All blobs in this result, in order.
    pub fn blobs(&self) -> Vec<&Blob> {
        match self {
            ToolResult::Blob(b) => vec![b],
            ToolResult::Many(parts) => parts.iter().flat_map(ToolResult::blobs).collect(),
            _ => Vec::new(),
        }
    }

    /// Flatten into the message list a workflow host consumes.
    ///
    /// Blobs are base64 encoded; nested `Many` values are flattened in order.
    pub fn to_messages(&self) -> Vec<Value> {
        match self {
            ToolResult::Text(s) => vec![json!({"type": "text", "text": s})],
            ToolResult::Json(v) => vec![json!({"type": "json", "json": v})],
            ToolResult::Blob(blob) => vec![json!({
                "type": "blob",
                "mime_type": blob.mime_type,
                "filename": blob.filename,
                "data_base64": base64::engine::general_purpose::STANDARD.encode(&blob.data),
            })],
            ToolResult::Many(parts) => parts.iter().flat_map(ToolResult::to_messages).collect(),
        }
    }
}

fn describe_blob(blob: &Blob) -> String {
    format!(
        "[Blob: {}, {}, {} bytes]",
        blob.mime_type,
        blob.filename.as_deref().unwrap_or("unnamed"),
        blob.data.len()
    )
}

/// Convert strings directly to ToolResult::Text
impl From<String> for ToolResult {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for ToolResult {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Trait for implementing AWS adapter tools.
///
/// Tools define an input type with `#[derive(Deserialize, JsonSchema)]`; the derived
/// schema is the tool's declared parameter schema, and deserialization failures are
/// reported as [`ToolError::Validation`] before `execute` runs.
///
/// # Example
///
/// ```rust
/// use awskit_core::{Tool, ToolResult, ToolError};
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct EchoInput {
///     /// Text to echo back
///     text: String,
/// }
///
/// struct EchoTool;
///
/// impl Tool for EchoTool {
///     type Input = EchoInput;
///
///     fn name(&self) -> &str { "echo" }
///     fn description(&self) -> &str { "Echo the input" }
///
///     fn execute(&self, input: Self::Input) -> impl std::future::Future<Output = Result<ToolResult, ToolError>> + Send {
///         async move { Ok(input.text.into()) }
///     }
/// }
/// ```
pub trait Tool: Send + Sync {
    /// The input type for this tool. Must implement `Deserialize` and `JsonSchema`.
    type Input: DeserializeOwned + JsonSchema;

    /// The name of the tool (e.g., "s3_operator")
    fn name(&self) -> &str;

    /// A description of what the tool does
    fn description(&self) -> &str;

    /// Execute the tool with typed input
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl std::future::Future<Output = Result<ToolResult, ToolError>> + Send;

    /// Get the JSON schema for this tool's input.
    fn input_schema(&self) -> Value {
        let schema = schemars::schema_for!(Self::Input);
        serde_json::to_value(schema).unwrap_or(Value::Null)
    }

    /// Format tool input as plain text (for logs).
    fn format_input_plain(&self, params: &Value) -> String {
        format_params_plain(self.name(), params)
    }
}

/// Object-safe trait for dynamic tool dispatch.
///
/// Implement `Tool` instead and use `box_tool()` to convert.
pub trait DynTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    fn execute_raw(
        &self,
        input: Value,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<ToolResult, ToolError>> + Send + '_>,
    >;

    fn format_input_plain(&self, params: &Value) -> String;
}

/// Convert a `Tool` into a type-erased `Box<dyn DynTool>` for storage in collections.
pub fn box_tool<T: Tool + 'static>(tool: T) -> Box<dyn DynTool> {
    Box::new(ToolWrapper(tool))
}

/// Create a `Vec<Box<dyn DynTool>>` from heterogeneous tool types.
///
/// ```ignore
/// let tools = box_tools![S3OperatorTool::new(config.clone()), LambdaInvokerTool::new(config)];
/// ```
#[macro_export]
macro_rules! box_tools {
    ($($tool:expr),* $(,)?) => {
        vec![$($crate::tool::box_tool($tool)),*]
    };
}

/// Internal wrapper that implements DynTool for any Tool
struct ToolWrapper<T>(T);

impl<T: Tool + 'static> DynTool for ToolWrapper<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    fn input_schema(&self) -> Value {
        self.0.input_schema()
    }

    fn execute_raw(
        &self,
        input: Value,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<ToolResult, ToolError>> + Send + '_>,
    > {
        Box::pin(async move {
            let typed_input: T::Input = serde_json::from_value(input).map_err(|e| {
                ToolError::Validation(format!("Invalid parameters for {}: {}", self.0.name(), e))
            })?;

            self.0.execute(typed_input).await
        })
    }

    fn format_input_plain(&self, params: &Value) -> String {
        self.0.format_input_plain(params)
    }
}

// ============================================================================
// Default formatting helpers
// ============================================================================

const MAX_PARAMS: usize = 10;
const MAX_VALUE_LEN: usize = 80;

fn truncate_str(s: &str) -> String {
    if s.chars().count() > MAX_VALUE_LEN {
        let head: String = s.chars().take(MAX_VALUE_LEN).collect();
        format!("\"{}…\"", head)
    } else {
        format!("\"{}\"", s)
    }
}

/// Format a JSON value for display, with truncation
fn format_value_preview(value: &Value) -> String {
    match value {
        Value::String(s) => truncate_str(s),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} keys}}", obj.len()),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
    }
}

/// Format tool parameters as plain text. Credential fields are masked.
pub fn format_params_plain(tool_name: &str, params: &Value) -> String {
    let params = crate::logging::scrub_value(params);
    let mut output = tool_name.to_string();

    if let Some(obj) = params.as_object() {
        for (key, value) in obj.iter().take(MAX_PARAMS) {
            output.push_str(&format!("\n  {}: {}", key, format_value_preview(value)));
        }
        if obj.len() > MAX_PARAMS {
            output.push_str(&format!("\n  … +{} more", obj.len() - MAX_PARAMS));
        }
    }

    output
}
