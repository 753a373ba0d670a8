//! SageMaker endpoint tools.
//!
//! | Tool | Endpoint contract |
//! |------|-------------------|
//! | `sagemaker_text_rerank` | `{"inputs", "docs"}` in, `{"scores"}` out |
//! | `sagemaker_tts` | mode-specific payload in, `{"s3_presign_url"}` out |

mod rerank;
mod tts;

pub use rerank::{SageMakerRerankInput, SageMakerRerankTool};
pub use tts::{SageMakerTtsInput, SageMakerTtsTool, TtsInferType};

use awskit_core::service::SAGEMAKER_RUNTIME;
use awskit_core::{box_tool, AwsClient, AwsRequest, DynTool, ProviderConfig, ToolError, UpstreamError};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// InvokeEndpoint with a JSON body, returning the JSON response.
pub(crate) async fn invoke_endpoint(
    client: &AwsClient,
    endpoint: &str,
    body: &Value,
) -> Result<Value, ToolError> {
    let url = client.url(&SAGEMAKER_RUNTIME, &["endpoints", endpoint, "invocations"], &[])?;
    let request = AwsRequest::new(SAGEMAKER_RUNTIME, "InvokeEndpoint", Method::POST, url)
        .header("accept", "application/json")
        .json_body(body)?;
    client.send(request).await?.json()
}

/// The endpoint answered 2xx with a body we cannot use.
pub(crate) fn invalid_response(message: impl Into<String>) -> ToolError {
    UpstreamError::new(
        SAGEMAKER_RUNTIME.name,
        "InvokeEndpoint",
        Some(200),
        "InvalidResponse",
        message,
    )
    .into()
}

/// Returns all SageMaker tools
pub fn all_tools(config: Arc<ProviderConfig>) -> Vec<Box<dyn DynTool>> {
    vec![
        box_tool(SageMakerRerankTool::new(config.clone())),
        box_tool(SageMakerTtsTool::new(config)),
    ]
}
