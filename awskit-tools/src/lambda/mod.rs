//! AWS Lambda invocation tools.
//!
//! | Tool | Function contract |
//! |------|-------------------|
//! | `lambda_invoker` | any JSON payload |
//! | `lambda_translate_utils` | `{src_contents, src_lang, dest_lang, dictionary_id, request_type, model_id}` |
//! | `lambda_yaml_to_json` | `{"body": yaml}` in, `{"statusCode", "body"}` out |

mod invoker;
mod translate;
mod yaml_to_json;

pub use invoker::{InvocationType, LambdaInvokerInput, LambdaInvokerTool};
pub use translate::{LambdaTranslateInput, LambdaTranslateTool};
pub use yaml_to_json::{LambdaYamlToJsonInput, LambdaYamlToJsonTool};

use awskit_core::service::LAMBDA;
use awskit_core::{box_tool, AwsClient, AwsRequest, DynTool, ProviderConfig, ToolError};
use base64::Engine;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// Options for one Invoke call.
#[derive(Debug, Clone, Default)]
pub(crate) struct InvokeOptions<'a> {
    pub invocation_type: Option<&'a str>,
    pub qualifier: Option<&'a str>,
    pub include_logs: bool,
    pub client_context: Option<&'a Value>,
}

/// What Invoke returned.
#[derive(Debug, Clone)]
pub(crate) struct Invocation {
    pub status_code: u16,
    pub executed_version: Option<String>,
    pub function_error: Option<String>,
    /// Decoded tail of the execution log
    pub logs: Option<String>,
    pub payload: Vec<u8>,
}

impl Invocation {
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    pub fn payload_json(&self) -> Option<Value> {
        if self.payload.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.payload).ok()
    }
}

pub(crate) async fn invoke(
    client: &AwsClient,
    function_name: &str,
    payload: &Value,
    options: InvokeOptions<'_>,
) -> Result<Invocation, ToolError> {
    let mut query = Vec::new();
    if let Some(qualifier) = options.qualifier {
        query.push(("Qualifier", qualifier));
    }
    let url = client.url(
        &LAMBDA,
        &["2015-03-31", "functions", function_name, "invocations"],
        &query,
    )?;

    let mut request = AwsRequest::new(LAMBDA, "Invoke", Method::POST, url).json_body(payload)?;
    if let Some(invocation_type) = options.invocation_type {
        request = request.header("x-amz-invocation-type", invocation_type);
    }
    if options.include_logs {
        request = request.header("x-amz-log-type", "Tail");
    }
    if let Some(context) = options.client_context {
        let encoded = base64::engine::general_purpose::STANDARD.encode(serde_json::to_vec(context)?);
        request = request.header("x-amz-client-context", encoded);
    }

    let response = client.send(request).await?;
    let logs = response.header("x-amz-log-result").map(|encoded| {
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_else(|_| "Failed to decode logs".to_string())
    });

    Ok(Invocation {
        status_code: response.status,
        executed_version: response.header("x-amz-executed-version").map(str::to_string),
        function_error: response.header("x-amz-function-error").map(str::to_string),
        logs,
        payload: response.body,
    })
}

/// Returns all Lambda tools
pub fn all_tools(config: Arc<ProviderConfig>) -> Vec<Box<dyn DynTool>> {
    vec![
        box_tool(LambdaInvokerTool::new(config.clone())),
        box_tool(LambdaTranslateTool::new(config.clone())),
        box_tool(LambdaYamlToJsonTool::new(config)),
    ]
}
