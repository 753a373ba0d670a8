use super::{invoke, InvokeOptions};
use crate::prelude::*;
use crate::utils::{optional, parse_json, required};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum InvocationType {
    /// Wait for the function and return its payload
    #[default]
    RequestResponse,
    /// Queue the event and return immediately
    Event,
    /// Validate parameters and permissions only
    DryRun,
}

impl InvocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationType::RequestResponse => "RequestResponse",
            InvocationType::Event => "Event",
            InvocationType::DryRun => "DryRun",
        }
    }
}

/// Input for invoking a Lambda function
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LambdaInvokerInput {
    /// Function name, ARN or partial ARN
    pub lambda_name: String,

    /// JSON payload sent to the function (defaults to `{}`)
    #[serde(default)]
    pub payload_json: Option<String>,

    /// JSON client context, passed base64-encoded
    #[serde(default)]
    pub client_context_json: Option<String>,

    #[serde(default)]
    pub invocation_type: InvocationType,

    /// Version or alias to invoke
    #[serde(default)]
    pub qualifier: Option<String>,

    /// Return the last 4 KB of the execution log
    #[serde(default)]
    pub include_logs: bool,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Invoke any Lambda function with a JSON payload
pub struct LambdaInvokerTool {
    config: Arc<ProviderConfig>,
}

impl LambdaInvokerTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

impl Tool for LambdaInvokerTool {
    type Input = LambdaInvokerInput;

    fn name(&self) -> &str {
        "lambda_invoker"
    }

    fn description(&self) -> &str {
        "Invoke an AWS Lambda function synchronously or asynchronously with a JSON payload and return its response."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let function_name = required(&input.lambda_name, "lambda_name")?;
        let payload = parse_json(&input.payload_json, "payload_json")?.unwrap_or_else(|| json!({}));
        let client_context = parse_json(&input.client_context_json, "client_context_json")?;
        let qualifier = optional(&input.qualifier);

        let client = self.config.client(&input.credentials).await?;
        let invocation = invoke(
            &client,
            function_name,
            &payload,
            InvokeOptions {
                invocation_type: Some(input.invocation_type.as_str()),
                qualifier,
                include_logs: input.include_logs,
                client_context: client_context.as_ref(),
            },
        )
        .await?;

        let mut result = json!({
            "function_name": function_name,
            "status_code": invocation.status_code,
            "executed_version": invocation.executed_version,
            "invocation_type": input.invocation_type.as_str(),
        });
        if let Some(qualifier) = qualifier {
            result["qualifier"] = json!(qualifier);
        }
        if let Some(error) = &invocation.function_error {
            result["function_error"] = json!(error);
        }

        let response_json = invocation.payload_json();
        let response_text = invocation.payload_text();
        let text = match &response_json {
            Some(value) => {
                result["response_json"] = value.clone();
                value.to_string()
            }
            None if !response_text.is_empty() => {
                result["response_text"] = Value::String(response_text.clone());
                response_text
            }
            None => format!("Invoked {} (status {})", function_name, invocation.status_code),
        };
        if input.include_logs {
            if let Some(logs) = invocation.logs {
                result["logs"] = json!(logs);
            }
        }

        Ok(ToolResult::Many(vec![
            ToolResult::Json(result),
            ToolResult::Text(text),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awskit_core::test_utils::mock_config;
    use base64::Engine;
    use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn input(value: Value) -> LambdaInvokerInput {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_request_response_with_logs() {
        let server = MockServer::start().await;
        let logs = base64::engine::general_purpose::STANDARD.encode("START RequestId: 1\nEND");
        Mock::given(method("POST"))
            .and(path("/2015-03-31/functions/orders-fn/invocations"))
            .and(query_param("Qualifier", "live"))
            .and(header("x-amz-invocation-type", "RequestResponse"))
            .and(header("x-amz-log-type", "Tail"))
            .and(header_exists("x-amz-client-context"))
            .and(body_json(json!({"order": 7})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-amz-executed-version", "3")
                    .insert_header("x-amz-log-result", logs.as_str())
                    .set_body_json(json!({"ok": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tool = LambdaInvokerTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(input(json!({
                "lambda_name": "orders-fn",
                "payload_json": "{\"order\": 7}",
                "client_context_json": "{\"custom\": {\"k\": \"v\"}}",
                "qualifier": "live",
                "include_logs": true
            })))
            .await
            .unwrap();

        let payload = result.as_json().unwrap();
        assert_eq!(payload["status_code"], 200);
        assert_eq!(payload["executed_version"], "3");
        assert_eq!(payload["qualifier"], "live");
        assert_eq!(payload["response_json"]["ok"], true);
        assert_eq!(payload["logs"], "START RequestId: 1\nEND");
        assert!(payload.get("function_error").is_none());
    }

    #[tokio::test]
    async fn test_event_invocation_has_empty_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-invocation-type", "Event"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let tool = LambdaInvokerTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(input(json!({"lambda_name": "fn", "invocation_type": "Event"})))
            .await
            .unwrap();

        let ToolResult::Many(parts) = result else {
            panic!("expected Many");
        };
        assert_eq!(parts[0].as_json().unwrap()["status_code"], 202);
        assert_eq!(parts[1].as_text(), "Invoked fn (status 202)");
    }

    #[tokio::test]
    async fn test_function_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-amz-function-error", "Unhandled")
                    .set_body_json(json!({"errorMessage": "boom", "errorType": "Error"})),
            )
            .mount(&server)
            .await;

        let tool = LambdaInvokerTool::new(mock_config(&server.uri()));
        let result = tool.execute(input(json!({"lambda_name": "fn"}))).await.unwrap();
        let payload = result.as_json().unwrap();
        assert_eq!(payload["function_error"], "Unhandled");
        assert_eq!(payload["response_json"]["errorMessage"], "boom");
    }

    #[tokio::test]
    async fn test_invalid_payload_json_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tool = LambdaInvokerTool::new(mock_config(&server.uri()));
        let err = tool
            .execute(input(json!({"lambda_name": "fn", "payload_json": "{not json"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("payload_json must be valid JSON"));
    }

    #[tokio::test]
    async fn test_missing_function_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header("x-amzn-errortype", "ResourceNotFoundException")
                    .set_body_json(json!({"Message": "Function not found: fn"})),
            )
            .mount(&server)
            .await;

        let tool = LambdaInvokerTool::new(mock_config(&server.uri()));
        let err = tool.execute(input(json!({"lambda_name": "fn"}))).await.unwrap_err();
        let upstream = err.upstream().unwrap();
        assert_eq!(upstream.code, "ResourceNotFoundException");
        assert_eq!(upstream.message, "Function not found: fn");
        assert!(upstream.is_not_found());
    }
}
