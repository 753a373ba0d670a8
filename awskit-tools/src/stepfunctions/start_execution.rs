use crate::prelude::*;
use crate::utils::{json_type, optional, parse_json, required, timestamp_to_rfc3339};
use awskit_core::service::STEP_FUNCTIONS;
use serde_json::{json, Value};

/// Input for starting a state machine execution
#[derive(Debug, Deserialize, JsonSchema)]
pub struct StartExecutionInput {
    pub state_machine_arn: String,

    /// Execution input as JSON (default `{}`)
    #[serde(default)]
    pub input_json: Option<String>,

    /// Unique execution name; generated by Step Functions when omitted
    #[serde(default)]
    pub execution_name: Option<String>,

    /// X-Ray trace header
    #[serde(default)]
    pub trace_header: Option<String>,

    /// Tags as a JSON array of `{"key": ..., "value": ...}`
    #[serde(default)]
    pub tags_json: Option<String>,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Start an AWS Step Functions state machine execution
pub struct StartExecutionTool {
    config: Arc<ProviderConfig>,
}

impl StartExecutionTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

impl Tool for StartExecutionTool {
    type Input = StartExecutionInput;

    fn name(&self) -> &str {
        "stepfunctions_start_execution"
    }

    fn description(&self) -> &str {
        "Start an execution of an AWS Step Functions state machine with a JSON input."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let state_machine_arn = required(&input.state_machine_arn, "state_machine_arn")?;
        let payload = parse_json(&input.input_json, "input_json")?.unwrap_or_else(|| json!({}));
        let tags = match parse_json(&input.tags_json, "tags_json")? {
            None => None,
            Some(Value::Array(tags)) if tags.is_empty() => None,
            Some(Value::Array(tags)) => Some(tags),
            Some(other) => {
                return Err(ToolError::validation(format!(
                    "tags_json must be a JSON array of {{\"key\": ..., \"value\": ...}}, got {}",
                    json_type(&other)
                )))
            }
        };
        let execution_name = optional(&input.execution_name);
        let trace_header = optional(&input.trace_header);

        let mut request = json!({
            "stateMachineArn": state_machine_arn,
            "input": payload.to_string(),
        });
        if let Some(name) = execution_name {
            request["name"] = json!(name);
        }
        if let Some(trace) = trace_header {
            request["traceHeader"] = json!(trace);
        }
        if let Some(tags) = &tags {
            request["tags"] = json!(tags);
        }

        let client = self.config.client(&input.credentials).await?;
        let response = client
            .json_rpc(&STEP_FUNCTIONS, "StartExecution", &request)
            .await?;

        let execution_arn = response["executionArn"].as_str().map(str::to_string);
        let mut result = json!({
            "state_machine_arn": state_machine_arn,
            "execution_arn": execution_arn,
            "start_date": timestamp_to_rfc3339(&response["startDate"]),
        });
        if let Some(name) = execution_name {
            result["execution_name"] = json!(name);
        }
        if let Some(trace) = trace_header {
            result["trace_header"] = json!(trace);
        }
        if let Some(tags) = tags {
            result["tags"] = json!(tags);
        }

        Ok(ToolResult::Many(vec![
            ToolResult::Json(result),
            ToolResult::text(execution_arn.unwrap_or_else(|| "Execution started".to_string())),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awskit_core::test_utils::mock_config;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARN: &str = "arn:aws:states:us-east-1:123456789012:stateMachine:orders";

    #[tokio::test]
    async fn test_start_execution() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", "AWSStepFunctions.StartExecution"))
            .and(header("content-type", "application/x-amz-json-1.0"))
            .and(body_json(json!({
                "stateMachineArn": ARN,
                "input": "{\"order\":7}",
                "name": "run-1",
                "tags": [{"key": "team", "value": "ops"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "executionArn": "arn:aws:states:us-east-1:123456789012:execution:orders:run-1",
                "startDate": 1700000000.5
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = StartExecutionTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(
                serde_json::from_value(json!({
                    "state_machine_arn": ARN,
                    "input_json": "{\"order\": 7}",
                    "execution_name": "run-1",
                    "tags_json": "[{\"key\": \"team\", \"value\": \"ops\"}]"
                }))
                .unwrap(),
            )
            .await
            .unwrap();

        let json = result.as_json().unwrap();
        assert_eq!(json["start_date"], "2023-11-14T22:13:20.500+00:00");
        assert_eq!(json["execution_name"], "run-1");
        assert!(json.get("trace_header").is_none());
        assert!(result
            .as_text()
            .contains("arn:aws:states:us-east-1:123456789012:execution:orders:run-1"));
    }

    #[tokio::test]
    async fn test_default_input_is_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({"stateMachineArn": ARN, "input": "{}"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "executionArn": "arn:x", "startDate": 1700000000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = StartExecutionTool::new(mock_config(&server.uri()));
        tool.execute(serde_json::from_value(json!({"state_machine_arn": ARN})).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_json_rejected_before_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let tool = StartExecutionTool::new(mock_config(&server.uri()));

        for params in [
            json!({"state_machine_arn": ARN, "input_json": "{not json"}),
            json!({"state_machine_arn": ARN, "tags_json": "{\"key\": \"a\"}"}),
            json!({"state_machine_arn": "  "}),
        ] {
            let err = tool
                .execute(serde_json::from_value(params).unwrap())
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::Validation(_)));
        }
    }
}
