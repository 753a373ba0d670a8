use super::{invoke, InvokeOptions};
use crate::prelude::*;
use crate::utils::required;
use serde_json::{json, Value};

/// Input for YAML conversion
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LambdaYamlToJsonInput {
    /// YAML document to convert
    pub yaml_content: String,

    /// Conversion function name or ARN
    pub lambda_name: String,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Convert YAML to JSON through a Lambda function
pub struct LambdaYamlToJsonTool {
    config: Arc<ProviderConfig>,
}

impl LambdaYamlToJsonTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

impl Tool for LambdaYamlToJsonTool {
    type Input = LambdaYamlToJsonInput;

    fn name(&self) -> &str {
        "lambda_yaml_to_json"
    }

    fn description(&self) -> &str {
        "Convert a YAML document to JSON using a Lambda function and return the converted body."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let yaml = required(&input.yaml_content, "yaml_content")?;
        let function_name = required(&input.lambda_name, "lambda_name")?;
        serde_yaml::from_str::<serde_yaml::Value>(yaml)
            .map_err(|e| ToolError::validation(format!("yaml_content is not valid YAML: {}", e)))?;

        let client = self.config.client(&input.credentials).await?;
        let invocation = invoke(
            &client,
            function_name,
            &json!({ "body": input.yaml_content }),
            InvokeOptions {
                invocation_type: Some("RequestResponse"),
                ..Default::default()
            },
        )
        .await?;

        let payload = invocation
            .payload_json()
            .unwrap_or_else(|| Value::String(invocation.payload_text()));

        if let Some(error) = &invocation.function_error {
            return Err(ToolError::PartialSuccess {
                message: format!("{} reported a {} function error", function_name, error),
                payload,
            });
        }
        if payload["statusCode"].as_i64() != Some(200) {
            return Err(ToolError::PartialSuccess {
                message: format!("Invalid status code: {}", payload["statusCode"]),
                payload,
            });
        }

        let text = match &payload["body"] {
            Value::String(body) => body.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Ok(ToolResult::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awskit_core::test_utils::mock_config;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn input(yaml: &str) -> LambdaYamlToJsonInput {
        serde_json::from_value(json!({"yaml_content": yaml, "lambda_name": "yaml-fn"})).unwrap()
    }

    #[tokio::test]
    async fn test_returns_converted_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2015-03-31/functions/yaml-fn/invocations"))
            .and(body_json(json!({"body": "a: 1\nb: [x, y]\n"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statusCode": 200,
                "body": "{\"a\": 1, \"b\": [\"x\", \"y\"]}"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = LambdaYamlToJsonTool::new(mock_config(&server.uri()));
        let result = tool.execute(input("a: 1\nb: [x, y]\n")).await.unwrap();
        assert_eq!(result.as_text(), "{\"a\": 1, \"b\": [\"x\", \"y\"]}");
    }

    #[tokio::test]
    async fn test_non_200_status_is_partial_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statusCode": 400,
                "body": "bad yaml"
            })))
            .mount(&server)
            .await;

        let tool = LambdaYamlToJsonTool::new(mock_config(&server.uri()));
        let err = tool.execute(input("a: 1")).await.unwrap_err();
        match err {
            ToolError::PartialSuccess { message, payload } => {
                assert!(message.contains("400"));
                assert_eq!(payload["body"], "bad yaml");
            }
            other => panic!("expected PartialSuccess, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_yaml_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tool = LambdaYamlToJsonTool::new(mock_config(&server.uri()));
        let err = tool.execute(input("key: [unclosed")).await.unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }
}
