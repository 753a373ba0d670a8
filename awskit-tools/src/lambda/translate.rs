use super::{invoke, InvokeOptions};
use crate::prelude::*;
use crate::utils::required;
use serde_json::{json, Value};

/// Input for the translation Lambda
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LambdaTranslateInput {
    /// Text to translate
    pub text_content: String,

    /// Source language code
    pub src_lang: String,

    /// Target language code
    pub dest_lang: String,

    /// Translation function name or ARN
    pub lambda_name: String,

    /// Request type understood by the function (e.g. `term_mapping`, `translate`)
    pub request_type: String,

    /// Model the function should use
    pub model_id: String,

    /// Terminology dictionary id
    pub dictionary_name: String,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Translate text through a Lambda-hosted translation utility
pub struct LambdaTranslateTool {
    config: Arc<ProviderConfig>,
}

impl LambdaTranslateTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

impl Tool for LambdaTranslateTool {
    type Input = LambdaTranslateInput;

    fn name(&self) -> &str {
        "lambda_translate_utils"
    }

    fn description(&self) -> &str {
        "Translate text with a Lambda-hosted translation utility that supports terminology dictionaries and model selection."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let message = json!({
            "src_contents": [required(&input.text_content, "text_content")?],
            "src_lang": required(&input.src_lang, "src_lang")?,
            "dest_lang": required(&input.dest_lang, "dest_lang")?,
            "dictionary_id": required(&input.dictionary_name, "dictionary_name")?,
            "request_type": required(&input.request_type, "request_type")?,
            "model_id": required(&input.model_id, "model_id")?,
        });
        let function_name = required(&input.lambda_name, "lambda_name")?;

        let client = self.config.client(&input.credentials).await?;
        let invocation = invoke(
            &client,
            function_name,
            &message,
            InvokeOptions {
                invocation_type: Some("RequestResponse"),
                ..Default::default()
            },
        )
        .await?;

        if let Some(error) = &invocation.function_error {
            return Err(ToolError::PartialSuccess {
                message: format!("{} reported a {} function error", function_name, error),
                payload: invocation.payload_json().unwrap_or(Value::Null),
            });
        }

        // A JSON string payload is unwrapped so escapes come out as real characters
        let text = match invocation.payload_json() {
            Some(Value::String(s)) => s,
            _ => invocation.payload_text(),
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

    fn input() -> Value {
        json!({
            "text_content": "こんにちは",
            "src_lang": "ja",
            "dest_lang": "en",
            "lambda_name": "translate-fn",
            "request_type": "translate",
            "model_id": "anthropic.claude-3-haiku",
            "dictionary_name": "glossary-1"
        })
    }

    #[tokio::test]
    async fn test_sends_contract_and_unquotes_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2015-03-31/functions/translate-fn/invocations"))
            .and(body_json(json!({
                "src_contents": ["こんにちは"],
                "src_lang": "ja",
                "dest_lang": "en",
                "dictionary_id": "glossary-1",
                "request_type": "translate",
                "model_id": "anthropic.claude-3-haiku"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("\"Hello\\nthere\""))
            .expect(1)
            .mount(&server)
            .await;

        let tool = LambdaTranslateTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(serde_json::from_value(input()).unwrap())
            .await
            .unwrap();
        assert_eq!(result.as_text(), "Hello\nthere");
    }

    #[tokio::test]
    async fn test_object_payload_is_returned_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"translations":["Hello"]}"#))
            .mount(&server)
            .await;

        let tool = LambdaTranslateTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(serde_json::from_value(input()).unwrap())
            .await
            .unwrap();
        assert_eq!(result.as_text(), r#"{"translations":["Hello"]}"#);
    }

    #[tokio::test]
    async fn test_blank_field_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut params = input();
        params["dictionary_name"] = json!(" ");
        let tool = LambdaTranslateTool::new(mock_config(&server.uri()));
        let err = tool
            .execute(serde_json::from_value(params).unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("dictionary_name is required"));
    }

    #[test]
    fn test_missing_field_fails_deserialization() {
        let mut params = input();
        params.as_object_mut().unwrap().remove("model_id");
        assert!(serde_json::from_value::<LambdaTranslateInput>(params).is_err());
    }
}
