use crate::prelude::*;
use crate::utils::{clean_id, optional, timestamp_suffix};
use awskit_core::eventstream::{decode_messages, MessageExt};
use awskit_core::service::{AGENTCORE, AGENTCORE_CONTROL};
use awskit_core::{AwsClient, AwsRequest, UpstreamError};
use reqwest::Method;
use serde_json::{json, Value};

/// Sandbox lifetime requested for new sessions.
const SESSION_TIMEOUT_SECS: u64 = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CodeLanguage {
    Python,
    Javascript,
    Typescript,
}

/// Input for running code or a shell command in a sandbox
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CodeInterpreterInput {
    /// Language of `code`
    #[serde(default)]
    pub language: Option<CodeLanguage>,

    /// Source to execute
    #[serde(default)]
    pub code: Option<String>,

    /// Shell command to execute (runs before `code`)
    #[serde(default)]
    pub command: Option<String>,

    /// Reuse a running sandbox session
    #[serde(default)]
    pub session_id: Option<String>,

    /// Reuse an existing code interpreter; a new one is created when omitted
    #[serde(default)]
    pub code_interpreter_id: Option<String>,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Execute code or commands in an AgentCore code interpreter sandbox
pub struct CodeInterpreterTool {
    config: Arc<ProviderConfig>,
}

impl CodeInterpreterTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

async fn create_code_interpreter(client: &AwsClient) -> Result<String, ToolError> {
    let url = client.url(&AGENTCORE_CONTROL, &["code-interpreters"], &[])?;
    let body = json!({
        "name": format!("code_interpreter_{}", timestamp_suffix()),
        "description": "code-interpreter with network access",
        "networkConfiguration": { "networkMode": "PUBLIC" },
        "clientToken": uuid::Uuid::new_v4().to_string(),
    });
    let response = client
        .rest_json(
            &AGENTCORE_CONTROL,
            "CreateCodeInterpreter",
            Method::POST,
            url,
            Some(&body),
        )
        .await?;
    response["codeInterpreterId"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ToolError::from("CreateCodeInterpreter returned no codeInterpreterId"))
}

async fn start_session(client: &AwsClient, interpreter_id: &str) -> Result<String, ToolError> {
    let url = client.url(
        &AGENTCORE,
        &["code-interpreters", interpreter_id, "sessions", "start"],
        &[],
    )?;
    let body = json!({ "sessionTimeoutSeconds": SESSION_TIMEOUT_SECS });
    let response = client
        .rest_json(
            &AGENTCORE,
            "StartCodeInterpreterSession",
            Method::PUT,
            url,
            Some(&body),
        )
        .await?;
    response["sessionId"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ToolError::from("StartCodeInterpreterSession returned no sessionId"))
}

/// Text content of every `result` event in an InvokeCodeInterpreter stream.
pub(crate) fn collect_results(body: &[u8]) -> Result<String, ToolError> {
    let mut texts = Vec::new();
    for message in decode_messages(body)? {
        if message.is_exception() {
            let payload: Value = serde_json::from_slice(message.payload()).unwrap_or_default();
            let detail = payload["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| String::from_utf8_lossy(message.payload()).into_owned());
            return Err(UpstreamError::new(
                AGENTCORE.name,
                "InvokeCodeInterpreter",
                Some(200),
                message.exception_type().unwrap_or("Unknown"),
                detail,
            )
            .into());
        }
        if message.event_type() != Some("result") {
            continue;
        }
        let event: Value = serde_json::from_slice(message.payload())?;
        texts.extend(
            event["content"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|item| item["text"].as_str())
                .map(str::to_string),
        );
    }
    Ok(texts.join("\n"))
}

async fn invoke(
    client: &AwsClient,
    interpreter_id: &str,
    session_id: &str,
    name: &str,
    arguments: Value,
) -> Result<String, ToolError> {
    let url = client.url(
        &AGENTCORE,
        &["code-interpreters", interpreter_id, "tools", "invoke"],
        &[],
    )?;
    let request = AwsRequest::new(AGENTCORE, "InvokeCodeInterpreter", Method::POST, url)
        .header("x-amzn-code-interpreter-session-id", session_id)
        .json_body(&json!({ "name": name, "arguments": arguments }))?;
    let response = client.send(request).await?;
    collect_results(&response.body)
}

impl Tool for CodeInterpreterTool {
    type Input = CodeInterpreterInput;

    fn name(&self) -> &str {
        "agentcore_code_interpreter"
    }

    fn description(&self) -> &str {
        "Run a shell command and/or a code snippet (python, javascript, typescript) in an Amazon Bedrock AgentCore code interpreter sandbox."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let command = optional(&input.command);
        let code = optional(&input.code);
        if command.is_none() && code.is_none() {
            return Err(ToolError::validation("Either command or code must be provided"));
        }
        let code = match (code, input.language) {
            (Some(code), Some(language)) => Some((code, language)),
            (Some(_), None) => {
                return Err(ToolError::validation("language is required when code is provided"))
            }
            (None, _) => None,
        };

        let client = self.config.client(&input.credentials).await?;
        let interpreter_id = match clean_id(&input.code_interpreter_id) {
            Some(id) => id,
            None => create_code_interpreter(&client).await?,
        };
        let session_id = match clean_id(&input.session_id) {
            Some(id) => id,
            None => start_session(&client, &interpreter_id).await?,
        };

        let mut results = Vec::new();
        if let Some(command) = command {
            let output = invoke(
                &client,
                &interpreter_id,
                &session_id,
                "executeCommand",
                json!({ "command": command }),
            )
            .await?;
            results.push(json!({ "type": "command", "result": output }));
        }
        if let Some((code, language)) = code {
            let output = invoke(
                &client,
                &interpreter_id,
                &session_id,
                "executeCode",
                json!({ "language": language, "code": code }),
            )
            .await?;
            results.push(json!({ "type": "code", "result": output }));
        }

        Ok(ToolResult::Json(json!({
            "status": "success",
            "session_id": session_id,
            "code_interpreter_id": interpreter_id,
            "results": results,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awskit_core::eventstream::encode_message;
    use awskit_core::test_utils::mock_config;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn result_event(text: &str) -> Vec<u8> {
        encode_message(
            &[
                (":message-type", "event"),
                (":event-type", "result"),
                (":content-type", "application/json"),
            ],
            json!({"content": [{"type": "text", "text": text}], "isError": false})
                .to_string()
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_collect_results_skips_other_events() {
        let mut body = encode_message(&[(":message-type", "event"), (":event-type", "initial-response")], b"{}")
            .unwrap();
        body.extend(result_event("4"));
        body.extend(result_event("done"));
        assert_eq!(collect_results(&body).unwrap(), "4\ndone");
    }

    #[test]
    fn test_collect_results_exception_event() {
        let body = encode_message(
            &[(":message-type", "exception"), (":exception-type", "ValidationException")],
            br#"{"message": "session expired"}"#,
        )
        .unwrap();
        let err = collect_results(&body).unwrap_err();
        let upstream = err.upstream().unwrap();
        assert_eq!(upstream.code, "ValidationException");
        assert_eq!(upstream.message, "session expired");
    }

    #[tokio::test]
    async fn test_creates_interpreter_and_session_then_runs_both() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/code-interpreters"))
            .and(body_partial_json(json!({"networkConfiguration": {"networkMode": "PUBLIC"}})))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "codeInterpreterId": "ci-1", "status": "READY"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/code-interpreters/ci-1/sessions/start"))
            .and(body_partial_json(json!({"sessionTimeoutSeconds": 900})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessionId": "s-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/code-interpreters/ci-1/tools/invoke"))
            .and(header("x-amzn-code-interpreter-session-id", "s-1"))
            .and(body_partial_json(json!({"name": "executeCommand"})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(result_event("Linux")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/code-interpreters/ci-1/tools/invoke"))
            .and(body_partial_json(json!({
                "name": "executeCode",
                "arguments": {"language": "python", "code": "print(2+2)"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(result_event("4")))
            .expect(1)
            .mount(&server)
            .await;

        let tool = CodeInterpreterTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(
                serde_json::from_value(json!({
                    "language": "python",
                    "code": "print(2+2)",
                    "command": "uname"
                }))
                .unwrap(),
            )
            .await
            .unwrap();

        let json = result.as_json().unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["session_id"], "s-1");
        assert_eq!(json["code_interpreter_id"], "ci-1");
        assert_eq!(json["results"][0], json!({"type": "command", "result": "Linux"}));
        assert_eq!(json["results"][1], json!({"type": "code", "result": "4"}));
    }

    #[tokio::test]
    async fn test_code_requires_language() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tool = CodeInterpreterTool::new(mock_config(&server.uri()));
        let err = tool
            .execute(serde_json::from_value(json!({"code": "print(1)"})).unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("language is required"));

        let err = tool
            .execute(serde_json::from_value(json!({})).unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Either command or code"));
    }
}
