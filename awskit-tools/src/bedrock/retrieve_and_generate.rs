use super::ResultType;
use crate::prelude::*;
use crate::utils::{optional, parse_json_object, required};
use awskit_core::service::BEDROCK_AGENT_RUNTIME;
use reqwest::Method;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetrieveAndGenerateType {
    #[default]
    KnowledgeBase,
    ExternalSources,
}

/// Input for a retrieve-and-generate query
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RetrieveAndGenerateInput {
    /// User question
    pub input: String,

    #[serde(default, rename = "type")]
    pub kind: RetrieveAndGenerateType,

    /// `knowledgeBaseConfiguration` as a JSON object (KNOWLEDGE_BASE)
    #[serde(default)]
    pub knowledge_base_configuration: Option<String>,

    /// `externalSourcesConfiguration` as a JSON object (EXTERNAL_SOURCES)
    #[serde(default)]
    pub external_sources_configuration: Option<String>,

    /// `sessionConfiguration` as a JSON object
    #[serde(default)]
    pub session_configuration: Option<String>,

    /// Continue an earlier conversation
    #[serde(default)]
    pub session_id: Option<String>,

    #[serde(default)]
    pub result_type: ResultType,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Answer a question from a knowledge base or external sources
pub struct RetrieveAndGenerateTool {
    config: Arc<ProviderConfig>,
}

impl RetrieveAndGenerateTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

fn build_request(input: &RetrieveAndGenerateInput) -> Result<Value, ToolError> {
    let text = required(&input.input, "input")?;

    let configuration = match input.kind {
        RetrieveAndGenerateType::KnowledgeBase => {
            let kb = parse_json_object(&input.knowledge_base_configuration, "knowledge_base_configuration")?
                .ok_or_else(|| {
                    ToolError::validation("knowledge_base_configuration is required for KNOWLEDGE_BASE")
                })?;
            json!({ "type": "KNOWLEDGE_BASE", "knowledgeBaseConfiguration": kb })
        }
        RetrieveAndGenerateType::ExternalSources => {
            let sources = parse_json_object(
                &input.external_sources_configuration,
                "external_sources_configuration",
            )?
            .ok_or_else(|| {
                ToolError::validation("external_sources_configuration is required for EXTERNAL_SOURCES")
            })?;
            json!({ "type": "EXTERNAL_SOURCES", "externalSourcesConfiguration": sources })
        }
    };

    let mut body = json!({
        "input": { "text": text },
        "retrieveAndGenerateConfiguration": configuration,
    });
    if let Some(session) = parse_json_object(&input.session_configuration, "session_configuration")? {
        body["sessionConfiguration"] = Value::Object(session);
    }
    if let Some(session_id) = optional(&input.session_id) {
        body["sessionId"] = json!(session_id);
    }
    Ok(body)
}

fn reference_location(reference: &Value) -> Value {
    let location = &reference["location"];
    location["s3Location"]["uri"]
        .as_str()
        .or_else(|| location["webLocation"]["url"].as_str())
        .map(|uri| json!(uri))
        .unwrap_or(Value::Null)
}

/// Flatten the response into output, citations and session id.
fn simplify(response: &Value) -> Value {
    let citations: Vec<Value> = response["citations"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|citation| {
            let references: Vec<Value> = citation["retrievedReferences"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|r| {
                    json!({
                        "content": r["content"]["text"],
                        "metadata": r["metadata"],
                        "location": reference_location(r),
                    })
                })
                .collect();
            json!({
                "text": citation["generatedResponsePart"]["textResponsePart"]["text"],
                "references": references,
            })
        })
        .collect();

    json!({
        "output": response["output"]["text"],
        "citations": citations,
        "session_id": response["sessionId"],
    })
}

fn with_citations(simplified: &Value) -> String {
    let mut text = simplified["output"].as_str().unwrap_or_default().to_string();
    let citations = simplified["citations"].as_array().map(Vec::as_slice).unwrap_or_default();
    if citations.is_empty() {
        return text;
    }
    text.push_str("\n\n[References]\n");
    for (i, citation) in citations.iter().enumerate() {
        text.push_str(&format!("[{}] {}\n", i + 1, citation["text"].as_str().unwrap_or("")));
        for reference in citation["references"].as_array().into_iter().flatten() {
            let content = reference["content"].as_str().unwrap_or("");
            match reference["location"].as_str() {
                Some(location) => text.push_str(&format!("- {} ({})\n", content, location)),
                None => text.push_str(&format!("- {}\n", content)),
            }
        }
    }
    text
}

impl Tool for RetrieveAndGenerateTool {
    type Input = RetrieveAndGenerateInput;

    fn name(&self) -> &str {
        "bedrock_retrieve_and_generate"
    }

    fn description(&self) -> &str {
        "Answer a question with Amazon Bedrock RetrieveAndGenerate, grounded in a knowledge base or external sources."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let body = build_request(&input)?;

        let client = self.config.client(&input.credentials).await?;
        let url = client.url(&BEDROCK_AGENT_RUNTIME, &["retrieveAndGenerate"], &[])?;
        let response = client
            .rest_json(
                &BEDROCK_AGENT_RUNTIME,
                "RetrieveAndGenerate",
                Method::POST,
                url,
                Some(&body),
            )
            .await?;

        let simplified = simplify(&response);
        Ok(match input.result_type {
            ResultType::Json => ToolResult::Json(simplified),
            ResultType::Text => {
                ToolResult::Text(simplified["output"].as_str().unwrap_or_default().to_string())
            }
            ResultType::TextWithCitations => ToolResult::Text(with_citations(&simplified)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awskit_core::test_utils::mock_config;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn input(value: Value) -> RetrieveAndGenerateInput {
        serde_json::from_value(value).unwrap()
    }

    fn rag_response() -> Value {
        json!({
            "output": {"text": "Refunds take 5 days."},
            "sessionId": "sess-1",
            "citations": [{
                "generatedResponsePart": {"textResponsePart": {"text": "Refunds take 5 days."}},
                "retrievedReferences": [{
                    "content": {"text": "Refunds are processed within 5 business days."},
                    "location": {"type": "S3", "s3Location": {"uri": "s3://kb/refunds.md"}},
                    "metadata": {"page": 1}
                }]
            }]
        })
    }

    #[test]
    fn test_configuration_required_for_type() {
        let err = build_request(&input(json!({"input": "q"}))).unwrap_err();
        assert!(err.to_string().contains("knowledge_base_configuration is required"));

        let err = build_request(&input(json!({
            "input": "q", "type": "EXTERNAL_SOURCES", "knowledge_base_configuration": "{}"
        })))
        .unwrap_err();
        assert!(err.to_string().contains("external_sources_configuration is required"));
    }

    #[test]
    fn test_build_request_with_session() {
        let body = build_request(&input(json!({
            "input": "q",
            "knowledge_base_configuration": r#"{"knowledgeBaseId": "KB1", "modelArn": "m"}"#,
            "session_configuration": r#"{"kmsKeyArn": "k"}"#,
            "session_id": "s-9"
        })))
        .unwrap();
        assert_eq!(body["retrieveAndGenerateConfiguration"]["type"], "KNOWLEDGE_BASE");
        assert_eq!(
            body["retrieveAndGenerateConfiguration"]["knowledgeBaseConfiguration"]["knowledgeBaseId"],
            "KB1"
        );
        assert_eq!(body["sessionConfiguration"]["kmsKeyArn"], "k");
        assert_eq!(body["sessionId"], "s-9");
    }

    #[test]
    fn test_simplify_and_citations() {
        let simplified = simplify(&rag_response());
        assert_eq!(simplified["session_id"], "sess-1");
        assert_eq!(simplified["citations"][0]["references"][0]["location"], "s3://kb/refunds.md");

        let text = with_citations(&simplified);
        assert!(text.starts_with("Refunds take 5 days.\n\n[References]\n[1] Refunds take 5 days.\n"));
        assert!(text.contains("- Refunds are processed within 5 business days. (s3://kb/refunds.md)"));
    }

    #[tokio::test]
    async fn test_retrieve_and_generate_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/retrieveAndGenerate"))
            .and(body_json(json!({
                "input": {"text": "how long do refunds take?"},
                "retrieveAndGenerateConfiguration": {
                    "type": "KNOWLEDGE_BASE",
                    "knowledgeBaseConfiguration": {"knowledgeBaseId": "KB1", "modelArn": "m"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(rag_response()))
            .expect(1)
            .mount(&server)
            .await;

        let tool = RetrieveAndGenerateTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(input(json!({
                "input": "how long do refunds take?",
                "knowledge_base_configuration": r#"{"knowledgeBaseId": "KB1", "modelArn": "m"}"#,
                "result_type": "json"
            })))
            .await
            .unwrap();
        let json = result.as_json().unwrap();
        assert_eq!(json["output"], "Refunds take 5 days.");
        assert_eq!(json["citations"].as_array().unwrap().len(), 1);
    }
}
