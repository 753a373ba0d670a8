use crate::prelude::*;
use crate::utils::required;
use awskit_core::service::BEDROCK_RUNTIME;
use reqwest::Method;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum GuardrailSource {
    /// Text is user input
    Input,
    /// Text is model output
    Output,
}

/// Input for applying a guardrail
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ApplyGuardrailInput {
    pub guardrail_id: String,

    /// Guardrail version number or `DRAFT`
    pub guardrail_version: String,

    pub source: GuardrailSource,

    /// Text to evaluate
    pub text: String,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Evaluate text against a Bedrock guardrail
pub struct ApplyGuardrailTool {
    config: Arc<ProviderConfig>,
}

impl ApplyGuardrailTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

fn field<'a>(value: &'a Value, key: &str) -> &'a str {
    value[key].as_str().unwrap_or("")
}

fn items<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value[key].as_array().into_iter().flatten()
}

/// One line per finding in each policy of each assessment.
fn assessment_lines(assessments: &[Value]) -> Vec<String> {
    let mut lines = Vec::new();
    for assessment in assessments {
        let Some(policies) = assessment.as_object() else {
            continue;
        };
        for (policy, data) in policies {
            match policy.as_str() {
                "topicPolicy" => lines.extend(items(data, "topics").map(|t| {
                    format!(
                        "Policy: {}, Topic: {}, Type: {}, Action: {}",
                        policy,
                        field(t, "name"),
                        field(t, "type"),
                        field(t, "action")
                    )
                })),
                "contentPolicy" => lines.extend(items(data, "filters").map(|f| {
                    format!(
                        "Policy: {}, Filter: {}, Confidence: {}, Action: {}",
                        policy,
                        field(f, "type"),
                        field(f, "confidence"),
                        field(f, "action")
                    )
                })),
                "wordPolicy" => lines.extend(
                    items(data, "customWords")
                        .chain(items(data, "managedWordLists"))
                        .map(|w| {
                            format!(
                                "Policy: {}, Match: {}, Action: {}",
                                policy,
                                field(w, "match"),
                                field(w, "action")
                            )
                        }),
                ),
                "sensitiveInformationPolicy" => lines.extend(
                    items(data, "piiEntities")
                        .chain(items(data, "regexes"))
                        .map(|e| {
                            let kind = e["type"].as_str().or(e["name"].as_str()).unwrap_or("");
                            format!(
                                "Policy: {}, Type: {}, Match: {}, Action: {}",
                                policy,
                                kind,
                                field(e, "match"),
                                field(e, "action")
                            )
                        }),
                ),
                _ => lines.push(format!("Policy: {}, Data: {}", policy, data)),
            }
        }
    }
    lines
}

impl Tool for ApplyGuardrailTool {
    type Input = ApplyGuardrailInput;

    fn name(&self) -> &str {
        "apply_guardrail"
    }

    fn description(&self) -> &str {
        "Check text against an Amazon Bedrock guardrail and report the action taken and any policy findings."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let id = required(&input.guardrail_id, "guardrail_id")?;
        let version = required(&input.guardrail_version, "guardrail_version")?;
        let text = required(&input.text, "text")?;

        let client = self.config.client(&input.credentials).await?;
        let url = client.url(
            &BEDROCK_RUNTIME,
            &["guardrail", id, "version", version, "apply"],
            &[],
        )?;
        let body = json!({
            "source": input.source,
            "content": [{ "text": { "text": text } }],
        });
        let response = client
            .rest_json(&BEDROCK_RUNTIME, "ApplyGuardrail", Method::POST, url, Some(&body))
            .await?;

        let action = response["action"].as_str().unwrap_or("No action specified");
        let output = response["outputs"][0]["text"]
            .as_str()
            .unwrap_or("No output received");
        let assessments = response["assessments"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut result = format!("Action: {}\nOutput: {}\n", action, output);
        let lines = assessment_lines(assessments);
        if !lines.is_empty() {
            result.push_str("Assessments:\n");
            for line in lines {
                result.push_str(&line);
                result.push('\n');
            }
        }
        Ok(ToolResult::Text(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awskit_core::test_utils::mock_config;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_assessment_lines() {
        let assessments = vec![json!({
            "topicPolicy": {"topics": [{"name": "Finance", "type": "DENY", "action": "BLOCKED"}]},
            "contentPolicy": {"filters": [{"type": "VIOLENCE", "confidence": "HIGH", "action": "BLOCKED"}]},
            "sensitiveInformationPolicy": {
                "piiEntities": [{"type": "EMAIL", "match": "a@b.c", "action": "ANONYMIZED"}],
                "regexes": [{"name": "acct", "match": "123", "action": "BLOCKED"}]
            }
        })];
        let lines = assessment_lines(&assessments);
        assert!(lines.contains(&"Policy: topicPolicy, Topic: Finance, Type: DENY, Action: BLOCKED".to_string()));
        assert!(lines.contains(
            &"Policy: contentPolicy, Filter: VIOLENCE, Confidence: HIGH, Action: BLOCKED".to_string()
        ));
        assert!(lines.contains(
            &"Policy: sensitiveInformationPolicy, Type: EMAIL, Match: a@b.c, Action: ANONYMIZED".to_string()
        ));
        assert!(lines.contains(
            &"Policy: sensitiveInformationPolicy, Type: acct, Match: 123, Action: BLOCKED".to_string()
        ));
    }

    #[tokio::test]
    async fn test_apply_guardrail_formats_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/guardrail/gr-1/version/DRAFT/apply"))
            .and(body_json(json!({
                "source": "INPUT",
                "content": [{"text": {"text": "tell me about stocks"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "action": "GUARDRAIL_INTERVENED",
                "outputs": [{"text": "Sorry, I can't help with that."}],
                "assessments": [{
                    "topicPolicy": {"topics": [{"name": "Investing", "type": "DENY", "action": "BLOCKED"}]}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = ApplyGuardrailTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(
                serde_json::from_value(json!({
                    "guardrail_id": "gr-1",
                    "guardrail_version": "DRAFT",
                    "source": "INPUT",
                    "text": "tell me about stocks"
                }))
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            result.as_text(),
            "Action: GUARDRAIL_INTERVENED\nOutput: Sorry, I can't help with that.\nAssessments:\n\
             Policy: topicPolicy, Topic: Investing, Type: DENY, Action: BLOCKED\n"
        );
    }

    #[test]
    fn test_source_must_be_input_or_output() {
        let parsed: Result<ApplyGuardrailInput, _> = serde_json::from_value(json!({
            "guardrail_id": "g", "guardrail_version": "1", "source": "BOTH", "text": "t"
        }));
        assert!(parsed.is_err());
    }
}
