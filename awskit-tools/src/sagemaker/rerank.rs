use super::{invalid_response, invoke_endpoint};
use crate::prelude::*;
use crate::utils::{check_range, json_type, required};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;

fn default_topk() -> usize {
    5
}

/// Input for reranking candidate texts
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SageMakerRerankInput {
    /// Name of the rerank endpoint
    pub sagemaker_endpoint: String,

    /// Query the candidates are scored against
    pub query: String,

    /// JSON array of strings, or of objects with a `content` field
    pub candidate_texts: String,

    /// Number of results to keep (1-1000)
    #[serde(default = "default_topk")]
    pub topk: usize,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Score candidate texts against a query with a SageMaker rerank model
pub struct SageMakerRerankTool {
    config: Arc<ProviderConfig>,
}

impl SageMakerRerankTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

/// Candidates as objects, plus the text of each one.
fn parse_candidates(raw: &str) -> Result<Vec<(Map<String, Value>, String)>, ToolError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ToolError::validation(format!("candidate_texts must be valid JSON: {}", e)))?;
    let Value::Array(items) = value else {
        return Err(ToolError::validation(format!(
            "candidate_texts must be a JSON array, got {}",
            json_type(&value)
        )));
    };
    if items.is_empty() {
        return Err(ToolError::validation("candidate_texts must not be empty"));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(text) => {
                let mut object = Map::new();
                object.insert("content".into(), Value::String(text.clone()));
                Ok((object, text))
            }
            Value::Object(object) => {
                let text = object.get("content").and_then(Value::as_str).map(str::to_string);
                match text {
                    Some(text) => Ok((object, text)),
                    None => Err(ToolError::validation(format!(
                        "candidate_texts[{}] has no string `content` field",
                        i
                    ))),
                }
            }
            other => Err(ToolError::validation(format!(
                "candidate_texts[{}] must be a string or object, got {}",
                i,
                json_type(&other)
            ))),
        })
        .collect()
}

fn parse_scores(response: &Value, expected: usize) -> Result<Vec<f64>, ToolError> {
    let scores: Vec<f64> = match &response["scores"] {
        Value::Array(values) => values
            .iter()
            .map(|v| v.as_f64().ok_or_else(|| invalid_response("non-numeric score")))
            .collect::<Result<_, _>>()?,
        Value::Number(n) => vec![n.as_f64().unwrap_or_default()],
        _ => return Err(invalid_response("response has no `scores` field")),
    };
    if scores.len() != expected {
        return Err(invalid_response(format!(
            "expected {} scores, got {}",
            expected,
            scores.len()
        )));
    }
    Ok(scores)
}

impl Tool for SageMakerRerankTool {
    type Input = SageMakerRerankInput;

    fn name(&self) -> &str {
        "sagemaker_text_rerank"
    }

    fn description(&self) -> &str {
        "Rerank candidate texts against a query using a SageMaker-hosted rerank model and return the top results."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let endpoint = required(&input.sagemaker_endpoint, "sagemaker_endpoint")?;
        let query = required(&input.query, "query")?;
        let topk = check_range(input.topk, 1, 1000, "topk")?;
        let candidates = parse_candidates(&input.candidate_texts)?;

        let docs: Vec<&str> = candidates.iter().map(|(_, text)| text.as_str()).collect();
        let body = json!({
            "inputs": vec![query; docs.len()],
            "docs": docs,
        });

        let client = self.config.client(&input.credentials).await?;
        let response = invoke_endpoint(&client, endpoint, &body).await?;
        let scores = parse_scores(&response, candidates.len())?;

        let mut scored: Vec<(f64, Map<String, Value>)> = candidates
            .into_iter()
            .zip(scores)
            .map(|((mut object, _), score)| {
                object.insert("score".into(), json!(score));
                (score, object)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(topk);

        let results: Vec<Value> = scored.into_iter().map(|(_, o)| Value::Object(o)).collect();
        Ok(ToolResult::Json(json!({ "results": results })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awskit_core::test_utils::mock_config;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_candidates_accepts_strings_and_objects() {
        let parsed = parse_candidates(r#"["a", {"content": "b", "id": 2}]"#).unwrap();
        assert_eq!(parsed[0].1, "a");
        assert_eq!(parsed[0].0["content"], "a");
        assert_eq!(parsed[1].0["id"], 2);

        assert!(parse_candidates(r#"{"content": "x"}"#).is_err());
        assert!(parse_candidates("[]").is_err());
        assert!(parse_candidates(r#"[{"text": "x"}]"#).is_err());
        assert!(parse_candidates("[1]").is_err());
    }

    #[test]
    fn test_parse_scores_checks_length() {
        assert_eq!(parse_scores(&json!({"scores": 0.5}), 1).unwrap(), vec![0.5]);
        let err = parse_scores(&json!({"scores": [0.1]}), 2).unwrap_err();
        assert_eq!(err.upstream().unwrap().code, "InvalidResponse");
        assert!(parse_scores(&json!({}), 1).is_err());
    }

    #[tokio::test]
    async fn test_rerank_sorts_and_truncates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/endpoints/bge-reranker/invocations"))
            .and(body_json(json!({
                "inputs": ["q", "q", "q"],
                "docs": ["one", "two", "three"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "scores": [0.2, 0.9, 0.5]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = SageMakerRerankTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(
                serde_json::from_value(json!({
                    "sagemaker_endpoint": "bge-reranker",
                    "query": "q",
                    "candidate_texts": r#"[{"content":"one"},{"content":"two"},{"content":"three"}]"#,
                    "topk": 2
                }))
                .unwrap(),
            )
            .await
            .unwrap();

        let results = result.as_json().unwrap()["results"].as_array().unwrap().clone();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["content"], "two");
        assert_eq!(results[0]["score"], 0.9);
        assert_eq!(results[1]["content"], "three");
    }

    #[tokio::test]
    async fn test_topk_out_of_range_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tool = SageMakerRerankTool::new(mock_config(&server.uri()));
        let err = tool
            .execute(
                serde_json::from_value(json!({
                    "sagemaker_endpoint": "ep",
                    "query": "q",
                    "candidate_texts": "[\"a\"]",
                    "topk": 0
                }))
                .unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }
}
