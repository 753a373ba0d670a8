use crate::prelude::*;
use crate::utils::{check_range, clean_id, optional, timestamp_to_rfc3339};
use awskit_core::service::AGENTCORE;
use reqwest::Method;
use serde_json::{json, Value};

fn default_max_results() -> u32 {
    10
}

/// Input for searching long-term memory records
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MemorySearchInput {
    pub memory_id: String,

    /// Namespace to search, e.g. `/semantic/actor_1/session_1` (default `/`)
    #[serde(default)]
    pub namespace: Option<String>,

    /// Search text (default `all`)
    #[serde(default)]
    pub search_query: Option<String>,

    /// Number of records (1-20)
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Semantic search over AgentCore memory records
pub struct MemorySearchTool {
    config: Arc<ProviderConfig>,
}

impl MemorySearchTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

fn simplify_record(record: &Value) -> Value {
    let mut out = record.clone();
    if let Some(map) = out.as_object_mut() {
        if let Some(created) = record.get("createdAt").and_then(timestamp_to_rfc3339) {
            map.insert("createdAt".into(), json!(created));
        }
        if let Some(text) = record["content"]["text"].as_str() {
            map.insert("text".into(), json!(text));
        }
    }
    out
}

impl Tool for MemorySearchTool {
    type Input = MemorySearchInput;

    fn name(&self) -> &str {
        "agentcore_memory_search"
    }

    fn description(&self) -> &str {
        "Search long-term Amazon Bedrock AgentCore memory records in a namespace by semantic similarity."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let memory_id = clean_id(&Some(input.memory_id.clone()))
            .ok_or_else(|| ToolError::validation("memory_id is required"))?;
        let namespace = optional(&input.namespace).unwrap_or("/");
        let query = optional(&input.search_query).unwrap_or("all");
        let max_results = check_range(input.max_results, 1, 20, "max_results")?;

        let client = self.config.client(&input.credentials).await?;
        let url = client.url(&AGENTCORE, &["memories", memory_id.as_str(), "retrieve"], &[])?;
        let body = json!({
            "namespace": namespace,
            "searchCriteria": { "searchQuery": query, "topK": max_results },
            "maxResults": max_results,
        });
        let response = client
            .rest_json(&AGENTCORE, "RetrieveMemoryRecords", Method::POST, url, Some(&body))
            .await?;

        let memories: Vec<Value> = response["memoryRecordSummaries"]
            .as_array()
            .into_iter()
            .flatten()
            .take(max_results as usize)
            .map(simplify_record)
            .collect();

        Ok(ToolResult::Json(json!({
            "success": true,
            "message": format!("Found {} relevant memor(ies)", memories.len()),
            "data": {
                "memories_count": memories.len(),
                "memory_id": memory_id,
                "namespace": namespace,
                "query": query,
                "memories": memories,
            },
        })))
    }
}
