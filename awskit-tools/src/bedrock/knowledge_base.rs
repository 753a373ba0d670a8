use crate::prelude::*;
use crate::utils::{check_range, optional, required};
use awskit_core::service::BEDROCK_AGENT;
use awskit_core::AwsClient;
use reqwest::Method;
use serde_json::{json, Value};

fn list_body(max_results: Option<u32>, next_token: &Option<String>) -> Result<Value, ToolError> {
    let mut body = json!({});
    if let Some(max) = max_results {
        body["maxResults"] = json!(check_range(max, 1, 1000, "max_results")?);
    }
    if let Some(token) = optional(next_token) {
        body["nextToken"] = json!(token);
    }
    Ok(body)
}

/// `id | name | status` per summary, or `empty` when there are none.
fn summary_lines(summaries: &[Value], id_field: &str, empty: &str) -> String {
    if summaries.is_empty() {
        return empty.to_string();
    }
    summaries
        .iter()
        .map(|s| {
            format!(
                "{} | {} | {}",
                s[id_field].as_str().unwrap_or(""),
                s["name"].as_str().unwrap_or(""),
                s["status"].as_str().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn post_list(
    client: &AwsClient,
    operation: &str,
    segments: &[&str],
    body: &Value,
) -> Result<Value, ToolError> {
    let url = client.url(&BEDROCK_AGENT, segments, &[])?;
    client
        .rest_json(&BEDROCK_AGENT, operation, Method::POST, url, Some(body))
        .await
}

/// Input for listing knowledge bases
#[derive(Debug, Deserialize, JsonSchema)]
pub struct KbListInput {
    /// Page size (1-1000)
    #[serde(default)]
    pub max_results: Option<u32>,

    #[serde(default)]
    pub next_token: Option<String>,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// List Bedrock knowledge bases in the region
pub struct KbListTool {
    config: Arc<ProviderConfig>,
}

impl KbListTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

impl Tool for KbListTool {
    type Input = KbListInput;

    fn name(&self) -> &str {
        "bedrock_kb_list"
    }

    fn description(&self) -> &str {
        "List Amazon Bedrock knowledge bases with their id, name and status."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let body = list_body(input.max_results, &input.next_token)?;
        let client = self.config.client(&input.credentials).await?;
        let response = post_list(&client, "ListKnowledgeBases", &["knowledgebases", ""], &body).await?;

        let summaries = response["knowledgeBaseSummaries"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let text = summary_lines(&summaries, "knowledgeBaseId", "No knowledge bases found");
        Ok(ToolResult::Many(vec![
            ToolResult::Json(json!({
                "knowledge_bases": summaries,
                "next_token": response["nextToken"],
            })),
            ToolResult::Text(text),
        ]))
    }
}

/// Input for listing the data sources of a knowledge base
#[derive(Debug, Deserialize, JsonSchema)]
pub struct KbListDataSourcesInput {
    pub knowledge_base_id: String,

    /// Page size (1-1000)
    #[serde(default)]
    pub max_results: Option<u32>,

    #[serde(default)]
    pub next_token: Option<String>,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// List the data sources attached to a knowledge base
pub struct KbListDataSourcesTool {
    config: Arc<ProviderConfig>,
}

impl KbListDataSourcesTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

impl Tool for KbListDataSourcesTool {
    type Input = KbListDataSourcesInput;

    fn name(&self) -> &str {
        "bedrock_kb_list_data_sources"
    }

    fn description(&self) -> &str {
        "List the data sources of an Amazon Bedrock knowledge base."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let kb_id = required(&input.knowledge_base_id, "knowledge_base_id")?;
        let body = list_body(input.max_results, &input.next_token)?;
        let client = self.config.client(&input.credentials).await?;
        let response = post_list(
            &client,
            "ListDataSources",
            &["knowledgebases", kb_id, "datasources", ""],
            &body,
        )
        .await?;

        let summaries = response["dataSourceSummaries"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let text = summary_lines(
            &summaries,
            "dataSourceId",
            &format!("No data sources found for {}", kb_id),
        );
        Ok(ToolResult::Many(vec![
            ToolResult::Json(json!({
                "knowledge_base_id": kb_id,
                "data_sources": summaries,
                "next_token": response["nextToken"],
            })),
            ToolResult::Text(text),
        ]))
    }
}

/// Input for starting an ingestion job
#[derive(Debug, Deserialize, JsonSchema)]
pub struct KbStartIngestionJobInput {
    pub knowledge_base_id: String,

    pub data_source_id: String,

    /// Idempotency token; a random UUID when omitted
    #[serde(default)]
    pub client_token: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Sync a data source into its knowledge base
pub struct KbStartIngestionJobTool {
    config: Arc<ProviderConfig>,
}

impl KbStartIngestionJobTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

impl Tool for KbStartIngestionJobTool {
    type Input = KbStartIngestionJobInput;

    fn name(&self) -> &str {
        "bedrock_kb_start_ingestion_job"
    }

    fn description(&self) -> &str {
        "Start an ingestion job that syncs a data source into an Amazon Bedrock knowledge base."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let kb_id = required(&input.knowledge_base_id, "knowledge_base_id")?;
        let ds_id = required(&input.data_source_id, "data_source_id")?;

        let mut body = json!({
            "clientToken": optional(&input.client_token)
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        });
        if let Some(description) = optional(&input.description) {
            body["description"] = json!(description);
        }

        let client = self.config.client(&input.credentials).await?;
        let url = client.url(
            &BEDROCK_AGENT,
            &["knowledgebases", kb_id, "datasources", ds_id, "ingestionjobs", ""],
            &[],
        )?;
        let response = client
            .rest_json(&BEDROCK_AGENT, "StartIngestionJob", Method::PUT, url, Some(&body))
            .await?;

        let job = &response["ingestionJob"];
        let text = format!(
            "Started ingestion job {} (status {})",
            job["ingestionJobId"].as_str().unwrap_or("unknown"),
            job["status"].as_str().unwrap_or("UNKNOWN")
        );
        Ok(ToolResult::Many(vec![
            ToolResult::Json(json!({
                "knowledge_base_id": kb_id,
                "data_source_id": ds_id,
                "ingestion_job": job,
            })),
            ToolResult::Text(text),
        ]))
    }
}
