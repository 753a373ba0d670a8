use super::ResultType;
use crate::prelude::*;
use crate::utils::{check_range, parse_json_object, required};
use awskit_core::service::BEDROCK_AGENT_RUNTIME;
use reqwest::Method;
use serde_json::{json, Value};

/// Rerank model id meaning "do not rerank"
pub const NO_RERANK: &str = "default";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchType {
    Hybrid,
    #[default]
    Semantic,
}

fn default_topk() -> u32 {
    5
}

fn default_rerank_model() -> String {
    NO_RERANK.to_string()
}

/// Input for querying a knowledge base
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BedrockRetrieveInput {
    pub knowledge_base_id: String,

    /// Search text
    pub query: String,

    /// Number of results (1-100)
    #[serde(default = "default_topk")]
    pub topk: u32,

    #[serde(default)]
    pub search_type: SearchType,

    /// Bedrock rerank model id, or `default` for no reranking
    #[serde(default = "default_rerank_model")]
    pub rerank_model_id: String,

    /// Retrieval filter as a JSON object
    #[serde(default)]
    pub metadata_filter: Option<String>,

    /// `json` for records, `text` for numbered lines
    #[serde(default)]
    pub result_type: ResultType,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Retrieve passages from a Bedrock knowledge base
pub struct BedrockRetrieveTool {
    config: Arc<ProviderConfig>,
}

impl BedrockRetrieveTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

pub(crate) fn retrieval_configuration(
    topk: u32,
    search_type: SearchType,
    rerank_model_arn: Option<String>,
    filter: Option<Value>,
) -> Value {
    let mut vector = json!({
        "numberOfResults": topk,
        "overrideSearchType": search_type,
    });
    if let Some(model_arn) = rerank_model_arn {
        // rerank a wider candidate pool down to topk
        vector["numberOfResults"] = json!(topk * 5);
        vector["rerankingConfiguration"] = json!({
            "type": "BEDROCK_RERANKING_MODEL",
            "bedrockRerankingConfiguration": {
                "numberOfRerankedResults": topk,
                "modelConfiguration": { "modelArn": model_arn },
            },
        });
    }
    if let Some(filter) = filter {
        vector["filter"] = filter;
    }
    json!({ "vectorSearchConfiguration": vector })
}

fn round6(score: f64) -> f64 {
    (score * 1_000_000.0).round() / 1_000_000.0
}

/// Reshape Retrieve results into knowledge records; results without text are dropped.
pub(crate) fn to_knowledge_records(results: &[Value]) -> Vec<Value> {
    results
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let text = item["content"]["text"].as_str().unwrap_or("");
            if text.trim().is_empty() {
                return None;
            }
            let metadata = &item["metadata"];
            let source_uri = metadata["x-amz-bedrock-kb-source-uri"]
                .as_str()
                .or_else(|| item["location"]["s3Location"]["uri"].as_str())
                .or_else(|| item["location"]["webLocation"]["url"].as_str())
                .unwrap_or("");
            let document_name = source_uri.rsplit('/').next().unwrap_or(source_uri);
            let chunk_id = metadata["x-amz-bedrock-kb-chunk-id"].as_str().unwrap_or("");

            Some(json!({
                "metadata": {
                    "_source": "knowledge",
                    "dataset_id": metadata["x-amz-bedrock-kb-data-source-id"].as_str().unwrap_or(""),
                    "dataset_name": "BedRock knowledge base",
                    "document_id": document_name,
                    "document_name": document_name,
                    "document_data_source_type": item["content"]["type"].as_str().unwrap_or("TEXT"),
                    "segment_id": chunk_id,
                    "retriever_from": "workflow",
                    "score": round6(item["score"].as_f64().unwrap_or(0.0)),
                    "segment_hit_count": 1,
                    "segment_word_count": text.chars().count(),
                    "segment_position": metadata["x-amz-bedrock-kb-document-page-number"]
                        .as_f64()
                        .map(|p| p as i64)
                        .unwrap_or(0),
                    "segment_index_node_hash": chunk_id,
                    "doc_metadata": {
                        "tag": "bedrock knowledge base",
                        "source": item["location"]["type"].as_str().unwrap_or(""),
                        "source_uri": source_uri,
                        "document_name": document_name,
                    },
                    "position": idx + 1,
                },
                "title": document_name,
                "content": text,
            }))
        })
        .collect()
}

impl Tool for BedrockRetrieveTool {
    type Input = BedrockRetrieveInput;

    fn name(&self) -> &str {
        "bedrock_retrieve"
    }

    fn description(&self) -> &str {
        "Retrieve relevant passages from an Amazon Bedrock knowledge base, with optional reranking and metadata filtering."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let kb_id = required(&input.knowledge_base_id, "knowledge_base_id")?;
        let query = required(&input.query, "query")?;
        let topk = check_range(input.topk, 1, 100, "topk")?;
        let filter = parse_json_object(&input.metadata_filter, "metadata_filter")?.map(Value::Object);
        let rerank_model = Some(input.rerank_model_id.trim())
            .filter(|m| !m.is_empty() && *m != NO_RERANK);

        let client = self.config.client(&input.credentials).await?;
        let rerank_arn = rerank_model.map(|model| {
            format!("arn:aws:bedrock:{}::foundation-model/{}", client.region(), model)
        });

        let body = json!({
            "retrievalQuery": { "text": query },
            "retrievalConfiguration": retrieval_configuration(topk, input.search_type, rerank_arn, filter),
        });
        let url = client.url(&BEDROCK_AGENT_RUNTIME, &["knowledgebases", kb_id, "retrieve"], &[])?;
        let response = client
            .rest_json(&BEDROCK_AGENT_RUNTIME, "Retrieve", Method::POST, url, Some(&body))
            .await?;

        let results = response["retrievalResults"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default();
        let records = to_knowledge_records(results);

        match input.result_type {
            ResultType::Json => Ok(ToolResult::Json(json!({ "results": records }))),
            _ => {
                let text: String = records
                    .iter()
                    .enumerate()
                    .map(|(i, r)| format!("{}: {}\n", i + 1, r["content"].as_str().unwrap_or("")))
                    .collect();
                Ok(ToolResult::Text(text))
            }
        }
    }
}
