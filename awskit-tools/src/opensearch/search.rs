use crate::prelude::*;
use crate::utils::{check_range, parse_json, required};
use awskit_core::client::uri_encode;
use awskit_core::service::{OPENSEARCH, OPENSEARCH_SERVERLESS};
use awskit_core::AwsRequest;
use reqwest::Method;
use serde_json::{json, Value};
use url::Url;

fn default_size() -> u32 {
    10
}

/// Input for searching an OpenSearch index
#[derive(Debug, Deserialize, JsonSchema)]
pub struct OpenSearchSearchInput {
    /// Domain or collection endpoint, e.g. `https://search-logs-abc.us-east-1.es.amazonaws.com`
    pub endpoint: String,

    pub index: String,

    /// Query DSL as JSON. Either a bare query (`{"match": {...}}`) or a full search body
    /// with a top-level `query` key. Defaults to match_all.
    #[serde(default)]
    pub query_json: Option<String>,

    /// Number of hits (1-10000)
    #[serde(default = "default_size")]
    pub size: u32,

    /// Sign for OpenSearch Serverless (`aoss`) instead of a managed domain (`es`)
    #[serde(default)]
    pub serverless: bool,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Run a query against an Amazon OpenSearch index
pub struct OpenSearchSearchTool {
    config: Arc<ProviderConfig>,
}

impl OpenSearchSearchTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

/// Search request body for `query` (bare query or full body) and `size`.
pub fn search_body(query: Option<Value>, size: u32) -> Value {
    match query {
        Some(Value::Object(mut body)) if body.contains_key("query") => {
            body.entry("size").or_insert(json!(size));
            Value::Object(body)
        }
        Some(query) => json!({ "query": query, "size": size }),
        None => json!({ "query": { "match_all": {} }, "size": size }),
    }
}

fn search_url(endpoint: &str, index: &str) -> Result<Url, ToolError> {
    let base = Url::parse(endpoint)
        .map_err(|e| ToolError::validation(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
    if !matches!(base.scheme(), "https" | "http") || base.host_str().is_none() {
        return Err(ToolError::validation(format!(
            "endpoint must be an https URL, got '{}'",
            endpoint
        )));
    }
    Url::parse(&format!(
        "{}/{}/_search",
        base.as_str().trim_end_matches('/'),
        uri_encode(index)
    ))
    .map_err(|e| ToolError::validation(format!("Invalid index '{}': {}", index, e)))
}

fn simplify(response: &Value) -> Value {
    let hits = &response["hits"];
    // `total` is an object on OpenSearch and Elasticsearch 7+, a number before that.
    let total = match &hits["total"] {
        Value::Object(t) => t.get("value").cloned().unwrap_or(Value::Null),
        other => other.clone(),
    };
    let hits: Vec<Value> = hits["hits"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|hit| {
            json!({
                "id": hit["_id"],
                "index": hit["_index"],
                "score": hit["_score"],
                "source": hit["_source"],
            })
        })
        .collect();
    json!({
        "total": total,
        "max_score": response["hits"]["max_score"],
        "hits": hits,
    })
}

impl Tool for OpenSearchSearchTool {
    type Input = OpenSearchSearchInput;

    fn name(&self) -> &str {
        "opensearch_search"
    }

    fn description(&self) -> &str {
        "Search an Amazon OpenSearch Service domain or OpenSearch Serverless collection index with a query DSL body."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let endpoint = required(&input.endpoint, "endpoint")?;
        let index = required(&input.index, "index")?;
        let size = check_range(input.size, 1, 10_000, "size")?;
        let body = search_body(parse_json(&input.query_json, "query_json")?, size);
        let url = search_url(endpoint, index)?;
        let service = if input.serverless {
            OPENSEARCH_SERVERLESS
        } else {
            OPENSEARCH
        };

        let client = self.config.client(&input.credentials).await?;
        let request = AwsRequest::new(service, "Search", Method::POST, url).json_body(&body)?;
        let response = client.send(request).await?.json()?;

        Ok(ToolResult::Json(simplify(&response)))
    }
}
