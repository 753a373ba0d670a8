use crate::prelude::*;
use crate::utils::optional;
use awskit_core::service::S3;
use awskit_core::{xml, AwsClient, AwsRequest};
use futures::future::join_all;
use reqwest::Method;
use serde_json::{json, Map, Value};

/// Input for listing buckets
#[derive(Debug, Deserialize, JsonSchema)]
pub struct S3ListBucketsInput {
    /// Look up each bucket's region (one extra call per bucket)
    #[serde(default)]
    pub include_region: bool,

    /// Only list buckets whose name starts with this prefix
    #[serde(default)]
    pub name_prefix: Option<String>,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// List the account's S3 buckets
pub struct S3ListBucketsTool {
    config: Arc<ProviderConfig>,
}

impl S3ListBucketsTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

/// Region of `bucket`. An empty LocationConstraint means us-east-1.
async fn bucket_region(client: &AwsClient, bucket: &str) -> Result<String, ToolError> {
    let url = client.s3_url(Some(bucket), None, &[("location", "")])?;
    let response = client
        .send(AwsRequest::new(S3, "GetBucketLocation", Method::GET, url))
        .await?;
    let constraint = xml::first_text(&response.text(), "LocationConstraint")?;
    Ok(match constraint.as_deref().map(str::trim) {
        None | Some("") => "us-east-1".to_string(),
        Some("EU") => "eu-west-1".to_string(),
        Some(region) => region.to_string(),
    })
}

impl Tool for S3ListBucketsTool {
    type Input = S3ListBucketsInput;

    fn name(&self) -> &str {
        "s3_list_buckets"
    }

    fn description(&self) -> &str {
        "List S3 buckets, optionally filtered by name prefix and annotated with their regions."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let client = self.config.client(&input.credentials).await?;
        let prefix = optional(&input.name_prefix).unwrap_or("");

        let url = client.s3_url(None, None, &[])?;
        let response = client
            .send(AwsRequest::new(S3, "ListBuckets", Method::GET, url))
            .await?;

        let mut buckets: Vec<Map<String, Value>> = xml::records(&response.text(), "Bucket")?
            .into_iter()
            .filter_map(|record| {
                let name = record.get("Name")?.clone();
                if !name.starts_with(prefix) {
                    return None;
                }
                let mut entry = Map::new();
                entry.insert("name".into(), json!(name));
                entry.insert("creation_date".into(), json!(record.get("CreationDate")));
                Some(entry)
            })
            .collect();

        if input.include_region {
            let lookups = buckets.iter().map(|entry| {
                let name = entry["name"].as_str().unwrap_or_default().to_string();
                let client = &client;
                async move { bucket_region(client, &name).await }
            });
            let regions = join_all(lookups).await;
            for (entry, region) in buckets.iter_mut().zip(regions) {
                match region {
                    Ok(region) => {
                        entry.insert("region".into(), json!(region));
                    }
                    Err(e) => {
                        let message = e.upstream().map(|u| u.message.clone()).unwrap_or_else(|| e.to_string());
                        entry.insert("region_lookup_error".into(), json!(message));
                    }
                }
            }
        }

        let summary = if buckets.is_empty() {
            "No buckets matched the current filter.".to_string()
        } else {
            let names: Vec<&str> = buckets
                .iter()
                .filter_map(|b| b["name"].as_str())
                .collect();
            format!("{} bucket(s): {}", buckets.len(), names.join(", "))
        };

        Ok(ToolResult::Many(vec![
            ToolResult::Json(json!({
                "bucket_count": buckets.len(),
                "buckets": buckets,
            })),
            ToolResult::Text(summary),
        ]))
    }
}
