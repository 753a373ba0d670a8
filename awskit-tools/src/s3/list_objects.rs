use crate::prelude::*;
use crate::utils::{check_range, optional, required};
use awskit_core::service::S3;
use awskit_core::{xml, AwsRequest};
use reqwest::Method;
use serde_json::{json, Value};

fn default_max_keys() -> u32 {
    100
}

/// Input for listing objects in a bucket
#[derive(Debug, Deserialize, JsonSchema)]
pub struct S3ListObjectsInput {
    /// Bucket to list
    pub bucket_name: String,

    /// Only list keys starting with this prefix
    #[serde(default)]
    pub prefix: Option<String>,

    /// Token from a previous truncated listing
    #[serde(default)]
    pub continuation_token: Option<String>,

    /// Maximum keys to return (1-1000)
    #[serde(default = "default_max_keys")]
    pub max_keys: u32,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// List objects in an S3 bucket, one page at a time
pub struct S3ListObjectsTool {
    config: Arc<ProviderConfig>,
}

impl S3ListObjectsTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

impl Tool for S3ListObjectsTool {
    type Input = S3ListObjectsInput;

    fn name(&self) -> &str {
        "s3_list_objects"
    }

    fn description(&self) -> &str {
        "List objects in an S3 bucket with optional prefix filtering and pagination."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let bucket = required(&input.bucket_name, "bucket_name")?;
        let max_keys = check_range(input.max_keys, 1, 1000, "max_keys")?;
        let prefix = optional(&input.prefix);
        let continuation_token = optional(&input.continuation_token);

        let client = self.config.client(&input.credentials).await?;

        let max_keys_param = max_keys.to_string();
        let mut query = vec![("list-type", "2"), ("max-keys", max_keys_param.as_str())];
        if let Some(prefix) = prefix {
            query.push(("prefix", prefix));
        }
        if let Some(token) = continuation_token {
            query.push(("continuation-token", token));
        }

        let url = client.s3_url(Some(bucket), None, &query)?;
        let body = client
            .send(AwsRequest::new(S3, "ListObjectsV2", Method::GET, url))
            .await?
            .text();

        let objects: Vec<Value> = xml::records(&body, "Contents")?
            .into_iter()
            .map(|record| {
                json!({
                    "key": record.get("Key"),
                    "size": record.get("Size").and_then(|s| s.parse::<u64>().ok()),
                    "last_modified": record.get("LastModified"),
                    "etag": record.get("ETag"),
                    "storage_class": record.get("StorageClass"),
                })
            })
            .collect();

        let is_truncated = xml::first_text(&body, "IsTruncated")?.as_deref() == Some("true");
        let next_token = xml::first_text(&body, "NextContinuationToken")?;

        let summary = if objects.is_empty() {
            format!("No objects found in bucket '{}' for the current filter.", bucket)
        } else {
            let sample: Vec<&str> = objects
                .iter()
                .take(5)
                .filter_map(|o| o["key"].as_str())
                .collect();
            format!("{} object(s) listed. Sample: {}", objects.len(), sample.join(", "))
        };

        Ok(ToolResult::Many(vec![
            ToolResult::Json(json!({
                "bucket_name": bucket,
                "prefix": prefix,
                "max_keys": max_keys,
                "continuation_token": continuation_token,
                "is_truncated": is_truncated,
                "next_continuation_token": next_token,
                "object_count": objects.len(),
                "objects": objects,
            })),
            ToolResult::Text(summary),
        ]))
    }
}
