//! S3 object and bucket tools.
//!
//! | Tool | Calls |
//! |------|-------|
//! | `s3_operator` | GetObject / PutObject, optional presigned URL |
//! | `s3_file_download` | GetObject, returned as a blob |
//! | `s3_file_uploader` | PutObject of a base64 or URL-sourced file |
//! | `s3_list_buckets` | ListBuckets, GetBucketLocation |
//! | `s3_list_objects` | ListObjectsV2 |
//! | `s3_create_bucket` | CreateBucket |

mod create_bucket;
mod download;
mod list_buckets;
mod list_objects;
mod operator;
mod uploader;
mod uri;

pub use create_bucket::{BucketAcl, S3CreateBucketInput, S3CreateBucketTool};
pub use download::{S3FileDownloadInput, S3FileDownloadTool};
pub use list_buckets::{S3ListBucketsInput, S3ListBucketsTool};
pub use list_objects::{S3ListObjectsInput, S3ListObjectsTool};
pub use operator::{OperationType, S3OperatorInput, S3OperatorTool};
pub use uploader::{InputFile, S3FileUploaderInput, S3FileUploaderTool};
pub use uri::{S3Uri, S3UriError};

use awskit_core::service::S3;
use awskit_core::{box_tool, AwsClient, AwsRequest, AwsResponse, DynTool, ProviderConfig, ToolError};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;

/// Longest lifetime SigV4 allows for a presigned URL (7 days).
pub const MAX_PRESIGN_EXPIRY: u64 = 604_800;

pub(crate) fn default_presign_expiry() -> u64 {
    3600
}

/// Presigned GET URL for `bucket/key`.
pub(crate) async fn presign_get(
    client: &AwsClient,
    bucket: &str,
    key: &str,
    expiry_secs: u64,
) -> Result<String, ToolError> {
    let url = client.s3_url(Some(bucket), Some(key), &[])?;
    client
        .presign(&S3, Method::GET, url, Duration::from_secs(expiry_secs))
        .await
}

/// GetObject of `bucket/key`.
pub(crate) async fn get_object(
    client: &AwsClient,
    bucket: &str,
    key: &str,
) -> Result<AwsResponse, ToolError> {
    let url = client.s3_url(Some(bucket), Some(key), &[])?;
    client
        .send(AwsRequest::new(S3, "GetObject", Method::GET, url))
        .await
}

/// PutObject of `body` at `bucket/key`.
pub(crate) async fn put_object(
    client: &AwsClient,
    bucket: &str,
    key: &str,
    content_type: &str,
    body: Vec<u8>,
) -> Result<(), ToolError> {
    let url = client.s3_url(Some(bucket), Some(key), &[])?;
    let request = AwsRequest::new(S3, "PutObject", Method::PUT, url)
        .header("content-type", content_type)
        .body(body);
    client.send(request).await?;
    Ok(())
}

/// Returns all S3 tools
pub fn all_tools(config: Arc<ProviderConfig>) -> Vec<Box<dyn DynTool>> {
    vec![
        box_tool(S3OperatorTool::new(config.clone())),
        box_tool(S3FileDownloadTool::new(config.clone())),
        box_tool(S3FileUploaderTool::new(config.clone())),
        box_tool(S3ListBucketsTool::new(config.clone())),
        box_tool(S3ListObjectsTool::new(config.clone())),
        box_tool(S3CreateBucketTool::new(config)),
    ]
}
