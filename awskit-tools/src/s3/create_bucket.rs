use crate::prelude::*;
use crate::utils::required;
use awskit_core::service::S3;
use awskit_core::{xml, AwsRequest};
use reqwest::Method;
use serde_json::json;

/// Canned ACL applied at creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BucketAcl {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
}

impl BucketAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketAcl::Private => "private",
            BucketAcl::PublicRead => "public-read",
            BucketAcl::PublicReadWrite => "public-read-write",
            BucketAcl::AuthenticatedRead => "authenticated-read",
        }
    }
}

/// Input for creating a bucket
#[derive(Debug, Deserialize, JsonSchema)]
pub struct S3CreateBucketInput {
    /// Name of the new bucket
    pub bucket_name: String,

    /// Canned ACL; omitted means the S3 default (private)
    #[serde(default)]
    pub acl: Option<BucketAcl>,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Create an S3 bucket in the resolved region
pub struct S3CreateBucketTool {
    config: Arc<ProviderConfig>,
}

impl S3CreateBucketTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

impl Tool for S3CreateBucketTool {
    type Input = S3CreateBucketInput;

    fn name(&self) -> &str {
        "s3_create_bucket"
    }

    fn description(&self) -> &str {
        "Create a new S3 bucket in the configured region with an optional canned ACL."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let bucket = required(&input.bucket_name, "bucket_name")?;
        let client = self.config.client(&input.credentials).await?;
        let region = client.region().to_string();

        let url = client.s3_url(Some(bucket), None, &[])?;
        let mut request = AwsRequest::new(S3, "CreateBucket", Method::PUT, url);
        if let Some(acl) = input.acl {
            request = request.header("x-amz-acl", acl.as_str());
        }
        // us-east-1 rejects an explicit LocationConstraint
        if region != "us-east-1" {
            request = request
                .header("content-type", "application/xml")
                .body(format!(
                    "<CreateBucketConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
                     <LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>",
                    xml::escape(&region)
                ));
        }

        let response = client.send(request).await?;
        let location = response
            .header("location")
            .map(str::to_string)
            .unwrap_or_else(|| format!("/{}", bucket));

        let acl = input.acl.unwrap_or_default();
        let summary = format!("Bucket '{}' created in {}. Location: {}", bucket, region, location);
        Ok(ToolResult::Many(vec![
            ToolResult::Json(json!({
                "bucket_name": bucket,
                "region": region,
                "acl": acl.as_str(),
                "location": location,
                "s3_uri": format!("s3://{}/", bucket),
            })),
            ToolResult::Text(summary),
        ]))
    }
}
