use super::{get_object, S3Uri};
use crate::prelude::*;
use chrono::DateTime;
use serde_json::{json, Value};

/// Input for downloading an object
#[derive(Debug, Deserialize, JsonSchema)]
pub struct S3FileDownloadInput {
    /// Object location, `s3://bucket/key`
    pub s3_uri: String,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Download an S3 object as a binary blob with metadata
pub struct S3FileDownloadTool {
    config: Arc<ProviderConfig>,
}

impl S3FileDownloadTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

/// `Last-Modified` is an HTTP date; report it as RFC 3339.
fn http_date_to_rfc3339(value: &str) -> String {
    DateTime::parse_from_rfc2822(value)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|_| value.to_string())
}

fn metadata_text(metadata: &Value) -> String {
    metadata
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| match v {
                    Value::String(s) => format!("{}: {}", k, s),
                    other => format!("{}: {}", k, other),
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

impl Tool for S3FileDownloadTool {
    type Input = S3FileDownloadInput;

    fn name(&self) -> &str {
        "s3_file_download"
    }

    fn description(&self) -> &str {
        "Download a file from S3 and return it as a binary file together with its metadata."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let uri = S3Uri::parse_object(&input.s3_uri)?;
        let client = self.config.client(&input.credentials).await?;

        let response = get_object(&client, &uri.bucket, &uri.key).await?;

        let content_type = response
            .header("content-type")
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&uri.key)
                    .first_or_octet_stream()
                    .to_string()
            });
        let content_length = response
            .header("content-length")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(response.body.len() as u64);

        let metadata = json!({
            "bucket": uri.bucket,
            "key": uri.key,
            "content_type": content_type,
            "content_length": content_length,
            "etag": response.header("etag"),
            "last_modified": response.header("last-modified").map(http_date_to_rfc3339),
            "s3_uri": uri.to_string(),
        });
        let text = metadata_text(&metadata);

        let filename = match uri.file_name() {
            "" => "downloaded_file".to_string(),
            name => name.to_string(),
        };

        Ok(ToolResult::Many(vec![
            ToolResult::blob(response.body, content_type, Some(filename)),
            ToolResult::Json(metadata),
            ToolResult::Text(text),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awskit_core::test_utils::mock_config;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_http_date_conversion() {
        assert_eq!(
            http_date_to_rfc3339("Wed, 21 Oct 2015 07:28:00 GMT"),
            "2015-10-21T07:28:00+00:00"
        );
        assert_eq!(http_date_to_rfc3339("garbage"), "garbage");
    }

    #[tokio::test]
    async fn test_download_returns_blob_json_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/images/cat.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .insert_header("etag", "\"abc123\"")
                    .insert_header("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT")
                    .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tool = S3FileDownloadTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(
                serde_json::from_value(json!({"s3_uri": "s3://media/images/cat.png"})).unwrap(),
            )
            .await
            .unwrap();

        let blobs = result.blobs();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].data, vec![0x89, b'P', b'N', b'G']);
        assert_eq!(blobs[0].mime_type, "image/png");
        assert_eq!(blobs[0].filename.as_deref(), Some("cat.png"));

        let metadata = result.as_json().unwrap();
        assert_eq!(metadata["bucket"], "media");
        assert_eq!(metadata["key"], "images/cat.png");
        assert_eq!(metadata["content_length"], 4);
        assert_eq!(metadata["etag"], "\"abc123\"");
        assert_eq!(metadata["last_modified"], "2015-10-21T07:28:00+00:00");

        let ToolResult::Many(parts) = &result else {
            panic!("expected Many");
        };
        assert!(parts[2].as_text().contains("key: images/cat.png"));
    }

    #[tokio::test]
    async fn test_missing_key_in_uri_is_validation() {
        let tool = S3FileDownloadTool::new(mock_config("http://127.0.0.1:9"));
        let err = tool
            .execute(serde_json::from_value(json!({"s3_uri": "s3://media"})).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }
}
