use super::{
    default_presign_expiry, get_object, presign_get, put_object, S3Uri, MAX_PRESIGN_EXPIRY,
};
use crate::prelude::*;
use crate::utils::check_range;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    #[default]
    Read,
    Write,
}

/// Input for reading or writing a text object
#[derive(Debug, Deserialize, JsonSchema)]
pub struct S3OperatorInput {
    /// Object location, `s3://bucket/key`
    pub s3_uri: String,

    /// `read` returns the object text, `write` stores `text_content`
    #[serde(default)]
    pub operation_type: OperationType,

    /// Text to write (required for write)
    #[serde(default)]
    pub text_content: Option<String>,

    /// Return a presigned GET URL instead of the content / URI
    #[serde(default)]
    pub generate_presign_url: bool,

    /// Presigned URL lifetime in seconds (1-604800)
    #[serde(default = "default_presign_expiry")]
    pub presign_expiry: u64,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Read or write UTF-8 text objects in S3
pub struct S3OperatorTool {
    config: Arc<ProviderConfig>,
}

impl S3OperatorTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

impl Tool for S3OperatorTool {
    type Input = S3OperatorInput;

    fn name(&self) -> &str {
        "s3_operator"
    }

    fn description(&self) -> &str {
        "Read a text object from S3, write text to S3, or generate a presigned URL for an object."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let uri = S3Uri::parse_object(&input.s3_uri)?;
        check_range(input.presign_expiry, 1, MAX_PRESIGN_EXPIRY, "presign_expiry")?;

        let text_content = match input.operation_type {
            OperationType::Write => Some(
                input
                    .text_content
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        ToolError::validation("text_content is required for write operation")
                    })?,
            ),
            OperationType::Read => None,
        };

        let client = self.config.client(&input.credentials).await?;

        if let Some(text) = text_content {
            put_object(
                &client,
                &uri.bucket,
                &uri.key,
                "text/plain; charset=utf-8",
                text.into_bytes(),
            )
            .await?;

            if input.generate_presign_url {
                let url = presign_get(&client, &uri.bucket, &uri.key, input.presign_expiry).await?;
                return Ok(ToolResult::text(url));
            }
            return Ok(ToolResult::text(uri.to_string()));
        }

        if input.generate_presign_url {
            let url = presign_get(&client, &uri.bucket, &uri.key, input.presign_expiry).await?;
            return Ok(ToolResult::text(url));
        }

        let response = get_object(&client, &uri.bucket, &uri.key).await?;
        let text = String::from_utf8(response.body).map_err(|_| {
            ToolError::Custom(format!(
                "Object '{}' is not UTF-8 text; use s3_file_download for binary files",
                uri
            ))
        })?;
        Ok(ToolResult::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awskit_core::test_utils::mock_config;
    use serde_json::json;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn input(value: serde_json::Value) -> S3OperatorInput {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_read_returns_object_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notes/today.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello from s3"))
            .expect(1)
            .mount(&server)
            .await;

        let tool = S3OperatorTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(input(json!({"s3_uri": "s3://notes/today.txt"})))
            .await
            .unwrap();
        assert_eq!(result.as_text(), "hello from s3");
    }

    #[tokio::test]
    async fn test_write_puts_text_and_returns_uri() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/notes/out.txt"))
            .and(body_string("written"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let tool = S3OperatorTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(input(json!({
                "s3_uri": "s3://notes/out.txt",
                "operation_type": "write",
                "text_content": "written"
            })))
            .await
            .unwrap();
        assert_eq!(result.as_text(), "s3://notes/out.txt");
    }

    #[tokio::test]
    async fn test_presign_read_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tool = S3OperatorTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(input(json!({
                "s3_uri": "s3://notes/today.txt",
                "generate_presign_url": true,
                "presign_expiry": 600
            })))
            .await
            .unwrap();
        let url = result.as_text();
        assert!(url.starts_with(&format!("{}/notes/today.txt?", server.uri())));
        assert!(url.contains("X-Amz-Expires=600"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn test_write_without_content_is_rejected_before_any_call() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tool = S3OperatorTool::new(mock_config(&server.uri()));
        let err = tool
            .execute(input(json!({"s3_uri": "s3://notes/x.txt", "operation_type": "write"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[tokio::test]
    async fn test_invalid_inputs() {
        let tool = S3OperatorTool::new(mock_config("http://127.0.0.1:9"));

        let err = tool
            .execute(input(json!({"s3_uri": "bucket/key"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("s3://"));

        let err = tool
            .execute(input(json!({"s3_uri": "s3://b/k", "presign_expiry": 0})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("presign_expiry"));

        let err = tool
            .execute(input(json!({"s3_uri": "s3://b/k", "presign_expiry": 604801})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }
}
