use super::{default_presign_expiry, presign_get, put_object, MAX_PRESIGN_EXPIRY};
use crate::prelude::*;
use crate::utils::{check_range, optional, required};
use base64::Engine;
use serde_json::json;

/// A file handed over by the host, inline or by URL.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct InputFile {
    /// Base64-encoded file content
    #[serde(default)]
    pub data_base64: Option<String>,

    /// URL to download the file from (used when no inline data is given)
    #[serde(default)]
    pub url: Option<String>,

    /// File name, used in the object key
    #[serde(default)]
    pub filename: Option<String>,

    /// MIME type of the file
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Input for uploading a file to S3
#[derive(Debug, Deserialize, JsonSchema)]
pub struct S3FileUploaderInput {
    /// The file to upload
    pub input_file: InputFile,

    /// Destination bucket
    pub bucket_name: String,

    /// Key prefix (surrounding slashes are trimmed)
    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Object key; defaults to the file name
    #[serde(default)]
    pub object_key: Option<String>,

    /// Also return a presigned GET URL for the uploaded object
    #[serde(default)]
    pub generate_presign_url: bool,

    /// Presigned URL lifetime in seconds (1-604800)
    #[serde(default = "default_presign_expiry")]
    pub presign_expiry: u64,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Upload a workflow file to S3
pub struct S3FileUploaderTool {
    config: Arc<ProviderConfig>,
}

impl S3FileUploaderTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

/// Object key: explicit key, then file name, then URL tail, then a generated name.
fn object_key(input: &S3FileUploaderInput) -> String {
    let url_tail = optional(&input.input_file.url)
        .and_then(|u| u.trim_end_matches('/').rsplit('/').next())
        .map(|tail| tail.split(['?', '#']).next().unwrap_or(tail))
        .filter(|tail| !tail.is_empty())
        .map(str::to_string);

    let key = optional(&input.object_key)
        .or_else(|| optional(&input.input_file.filename))
        .map(str::to_string)
        .or(url_tail)
        .unwrap_or_else(|| format!("upload-{}", uuid::Uuid::new_v4().simple()));
    let key = key.trim_start_matches('/');

    match optional(&input.key_prefix).map(|p| p.trim_matches(|c| c == '/' || c == ' ')) {
        Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, key),
        _ => key.to_string(),
    }
}

impl Tool for S3FileUploaderTool {
    type Input = S3FileUploaderInput;

    fn name(&self) -> &str {
        "s3_file_uploader"
    }

    fn description(&self) -> &str {
        "Upload a file to an S3 bucket and return its S3 URI, optionally with a presigned URL."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let bucket = required(&input.bucket_name, "bucket_name")?.to_string();
        check_range(input.presign_expiry, 1, MAX_PRESIGN_EXPIRY, "presign_expiry")?;

        let inline = optional(&input.input_file.data_base64)
            .map(|data| {
                base64::engine::general_purpose::STANDARD
                    .decode(data)
                    .map_err(|e| ToolError::validation(format!("input_file.data_base64 is not valid base64: {}", e)))
            })
            .transpose()?;
        if inline.is_none() && optional(&input.input_file.url).is_none() {
            return Err(ToolError::validation(
                "input_file requires data_base64 or url",
            ));
        }

        let key = object_key(&input);
        let client = self.config.client(&input.credentials).await?;

        let (data, fetched_type) = match inline {
            Some(data) => (data, None),
            None => {
                let url = optional(&input.input_file.url).unwrap_or_default();
                let fetched = client.fetch(url).await?;
                (fetched.data, fetched.content_type)
            }
        };

        let content_type = optional(&input.input_file.mime_type)
            .map(str::to_string)
            .or(fetched_type)
            .unwrap_or_else(|| mime_guess::from_path(&key).first_or_octet_stream().to_string());

        put_object(&client, &bucket, &key, &content_type, data).await?;

        let s3_uri = format!("s3://{}/{}", bucket, key);
        let mut payload = json!({
            "bucket_name": bucket,
            "object_key": key,
            "s3_uri": s3_uri,
        });

        let text = if input.generate_presign_url {
            let presigned = presign_get(&client, &bucket, &key, input.presign_expiry).await?;
            payload["presigned_url"] = json!(presigned);
            payload["presign_expiry"] = json!(input.presign_expiry);
            presigned
        } else {
            s3_uri
        };

        Ok(ToolResult::Many(vec![
            ToolResult::Json(payload),
            ToolResult::Text(text),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awskit_core::test_utils::mock_config;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn input(value: serde_json::Value) -> S3FileUploaderInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_object_key_precedence() {
        let mut i = input(json!({
            "input_file": {"data_base64": "", "filename": "report.pdf", "url": "https://x/y/z.bin"},
            "bucket_name": "b",
            "key_prefix": "/uploads/2024/",
            "object_key": "/final.pdf"
        }));
        assert_eq!(object_key(&i), "uploads/2024/final.pdf");

        i.object_key = None;
        assert_eq!(object_key(&i), "uploads/2024/report.pdf");

        i.input_file.filename = None;
        assert_eq!(object_key(&i), "uploads/2024/z.bin");

        i.input_file.url = None;
        i.key_prefix = None;
        let generated = object_key(&i);
        assert!(generated.starts_with("upload-"));
        assert_eq!(generated.len(), "upload-".len() + 32);
    }

    #[tokio::test]
    async fn test_uploads_inline_data() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/assets/in/hello.txt"))
            .and(header("content-type", "text/plain"))
            .and(body_bytes(b"hello".to_vec()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let tool = S3FileUploaderTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(input(json!({
                "input_file": {"data_base64": "aGVsbG8=", "filename": "hello.txt", "mime_type": "text/plain"},
                "bucket_name": "assets",
                "key_prefix": "in"
            })))
            .await
            .unwrap();

        let payload = result.as_json().unwrap();
        assert_eq!(payload["s3_uri"], "s3://assets/in/hello.txt");
        assert!(payload.get("presigned_url").is_none());
    }

    #[tokio::test]
    async fn test_uploads_from_url_with_presign() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/photo.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![1, 2, 3]),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/assets/photo.jpg"))
            .and(header("content-type", "image/jpeg"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let tool = S3FileUploaderTool::new(mock_config(&server.uri()));
        let result = tool
            .execute(input(json!({
                "input_file": {"url": format!("{}/files/photo.jpg", server.uri())},
                "bucket_name": "assets",
                "generate_presign_url": true
            })))
            .await
            .unwrap();

        let payload = result.as_json().unwrap();
        assert_eq!(payload["object_key"], "photo.jpg");
        assert_eq!(payload["presign_expiry"], 3600);
        assert!(payload["presigned_url"]
            .as_str()
            .unwrap()
            .contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn test_requires_file_content() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tool = S3FileUploaderTool::new(mock_config(&server.uri()));
        let err = tool
            .execute(input(json!({"input_file": {"filename": "a.txt"}, "bucket_name": "b"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));

        let err = tool
            .execute(input(json!({"input_file": {"data_base64": "!!"}, "bucket_name": "b"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("base64"));
    }
}
