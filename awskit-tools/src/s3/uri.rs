use awskit_core::ToolError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum S3UriError {
    #[error("Invalid S3 URI '{0}': must start with 's3://'")]
    Scheme(String),

    #[error("Invalid S3 URI '{0}': missing bucket name")]
    MissingBucket(String),

    #[error("Invalid S3 URI '{0}': missing object key, use s3://bucket/key")]
    MissingKey(String),
}

impl From<S3UriError> for ToolError {
    fn from(err: S3UriError) -> Self {
        ToolError::Validation(err.to_string())
    }
}

/// A parsed `s3://bucket/key` location. The key may be empty for bucket-level URIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Uri {
    pub bucket: String,
    pub key: String,
}

impl S3Uri {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse a URI that must name an object.
    pub fn parse_object(raw: &str) -> Result<Self, S3UriError> {
        let uri: Self = raw.parse()?;
        if uri.key.is_empty() {
            return Err(S3UriError::MissingKey(raw.to_string()));
        }
        Ok(uri)
    }

    /// Last path component of the key.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// The URI with a trailing `/` so it can serve as a prefix.
    pub fn as_prefix(&self) -> String {
        let uri = self.to_string();
        if uri.ends_with('/') {
            uri
        } else {
            format!("{}/", uri)
        }
    }
}

impl FromStr for S3Uri {
    type Err = S3UriError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let rest = raw
            .trim()
            .strip_prefix("s3://")
            .ok_or_else(|| S3UriError::Scheme(raw.to_string()))?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(S3UriError::MissingBucket(raw.to_string()));
        }
        Ok(Self::new(bucket, key.trim_start_matches('/')))
    }
}

impl fmt::Display for S3Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}
