//! SigV4-signed HTTP access to AWS services.
//!
//! Requests are built by hand and signed with `aws-sigv4`, then sent through `reqwest`.
//! A client is bound to one region and one credentials provider for the lifetime of a
//! single tool invocation.

use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{
    sign, PayloadChecksumKind, PercentEncodingMode, SignableBody, SignableRequest,
    SignatureLocation, SigningSettings, UriPathNormalizationMode,
};
use aws_sigv4::sign::v4;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::{Duration, SystemTime};
use url::Url;

use crate::error::{ToolError, UpstreamError};
use crate::service::{Protocol, Service};
use crate::xml;

/// Percent-encode everything except RFC 3986 unreserved characters.
pub fn uri_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

fn encode_query(query: &[(&str, &str)]) -> String {
    query
        .iter()
        .map(|(k, v)| {
            if v.is_empty() {
                uri_encode(k)
            } else {
                format!("{}={}", uri_encode(k), uri_encode(v))
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn host_header(url: &Url) -> Result<String, ToolError> {
    let host = url
        .host_str()
        .ok_or_else(|| ToolError::from(format!("Endpoint has no host: {}", url)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// A request waiting to be signed and sent.
#[derive(Debug, Clone)]
pub struct AwsRequest {
    pub service: Service,
    pub operation: String,
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl AwsRequest {
    pub fn new(service: Service, operation: impl Into<String>, method: Method, url: Url) -> Self {
        Self {
            service,
            operation: operation.into(),
            method,
            url,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn json_body(self, body: &Value) -> Result<Self, ToolError> {
        Ok(self
            .header("content-type", "application/json")
            .body(serde_json::to_vec(body)?))
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct AwsResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl AwsResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body parsed as JSON; an empty body reads as `{}`.
    pub fn json(&self) -> Result<Value, ToolError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(Default::default()));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A file fetched from a plain (unsigned) URL.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// Region-bound, credential-bound AWS client.
#[derive(Debug, Clone)]
pub struct AwsClient {
    http: Client,
    credentials: SharedCredentialsProvider,
    region: String,
    endpoint_url: Option<String>,
}

impl AwsClient {
    pub fn new(http: Client, credentials: SharedCredentialsProvider, region: impl Into<String>) -> Self {
        Self {
            http,
            credentials,
            region: region.into(),
            endpoint_url: None,
        }
    }

    /// Send every service's requests to `endpoint_url` instead of the AWS endpoint.
    pub fn with_endpoint_url(mut self, endpoint_url: Option<String>) -> Self {
        self.endpoint_url = endpoint_url.map(|u| u.trim_end_matches('/').to_string());
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Base URL for a service: the override if one is set, else the regional endpoint.
    pub fn base_url(&self, service: &Service) -> String {
        self.endpoint_url
            .clone()
            .unwrap_or_else(|| service.endpoint(&self.region))
    }

    /// Build `base/<seg>/<seg>?query` with each path segment percent-encoded.
    pub fn url(
        &self,
        service: &Service,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Url, ToolError> {
        build_url(&self.base_url(service), segments, query)
    }

    /// URL for an S3 bucket and optional key.
    ///
    /// Uses virtual-hosted style for DNS-safe bucket names and path style otherwise
    /// (and always under an endpoint override).
    pub fn s3_url(
        &self,
        bucket: Option<&str>,
        key: Option<&str>,
        query: &[(&str, &str)],
    ) -> Result<Url, ToolError> {
        let key_segments: Vec<&str> = key.map(|k| k.split('/').collect()).unwrap_or_default();

        let virtual_host = bucket.filter(|b| {
            self.endpoint_url.is_none()
                && !b.contains('.')
                && b.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        });

        match (virtual_host, bucket) {
            (Some(b), _) => build_url(
                &format!("https://{}.s3.{}.amazonaws.com", b, self.region),
                &key_segments,
                query,
            ),
            (None, Some(b)) => {
                let mut segments = vec![b];
                segments.extend(key_segments);
                build_url(&self.base_url(&crate::service::S3), &segments, query)
            }
            (None, None) => build_url(&self.base_url(&crate::service::S3), &[], query),
        }
    }

    async fn identity(&self) -> Result<aws_credential_types::Credentials, ToolError> {
        self.credentials
            .provide_credentials()
            .await
            .map_err(|e| ToolError::from(format!("Failed to get AWS credentials: {}", e)))
    }

    fn settings_for(service: &Service) -> SigningSettings {
        let mut settings = SigningSettings::default();
        if service.is_s3() {
            settings.percent_encoding_mode = PercentEncodingMode::Single;
            settings.uri_path_normalization_mode = UriPathNormalizationMode::Disabled;
            settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
        }
        // OpenSearch Serverless rejects requests without x-amz-content-sha256.
        if service.signing_name == "aoss" {
            settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
        }
        settings
    }

    /// Headers to send, including the signature.
    async fn signed_headers(&self, request: &AwsRequest) -> Result<Vec<(String, String)>, ToolError> {
        let credentials = self.identity().await?;
        let mut headers = vec![("host".to_string(), host_header(&request.url)?)];
        headers.extend(request.headers.iter().cloned());

        let identity = credentials.into();
        let signing_params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(request.service.signing_name)
            .time(SystemTime::now())
            .settings(Self::settings_for(&request.service))
            .build()
            .map_err(|e| ToolError::from(format!("Failed to build signing params: {}", e)))?;

        let signable_request = SignableRequest::new(
            request.method.as_str(),
            request.url.as_str(),
            headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            SignableBody::Bytes(&request.body),
        )
        .map_err(|e| ToolError::from(format!("Failed to create signable request: {}", e)))?;

        let (signing_instructions, _signature) = sign(signable_request, &signing_params.into())
            .map_err(|e| ToolError::from(format!("Failed to sign request: {}", e)))?
            .into_parts();

        for (name, value) in signing_instructions.headers() {
            headers.push((name.to_string(), value.to_string()));
        }
        Ok(headers)
    }

    /// Sign and send a request. Non-2xx responses become [`UpstreamError`]s.
    pub async fn send(&self, request: AwsRequest) -> Result<AwsResponse, ToolError> {
        let headers = self.signed_headers(&request).await?;

        let mut builder = self.http.request(request.method.clone(), request.url.clone());
        for (name, value) in &headers {
            // reqwest derives Host from the URL
            if name != "host" {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(request.service.name, &request.operation, e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::transport(request.service.name, &request.operation, e))?
            .to_vec();

        log::debug!(
            "{}.{} {} -> HTTP {}",
            request.service.name,
            request.operation,
            request.method,
            status
        );

        if !(200..300).contains(&status) {
            return Err(parse_error(
                request.service.name,
                &request.operation,
                status,
                &headers,
                &body,
            )
            .into());
        }

        Ok(AwsResponse {
            status,
            headers,
            body,
        })
    }

    /// Call an `x-amz-target` JSON operation and return the parsed response body.
    pub async fn json_rpc(
        &self,
        service: &Service,
        operation: &str,
        body: &Value,
    ) -> Result<Value, ToolError> {
        let Protocol::Json {
            version,
            target_prefix,
        } = service.protocol
        else {
            return Err(ToolError::from(format!(
                "{} does not use the JSON protocol",
                service.name
            )));
        };

        let url = self.url(service, &[], &[])?;
        let request = AwsRequest::new(*service, operation, Method::POST, url)
            .header("content-type", format!("application/x-amz-json-{}", version))
            .header("x-amz-target", format!("{}.{}", target_prefix, operation))
            .body(serde_json::to_vec(body)?);

        self.send(request).await?.json()
    }

    /// Call a REST-JSON operation and return the parsed response body.
    pub async fn rest_json(
        &self,
        service: &Service,
        operation: &str,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, ToolError> {
        let mut request = AwsRequest::new(*service, operation, method, url);
        if let Some(body) = body {
            request = request.json_body(body)?;
        }
        self.send(request).await?.json()
    }

    /// Query-signed URL granting `method` on `url` for `expires_in`.
    pub async fn presign(
        &self,
        service: &Service,
        method: Method,
        url: Url,
        expires_in: Duration,
    ) -> Result<String, ToolError> {
        let credentials = self.identity().await?;
        let host = host_header(&url)?;

        let mut settings = SigningSettings::default();
        if service.is_s3() {
            settings.percent_encoding_mode = PercentEncodingMode::Single;
            settings.uri_path_normalization_mode = UriPathNormalizationMode::Disabled;
        }
        settings.signature_location = SignatureLocation::QueryParams;
        settings.expires_in = Some(expires_in);

        let identity = credentials.into();
        let signing_params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(service.signing_name)
            .time(SystemTime::now())
            .settings(settings)
            .build()
            .map_err(|e| ToolError::from(format!("Failed to build signing params: {}", e)))?;

        let signable_request = SignableRequest::new(
            method.as_str(),
            url.as_str(),
            std::iter::once(("host", host.as_str())),
            SignableBody::UnsignedPayload,
        )
        .map_err(|e| ToolError::from(format!("Failed to create signable request: {}", e)))?;

        let (signing_instructions, _signature) = sign(signable_request, &signing_params.into())
            .map_err(|e| ToolError::from(format!("Failed to presign request: {}", e)))?
            .into_parts();

        let signature_params: Vec<String> = signing_instructions
            .params()
            .iter()
            .map(|(name, value)| format!("{}={}", uri_encode(name), uri_encode(value)))
            .collect();

        let mut presigned = url;
        let query = match presigned.query() {
            Some(existing) if !existing.is_empty() => {
                format!("{}&{}", existing, signature_params.join("&"))
            }
            _ => signature_params.join("&"),
        };
        presigned.set_query(Some(&query));
        Ok(presigned.to_string())
    }

    /// Unsigned GET of a caller-supplied URL (input files, transcripts, GIFs).
    pub async fn fetch(&self, url: &str) -> Result<FetchedFile, ToolError> {
        let parsed = Url::parse(url)
            .map_err(|e| ToolError::validation(format!("Invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ToolError::validation(format!(
                "Unsupported URL scheme '{}'; use http or https",
                parsed.scheme()
            )));
        }

        let response = self
            .http
            .get(parsed)
            .send()
            .await
            .map_err(|e| UpstreamError::transport("http", "GET", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::new(
                "http",
                "GET",
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or("HttpError").replace(' ', ""),
                format!("Failed to download {}", url),
            )
            .into());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::transport("http", "GET", e))?
            .to_vec();

        Ok(FetchedFile { data, content_type })
    }
}

fn build_url(base: &str, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, ToolError> {
    let path = segments
        .iter()
        .map(|s| uri_encode(s))
        .collect::<Vec<_>>()
        .join("/");
    let mut url = Url::parse(&format!("{}/{}", base.trim_end_matches('/'), path))
        .map_err(|e| ToolError::from(format!("Invalid endpoint URL: {}", e)))?;
    if !query.is_empty() {
        url.set_query(Some(&encode_query(query)));
    }
    Ok(url)
}

/// Strip namespaces and trailers from an AWS error code.
///
/// `com.amazon.coral#ValidationException` and `ValidationException:http://...` both
/// become `ValidationException`.
fn clean_code(raw: &str) -> String {
    let head = raw.split(':').next().unwrap_or(raw);
    head.rsplit('#').next().unwrap_or(head).trim().to_string()
}

fn json_str<'a>(value: &'a Value, paths: &[&[&str]]) -> Option<&'a str> {
    paths.iter().find_map(|path| {
        path.iter()
            .try_fold(value, |v, key| v.get(*key))
            .and_then(Value::as_str)
    })
}

/// Build an [`UpstreamError`] from a failed response, keeping the service's own code
/// and message.
pub fn parse_error(
    service: &str,
    operation: &str,
    status: u16,
    headers: &HeaderMap,
    body: &[u8],
) -> UpstreamError {
    let text = String::from_utf8_lossy(body);
    let header_code = headers
        .get("x-amzn-errortype")
        .and_then(|v| v.to_str().ok())
        .map(clean_code);

    let (body_code, body_message) = if let Ok(json) = serde_json::from_slice::<Value>(body) {
        (
            json_str(&json, &[&["__type"], &["code"], &["Code"], &["Error", "Code"]])
                .map(clean_code),
            json_str(
                &json,
                &[&["message"], &["Message"], &["Error", "Message"], &["errorMessage"]],
            )
            .map(str::to_string),
        )
    } else if text.trim_start().starts_with('<') {
        match xml::error_fields(&text) {
            Some((code, message)) => (Some(code), Some(message)),
            None => (None, None),
        }
    } else {
        (None, None)
    };

    let code = header_code.or(body_code).unwrap_or_else(|| match status {
        404 => "NotFound".to_string(),
        _ => "Unknown".to_string(),
    });
    let message = body_message.unwrap_or_else(|| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            format!("HTTP {}", status)
        } else {
            trimmed.chars().take(500).collect()
        }
    });

    UpstreamError::new(service, operation, Some(status), code, message)
}
