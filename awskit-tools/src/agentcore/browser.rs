use crate::prelude::*;
use crate::utils::{check_range, clean_id, optional, timestamp_to_rfc3339};
use async_trait::async_trait;
use awskit_core::service::AGENTCORE;
use awskit_core::{AwsClient, KeyValueStore, ParameterStore};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_BROWSER_IDENTIFIER: &str = "aws.browser.v1";

/// Upper bound AgentCore accepts for a browser session timeout (8 hours).
const MAX_SESSION_TIMEOUT_SECS: u64 = 28_800;

/// What is persisted for a live remote browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserSessionRecord {
    pub session_id: String,
    pub browser_identifier: String,
    /// Automation (CDP) endpoint
    pub websocket_url: String,
    pub live_view_url: String,
    /// RFC 3339
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

/// Parameters for starting a remote session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOptions {
    pub browser_identifier: String,
    pub name: Option<String>,
    pub session_timeout_seconds: u64,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            browser_identifier: DEFAULT_BROWSER_IDENTIFIER.to_string(),
            name: None,
            session_timeout_seconds: 3600,
        }
    }
}

/// The service that owns the actual browser sessions.
#[async_trait]
pub trait RemoteBrowser: Send + Sync {
    async fn start(&self, options: &StartOptions) -> Result<BrowserSessionRecord, ToolError>;

    /// Whether the session can still take connections.
    async fn is_ready(&self, record: &BrowserSessionRecord) -> Result<bool, ToolError>;

    async fn stop(&self, record: &BrowserSessionRecord) -> Result<(), ToolError>;
}

#[async_trait]
impl<T: RemoteBrowser + ?Sized> RemoteBrowser for Arc<T> {
    async fn start(&self, options: &StartOptions) -> Result<BrowserSessionRecord, ToolError> {
        (**self).start(options).await
    }

    async fn is_ready(&self, record: &BrowserSessionRecord) -> Result<bool, ToolError> {
        (**self).is_ready(record).await
    }

    async fn stop(&self, record: &BrowserSessionRecord) -> Result<(), ToolError> {
        (**self).stop(record).await
    }
}

/// AgentCore Browser as the remote.
#[derive(Debug, Clone)]
pub struct AgentCoreBrowser {
    client: AwsClient,
}

impl AgentCoreBrowser {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteBrowser for AgentCoreBrowser {
    async fn start(&self, options: &StartOptions) -> Result<BrowserSessionRecord, ToolError> {
        let url = self.client.url(
            &AGENTCORE,
            &["browsers", &options.browser_identifier, "sessions", "start"],
            &[],
        )?;
        let mut body = json!({
            "sessionTimeoutSeconds": options.session_timeout_seconds,
            "clientToken": uuid::Uuid::new_v4().to_string(),
        });
        if let Some(name) = &options.name {
            body["name"] = json!(name);
        }
        let response = self
            .client
            .rest_json(&AGENTCORE, "StartBrowserSession", Method::PUT, url, Some(&body))
            .await?;

        let session_id = response["sessionId"]
            .as_str()
            .ok_or_else(|| ToolError::from("StartBrowserSession returned no sessionId"))?;
        let streams = &response["streams"];
        Ok(BrowserSessionRecord {
            session_id: session_id.to_string(),
            browser_identifier: response["browserIdentifier"]
                .as_str()
                .unwrap_or(&options.browser_identifier)
                .to_string(),
            websocket_url: streams["automationStream"]["streamEndpoint"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            live_view_url: streams["liveViewStream"]["streamEndpoint"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            created_at: timestamp_to_rfc3339(&response["createdAt"])
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
            headers: None,
        })
    }

    async fn is_ready(&self, record: &BrowserSessionRecord) -> Result<bool, ToolError> {
        let url = self.client.url(
            &AGENTCORE,
            &["browsers", &record.browser_identifier, "sessions", "get"],
            &[("sessionId", &record.session_id)],
        )?;
        let response = self
            .client
            .rest_json(&AGENTCORE, "GetBrowserSession", Method::GET, url, None)
            .await?;
        Ok(response["status"].as_str() == Some("READY"))
    }

    async fn stop(&self, record: &BrowserSessionRecord) -> Result<(), ToolError> {
        let url = self.client.url(
            &AGENTCORE,
            &["browsers", &record.browser_identifier, "sessions", "stop"],
            &[("sessionId", &record.session_id)],
        )?;
        let body = json!({ "clientToken": uuid::Uuid::new_v4().to_string() });
        self.client
            .rest_json(&AGENTCORE, "StopBrowserSession", Method::PUT, url, Some(&body))
            .await?;
        Ok(())
    }
}

/// Result of [`BrowserSessionManager::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOutcome {
    pub record: BrowserSessionRecord,
    /// The requested session was still live and is returned as is.
    pub resumed: bool,
}

/// Result of [`BrowserSessionManager::close`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOutcome {
    /// The record that was deleted, if there was one.
    pub record: Option<BrowserSessionRecord>,
    /// Why stopping the remote session failed; the record is deleted regardless.
    pub remote_stop_error: Option<String>,
}

/// Browser session lifecycle over a key-value store.
///
/// A record exists while the remote session is believed live. Concurrent `open` and
/// `close` calls on the same id are not coordinated: the last write wins, and the store
/// TTL eventually removes anything left behind.
pub struct BrowserSessionManager<S, R> {
    store: S,
    remote: R,
    prefix: String,
    ttl: Duration,
}

impl<S: KeyValueStore, R: RemoteBrowser> BrowserSessionManager<S, R> {
    pub fn new(store: S, remote: R, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            remote,
            prefix: prefix.into(),
            ttl,
        }
    }

    /// Manager using the prefix and TTL from `config`.
    pub fn from_config(store: S, remote: R, config: &ProviderConfig) -> Self {
        Self::new(store, remote, config.session_prefix.clone(), config.session_ttl)
    }

    /// Store key of a session record.
    pub fn key(&self, session_id: &str) -> String {
        format!("{}/{}", self.prefix.trim_end_matches('/'), session_id)
    }

    async fn load(&self, session_id: &str) -> Result<Option<BrowserSessionRecord>, ToolError> {
        match self.store.get(&self.key(session_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Like `load`, but a record that no longer parses is reported and treated as garbage.
    async fn load_lenient(
        &self,
        session_id: &str,
    ) -> Result<Option<Result<BrowserSessionRecord, serde_json::Error>>, ToolError> {
        let raw = self.store.get(&self.key(session_id)).await?;
        Ok(raw.map(|raw| {
            serde_json::from_str::<BrowserSessionRecord>(&raw).inspect_err(|e| {
                log::warn!("Discarding unreadable record for browser session {}: {}", session_id, e)
            })
        }))
    }

    async fn stop_quietly(&self, record: &BrowserSessionRecord) -> Option<String> {
        match self.remote.stop(record).await {
            Ok(()) => None,
            Err(e) => {
                log::warn!("Failed to stop browser session {}: {}", record.session_id, e);
                Some(e.to_string())
            }
        }
    }

    async fn start_and_persist(
        &self,
        options: &StartOptions,
    ) -> Result<BrowserSessionRecord, ToolError> {
        let record = self.remote.start(options).await?;
        let raw = serde_json::to_string(&record)?;
        self.store
            .put_with_ttl(&self.key(&record.session_id), &raw, self.ttl)
            .await?;
        log::debug!("Browser session {} opened", record.session_id);
        Ok(record)
    }

    /// Resume `session_id` if its remote session is still ready, otherwise start a new one.
    pub async fn open(
        &self,
        session_id: Option<&str>,
        options: &StartOptions,
    ) -> Result<OpenOutcome, ToolError> {
        if let Some(id) = session_id {
            match self.load_lenient(id).await? {
                Some(Ok(record)) => {
                    let ready = match self.remote.is_ready(&record).await {
                        Ok(ready) => ready,
                        Err(e) => {
                            log::warn!("Could not check browser session {}: {}", id, e);
                            false
                        }
                    };
                    if ready {
                        return Ok(OpenOutcome {
                            record,
                            resumed: true,
                        });
                    }
                    // The old session may still be running when the check itself failed.
                    self.stop_quietly(&record).await;
                    self.store.delete(&self.key(id)).await?;
                }
                Some(Err(_)) => {
                    self.store.delete(&self.key(id)).await?;
                }
                None => {}
            }
        }

        let record = self.start_and_persist(options).await?;
        Ok(OpenOutcome {
            record,
            resumed: false,
        })
    }

    /// The stored record for `session_id`.
    pub async fn use_session(&self, session_id: &str) -> Result<BrowserSessionRecord, ToolError> {
        self.load(session_id)
            .await?
            .ok_or_else(|| ToolError::SessionNotFound(session_id.to_string()))
    }

    /// Stop the remote session and delete its record. Closing an unknown id does nothing.
    ///
    /// The record is deleted even when stopping fails or the stored value is unreadable.
    pub async fn close(&self, session_id: &str) -> Result<CloseOutcome, ToolError> {
        let (record, remote_stop_error) = match self.load_lenient(session_id).await? {
            None => {
                return Ok(CloseOutcome {
                    record: None,
                    remote_stop_error: None,
                })
            }
            Some(Ok(record)) => {
                let stop_error = self.stop_quietly(&record).await;
                (Some(record), stop_error)
            }
            Some(Err(e)) => (None, Some(format!("stored record unreadable: {}", e))),
        };
        self.store.delete(&self.key(session_id)).await?;

        Ok(CloseOutcome {
            record,
            remote_stop_error,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BrowserOperation {
    /// Start a session, or resume `session_id` if it is still live
    Open,
    /// Read the stored session record
    Get,
    /// Stop the session and forget it
    Close,
}

fn default_browser_identifier() -> String {
    DEFAULT_BROWSER_IDENTIFIER.to_string()
}

fn default_session_timeout() -> u64 {
    3600
}

/// Input for managing a remote browser session
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BrowserSessionInput {
    pub operation: BrowserOperation,

    /// Required for get and close
    #[serde(default)]
    pub session_id: Option<String>,

    #[serde(default = "default_browser_identifier")]
    pub browser_identifier: String,

    /// Remote session lifetime (1-28800)
    #[serde(default = "default_session_timeout")]
    pub session_timeout_seconds: u64,

    /// Session name
    #[serde(default)]
    pub name: Option<String>,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Open, look up and close AgentCore browser sessions that outlive a single call
pub struct BrowserSessionTool {
    config: Arc<ProviderConfig>,
}

impl BrowserSessionTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

fn record_json(record: &BrowserSessionRecord) -> Result<Value, ToolError> {
    Ok(serde_json::to_value(record)?)
}

impl Tool for BrowserSessionTool {
    type Input = BrowserSessionInput;

    fn name(&self) -> &str {
        "agentcore_browser_session"
    }

    fn description(&self) -> &str {
        "Open, get or close an Amazon Bedrock AgentCore browser session. Session details are kept in SSM Parameter Store so later steps can reconnect by session id."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let session_id = clean_id(&input.session_id);
        let require_id = || {
            session_id.clone().ok_or_else(|| {
                ToolError::validation("session_id is required for get and close operations")
            })
        };
        if input.operation != BrowserOperation::Open {
            require_id()?;
        }
        let options = StartOptions {
            browser_identifier: input.browser_identifier.trim().to_string(),
            name: optional(&input.name).map(str::to_string),
            session_timeout_seconds: check_range(
                input.session_timeout_seconds,
                1,
                MAX_SESSION_TIMEOUT_SECS,
                "session_timeout_seconds",
            )?,
        };
        if options.browser_identifier.is_empty() {
            return Err(ToolError::validation("browser_identifier must not be empty"));
        }

        let client = self.config.client(&input.credentials).await?;
        let manager = BrowserSessionManager::from_config(
            ParameterStore::new(client.clone()),
            AgentCoreBrowser::new(client),
            &self.config,
        );

        let body = match input.operation {
            BrowserOperation::Open => {
                let outcome = manager.open(session_id.as_deref(), &options).await?;
                json!({
                    "state": if outcome.resumed { "resumed" } else { "opened" },
                    "record": record_json(&outcome.record)?,
                })
            }
            BrowserOperation::Get => json!({
                "state": "open",
                "record": record_json(&manager.use_session(&require_id()?).await?)?,
            }),
            BrowserOperation::Close => {
                let outcome = manager.close(&require_id()?).await?;
                let mut body = json!({
                    "state": "closed",
                    "record": outcome.record.as_ref().map(record_json).transpose()?,
                });
                if let Some(error) = outcome.remote_stop_error {
                    body["remote_stop_error"] = json!(error);
                }
                body
            }
        };
        Ok(ToolResult::Json(body))
    }
}
