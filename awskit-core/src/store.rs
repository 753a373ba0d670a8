//! Key-value persistence with per-entry time-to-live.
//!
//! [`KeyValueStore`] is the seam the browser session helper persists through. Two
//! backends ship here: [`MemoryStore`] for tests and single-process use, and
//! [`ParameterStore`] backed by AWS Systems Manager parameters.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::client::AwsClient;
use crate::error::ToolError;
use crate::service::SSM;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, ToolError>;

    /// Store `value` under `key`, replacing any previous value. The entry expires after `ttl`.
    async fn put_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ToolError>;

    /// Remove `key`. Returns whether an entry existed; deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<bool, ToolError>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, ToolError> {
        (**self).get(key).await
    }

    async fn put_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ToolError> {
        (**self).put_with_ttl(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, ToolError> {
        (**self).delete(key).await
    }
}

/// In-process store with lazy expiry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|(_, expires)| *expires > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ToolError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let live = entries
            .get(key)
            .filter(|(_, expires)| *expires > now)
            .map(|(value, _)| value.clone());
        if live.is_none() {
            entries.remove(key);
        }
        Ok(live)
    }

    async fn put_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ToolError> {
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, ToolError> {
        let removed = self.entries.lock().remove(key);
        Ok(matches!(removed, Some((_, expires)) if expires > Instant::now()))
    }
}

/// SSM Parameter Store backend.
///
/// Entries are `String` parameters in the Advanced tier with an Expiration policy, so
/// SSM deletes them on its own once the TTL passes.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    client: AwsClient,
}

impl ParameterStore {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }

    fn expiration_policy(ttl: Duration) -> Result<String, ToolError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| ToolError::validation(format!("TTL out of range: {}", e)))?;
        let expires_at = Utc::now() + ttl;
        Ok(json!([{
            "Type": "Expiration",
            "Version": "1.0",
            "Attributes": {
                "Timestamp": expires_at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
            }
        }])
        .to_string())
    }
}

#[async_trait]
impl KeyValueStore for ParameterStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ToolError> {
        match self
            .client
            .json_rpc(&SSM, "GetParameter", &json!({ "Name": key }))
            .await
        {
            Ok(response) => Ok(response["Parameter"]["Value"].as_str().map(str::to_string)),
            Err(ToolError::Upstream(e)) if e.code == "ParameterNotFound" => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ToolError> {
        let body = json!({
            "Name": key,
            "Value": value,
            "Type": "String",
            "Overwrite": true,
            "Tier": "Advanced",
            "Policies": Self::expiration_policy(ttl)?,
        });
        self.client.json_rpc(&SSM, "PutParameter", &body).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, ToolError> {
        match self
            .client
            .json_rpc(&SSM, "DeleteParameter", &json!({ "Name": key }))
            .await
        {
            Ok(_) => Ok(true),
            Err(ToolError::Upstream(e)) if e.code == "ParameterNotFound" => Ok(false),
            Err(e) => Err(e),
        }
    }
}
