use crate::prelude::*;
use crate::utils::{check_range, clean_id, optional, short_id, timestamp_suffix, timestamp_to_rfc3339};
use awskit_core::service::{AGENTCORE, AGENTCORE_CONTROL};
use awskit_core::{poll_until, AwsClient, PollStatus, UpstreamError};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;

/// Longest wait for a new memory resource to become ACTIVE.
const MEMORY_READY_TIMEOUT: Duration = Duration::from_secs(300);

/// Days events are kept in an auto-created memory.
const EVENT_EXPIRY_DAYS: u32 = 90;

const RECORD_ACK: &str = "Information recorded successfully.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MemoryOperation {
    /// Store `information` as a conversation turn
    Record,
    /// Fetch the most recent turns
    Retrieve,
}

fn default_max_results() -> u32 {
    10
}

/// Input for recording to or reading from AgentCore memory
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MemoryInput {
    pub operation: MemoryOperation,

    /// Memory resource id; all three ids are generated when any is missing
    #[serde(default)]
    pub memory_id: Option<String>,

    #[serde(default)]
    pub actor_id: Option<String>,

    #[serde(default)]
    pub session_id: Option<String>,

    /// Text to record (record only)
    #[serde(default)]
    pub information: Option<String>,

    /// Number of events to retrieve (1-50)
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    #[serde(flatten)]
    pub credentials: AwsCredentialParams,
}

/// Record and retrieve conversation history in Amazon Bedrock AgentCore memory
pub struct MemoryTool {
    config: Arc<ProviderConfig>,
}

impl MemoryTool {
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        Self { config }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MemoryIds {
    memory_id: String,
    actor_id: String,
    session_id: String,
    created: bool,
}

fn default_strategies() -> Value {
    json!([
        {"semanticMemoryStrategy": {
            "name": "semanticMemory",
            "namespaces": ["/semantic/{actorId}/{sessionId}"]
        }},
        {"summaryMemoryStrategy": {
            "name": "summaryMemory",
            "namespaces": ["/summaries/{actorId}/{sessionId}"]
        }},
        {"userPreferenceMemoryStrategy": {
            "name": "userPreferenceMemory",
            "namespaces": ["/userPreference/{actorId}/{sessionId}"]
        }}
    ])
}

async fn check_memory(client: &AwsClient, memory_id: &str) -> Result<PollStatus<()>, ToolError> {
    let url = client.url(&AGENTCORE_CONTROL, &["memories", memory_id, "details"], &[])?;
    let response = client
        .rest_json(&AGENTCORE_CONTROL, "GetMemory", Method::GET, url, None)
        .await?;
    match response["memory"]["status"].as_str().unwrap_or_default() {
        "ACTIVE" => Ok(PollStatus::Done(())),
        "FAILED" => Err(UpstreamError::new(
            AGENTCORE_CONTROL.name,
            "GetMemory",
            None,
            "MemoryCreationFailed",
            response["memory"]["failureReason"]
                .as_str()
                .unwrap_or("Memory resource failed to become ACTIVE"),
        )
        .into()),
        other => Ok(PollStatus::Pending(other.to_string())),
    }
}

/// Create a memory resource, wait for it, and mint actor/session ids for it.
async fn create_memory(client: &AwsClient, poll_interval: Duration) -> Result<MemoryIds, ToolError> {
    let url = client.url(&AGENTCORE_CONTROL, &["memories", "create"], &[])?;
    let body = json!({
        "name": format!("autoMemory_{}", timestamp_suffix()),
        "description": "Auto-created memory resource",
        "eventExpiryDuration": EVENT_EXPIRY_DAYS,
        "memoryStrategies": default_strategies(),
        "clientToken": uuid::Uuid::new_v4().to_string(),
    });
    let response = client
        .rest_json(&AGENTCORE_CONTROL, "CreateMemory", Method::POST, url, Some(&body))
        .await?;
    let memory_id = response["memory"]["id"]
        .as_str()
        .ok_or_else(|| ToolError::from("CreateMemory returned no memory id"))?
        .to_string();
    log::debug!("Created memory resource {}", memory_id);

    poll_until("memory resource", poll_interval, MEMORY_READY_TIMEOUT, || {
        check_memory(client, &memory_id)
    })
    .await?;

    Ok(MemoryIds {
        memory_id,
        actor_id: format!("actor_{}", short_id()),
        session_id: format!("session_{}", short_id()),
        created: true,
    })
}

fn event_messages(event: &Value) -> Vec<Value> {
    event["payload"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|p| p.get("conversational"))
        .map(|c| json!({ "role": c["role"], "content": c["content"]["text"] }))
        .collect()
}

impl Tool for MemoryTool {
    type Input = MemoryInput;

    fn name(&self) -> &str {
        "agentcore_memory"
    }

    fn description(&self) -> &str {
        "Record information to, or retrieve recent conversation turns from, Amazon Bedrock AgentCore memory. Creates a memory resource when ids are not supplied."
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        let information = match input.operation {
            MemoryOperation::Record => Some(
                optional(&input.information)
                    .ok_or_else(|| ToolError::validation("information is required for record"))?,
            ),
            MemoryOperation::Retrieve => None,
        };
        let max_results = check_range(input.max_results, 1, 50, "max_results")?;

        let client = self.config.client(&input.credentials).await?;
        let ids = match (
            clean_id(&input.memory_id),
            clean_id(&input.actor_id),
            clean_id(&input.session_id),
        ) {
            (Some(memory_id), Some(actor_id), Some(session_id)) => MemoryIds {
                memory_id,
                actor_id,
                session_id,
                created: false,
            },
            _ => create_memory(&client, self.config.poll_interval).await?,
        };

        let mut data = json!({
            "memory_id": ids.memory_id,
            "actor_id": ids.actor_id,
            "session_id": ids.session_id,
            "memory_created": ids.created,
        });

        let message = if let Some(information) = information {
            let url = client.url(&AGENTCORE, &["memories", ids.memory_id.as_str(), "events"], &[])?;
            let body = json!({
                "actorId": ids.actor_id,
                "sessionId": ids.session_id,
                "eventTimestamp": Utc::now().timestamp(),
                "payload": [
                    {"conversational": {"content": {"text": information}, "role": "USER"}},
                    {"conversational": {"content": {"text": RECORD_ACK}, "role": "ASSISTANT"}}
                ],
                "clientToken": uuid::Uuid::new_v4().to_string(),
            });
            let response = client
                .rest_json(&AGENTCORE, "CreateEvent", Method::POST, url, Some(&body))
                .await?;
            data["event_id"] = response["event"]["eventId"].clone();
            data["information_length"] = json!(information.chars().count());
            "Information recorded successfully".to_string()
        } else {
            let url = client.url(
                &AGENTCORE,
                &[
                    "memories",
                    ids.memory_id.as_str(),
                    "actor",
                    ids.actor_id.as_str(),
                    "sessions",
                    ids.session_id.as_str(),
                ],
                &[],
            )?;
            let body = json!({ "includePayloads": true, "maxResults": max_results });
            let response = client
                .rest_json(&AGENTCORE, "ListEvents", Method::POST, url, Some(&body))
                .await?;
            let turns: Vec<Value> = response["events"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|event| {
                    json!({
                        "event_id": event["eventId"],
                        "messages": event_messages(event),
                        "created_at": timestamp_to_rfc3339(&event["eventTimestamp"]),
                    })
                })
                .collect();
            data["turns_requested"] = json!(max_results);
            data["turns_retrieved"] = json!(turns.len());
            data["conversation_turns"] = json!(turns);
            format!("Retrieved last {} conversation turns successfully", turns.len())
        };

        Ok(ToolResult::Json(json!({ "message": message, "data": data })))
    }
}
