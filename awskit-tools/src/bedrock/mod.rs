//! Amazon Bedrock tools: guardrails, knowledge bases and Nova Reel video generation.
//!
//! | Tool | Service | Operation |
//! |------|---------|-----------|
//! | `apply_guardrail` | bedrock-runtime | ApplyGuardrail |
//! | `bedrock_retrieve` | bedrock-agent-runtime | Retrieve |
//! | `bedrock_retrieve_and_generate` | bedrock-agent-runtime | RetrieveAndGenerate |
//! | `bedrock_kb_list` | bedrock-agent | ListKnowledgeBases |
//! | `bedrock_kb_list_data_sources` | bedrock-agent | ListDataSources |
//! | `bedrock_kb_start_ingestion_job` | bedrock-agent | StartIngestionJob |
//! | `nova_reel` | bedrock-runtime | StartAsyncInvoke, GetAsyncInvoke |

mod guardrail;
mod knowledge_base;
mod nova_reel;
mod retrieve;
mod retrieve_and_generate;

pub use guardrail::{ApplyGuardrailInput, ApplyGuardrailTool, GuardrailSource};
pub use knowledge_base::{
    KbListDataSourcesInput, KbListDataSourcesTool, KbListInput, KbListTool,
    KbStartIngestionJobInput, KbStartIngestionJobTool,
};
pub use nova_reel::{NovaReelInput, NovaReelTool};
pub use retrieve::{BedrockRetrieveInput, BedrockRetrieveTool, SearchType};
pub use retrieve_and_generate::{
    RetrieveAndGenerateInput, RetrieveAndGenerateTool, RetrieveAndGenerateType,
};

use awskit_core::{box_tool, DynTool, ProviderConfig};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How retrieval results are returned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResultType {
    Json,
    #[default]
    Text,
    /// Generated text followed by a numbered reference list
    TextWithCitations,
}

/// Returns all Bedrock tools
pub fn all_tools(config: Arc<ProviderConfig>) -> Vec<Box<dyn DynTool>> {
    vec![
        box_tool(ApplyGuardrailTool::new(config.clone())),
        box_tool(BedrockRetrieveTool::new(config.clone())),
        box_tool(RetrieveAndGenerateTool::new(config.clone())),
        box_tool(KbListTool::new(config.clone())),
        box_tool(KbListDataSourcesTool::new(config.clone())),
        box_tool(KbStartIngestionJobTool::new(config.clone())),
        box_tool(NovaReelTool::new(config)),
    ]
}
