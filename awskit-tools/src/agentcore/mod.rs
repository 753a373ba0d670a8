//! Amazon Bedrock AgentCore tools: code interpreter, memory and browser sessions.
//!
//! | Tool | Calls |
//! |------|-------|
//! | `agentcore_code_interpreter` | CreateCodeInterpreter, StartCodeInterpreterSession, InvokeCodeInterpreter |
//! | `agentcore_memory` | CreateMemory, GetMemory, CreateEvent, ListEvents |
//! | `agentcore_memory_search` | RetrieveMemoryRecords |
//! | `agentcore_browser_session` | Start/Get/StopBrowserSession, SSM parameters |
//!
//! The browser session tool persists a [`BrowserSessionRecord`] per live session so
//! later workflow steps can reconnect by id. [`BrowserSessionManager`] holds that
//! lifecycle and is generic over the store and the remote browser, so it can run
//! against [`awskit_core::MemoryStore`] and a fake remote in tests.

mod browser;
mod code_interpreter;
mod memory;
mod memory_search;

pub use browser::{
    AgentCoreBrowser, BrowserOperation, BrowserSessionInput, BrowserSessionManager,
    BrowserSessionRecord, BrowserSessionTool, CloseOutcome, OpenOutcome, RemoteBrowser,
    StartOptions, DEFAULT_BROWSER_IDENTIFIER,
};
pub use code_interpreter::{CodeInterpreterInput, CodeInterpreterTool, CodeLanguage};
pub use memory::{MemoryInput, MemoryOperation, MemoryTool};
pub use memory_search::{MemorySearchInput, MemorySearchTool};

use awskit_core::{box_tool, DynTool, ProviderConfig};
use std::sync::Arc;

/// Returns all AgentCore tools
pub fn all_tools(config: Arc<ProviderConfig>) -> Vec<Box<dyn DynTool>> {
    vec![
        box_tool(CodeInterpreterTool::new(config.clone())),
        box_tool(MemoryTool::new(config.clone())),
        box_tool(MemorySearchTool::new(config.clone())),
        box_tool(BrowserSessionTool::new(config)),
    ]
}
