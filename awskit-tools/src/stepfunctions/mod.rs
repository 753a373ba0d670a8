//! AWS Step Functions tools.

mod start_execution;

pub use start_execution::{StartExecutionInput, StartExecutionTool};

use awskit_core::{box_tool, DynTool, ProviderConfig};
use std::sync::Arc;

/// Returns all Step Functions tools
pub fn all_tools(config: Arc<ProviderConfig>) -> Vec<Box<dyn DynTool>> {
    vec![box_tool(StartExecutionTool::new(config))]
}
