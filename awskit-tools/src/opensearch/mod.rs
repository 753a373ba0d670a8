//! Amazon OpenSearch Service and OpenSearch Serverless search.

mod search;

pub use search::{search_body, OpenSearchSearchInput, OpenSearchSearchTool};

use awskit_core::{box_tool, DynTool, ProviderConfig};
use std::sync::Arc;

/// Returns all OpenSearch tools
pub fn all_tools(config: Arc<ProviderConfig>) -> Vec<Box<dyn DynTool>> {
    vec![box_tool(OpenSearchSearchTool::new(config))]
}
