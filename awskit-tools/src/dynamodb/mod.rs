//! DynamoDB table and item management.

mod attribute;
mod manager;

pub use attribute::{marshal_item, unmarshal_item};
pub use manager::{DynamoDbManagerInput, DynamoDbManagerTool, DynamoDbOperation};

use awskit_core::{box_tool, DynTool, ProviderConfig};
use std::sync::Arc;

/// Returns all DynamoDB tools
pub fn all_tools(config: Arc<ProviderConfig>) -> Vec<Box<dyn DynTool>> {
    vec![box_tool(DynamoDbManagerTool::new(config))]
}
