//! Local media processing tools. These fetch their input over plain HTTP and make no AWS calls.

mod extract_frame;

pub use extract_frame::{frame_indices, ExtractFrameInput, ExtractFrameTool};

use awskit_core::{box_tool, DynTool, ProviderConfig};
use std::sync::Arc;

/// Returns all media tools
pub fn all_tools(config: Arc<ProviderConfig>) -> Vec<Box<dyn DynTool>> {
    vec![box_tool(ExtractFrameTool::new(config))]
}
