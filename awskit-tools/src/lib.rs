//! Ready-to-use AWS adapter tools.
//!
//! Each module groups the tools for one service family and exposes an `all_tools`
//! function. Every tool holds an `Arc<ProviderConfig>` and builds a fresh, credential-
//! bound client per invocation.
//!
//! ```no_run
//! use awskit_core::ProviderConfig;
//! use std::sync::Arc;
//!
//! let config = Arc::new(ProviderConfig::default());
//! let tools = awskit_tools::all_tools(config);
//! assert!(tools.iter().any(|t| t.name() == "s3_operator"));
//! ```

#[cfg(feature = "agentcore")]
pub mod agentcore;
#[cfg(feature = "bedrock")]
pub mod bedrock;
#[cfg(feature = "dynamodb")]
pub mod dynamodb;
#[cfg(feature = "lambda")]
pub mod lambda;
#[cfg(feature = "media")]
pub mod media;
#[cfg(feature = "opensearch")]
pub mod opensearch;
#[cfg(feature = "s3")]
pub mod s3;
#[cfg(feature = "sagemaker")]
pub mod sagemaker;
#[cfg(feature = "stepfunctions")]
pub mod stepfunctions;
#[cfg(feature = "transcribe")]
pub mod transcribe;
pub mod utils;

use awskit_core::{DynTool, ProviderConfig};
use std::sync::Arc;

/// Every tool enabled by the crate features.
pub fn all_tools(config: Arc<ProviderConfig>) -> Vec<Box<dyn DynTool>> {
    #[allow(unused_mut)]
    let mut tools: Vec<Box<dyn DynTool>> = Vec::new();

    #[cfg(feature = "s3")]
    tools.extend(s3::all_tools(config.clone()));
    #[cfg(feature = "bedrock")]
    tools.extend(bedrock::all_tools(config.clone()));
    #[cfg(feature = "agentcore")]
    tools.extend(agentcore::all_tools(config.clone()));
    #[cfg(feature = "lambda")]
    tools.extend(lambda::all_tools(config.clone()));
    #[cfg(feature = "sagemaker")]
    tools.extend(sagemaker::all_tools(config.clone()));
    #[cfg(feature = "transcribe")]
    tools.extend(transcribe::all_tools(config.clone()));
    #[cfg(feature = "dynamodb")]
    tools.extend(dynamodb::all_tools(config.clone()));
    #[cfg(feature = "stepfunctions")]
    tools.extend(stepfunctions::all_tools(config.clone()));
    #[cfg(feature = "opensearch")]
    tools.extend(opensearch::all_tools(config.clone()));
    #[cfg(feature = "media")]
    tools.extend(media::all_tools(config));

    tools
}

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use awskit_core::{AwsCredentialParams, ProviderConfig, Tool, ToolError, ToolResult};
    pub use schemars::JsonSchema;
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
}
