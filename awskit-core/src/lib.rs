//! # awskit-core
//!
//! Shared plumbing for the awskit AWS adapter tools: the [`Tool`] trait and its result
//! types, the error taxonomy, provider configuration, per-call credential resolution,
//! a SigV4-signing HTTP client, and the key-value store behind browser sessions.
//!
//! ## Writing a tool
//!
//! ```ignore
//! use awskit_core::{AwsCredentialParams, ProviderConfig, Tool, ToolError, ToolResult};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Deserialize, JsonSchema)]
//! struct DescribeInput {
//!     table_name: String,
//!     #[serde(flatten)]
//!     credentials: AwsCredentialParams,
//! }
//!
//! struct DescribeTable {
//!     config: Arc<ProviderConfig>,
//! }
//!
//! impl Tool for DescribeTable {
//!     type Input = DescribeInput;
//!
//!     fn name(&self) -> &str { "describe_table" }
//!     fn description(&self) -> &str { "Describe a DynamoDB table" }
//!
//!     async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
//!         let client = self.config.client(&input.credentials).await?;
//!         let out = client
//!             .json_rpc(&awskit_core::service::DYNAMODB, "DescribeTable",
//!                       &serde_json::json!({"TableName": input.table_name}))
//!             .await?;
//!         Ok(ToolResult::Json(out))
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod eventstream;
pub mod logging;
pub mod poll;
pub mod service;
pub mod store;
pub mod tool;
pub mod xml;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use client::{AwsClient, AwsRequest, AwsResponse, FetchedFile};
pub use config::{ConfigError, ProviderConfig, ProviderConfigBuilder};
pub use credentials::{AwsCredentialParams, ResolvedCredentials, DEFAULT_REGION};
pub use error::{ToolError, UpstreamError};
pub use poll::{poll_until, PollStatus};
pub use service::{Protocol, Service};
pub use store::{KeyValueStore, MemoryStore, ParameterStore};
pub use tool::{box_tool, Blob, DynTool, Tool, ToolResult};
