//! Test utilities for awskit tools.
//!
//! Enable with the `test-utils` feature:
//!
//! ```toml
//! [dev-dependencies]
//! awskit-core = { version = "...", features = ["test-utils"] }
//! ```
//!
//! Point every service at a local mock server (e.g. `wiremock`) and use static
//! credentials so no credential chain lookup happens:
//!
//! ```rust
//! use awskit_core::test_utils::mock_config;
//!
//! let config = mock_config("http://127.0.0.1:9999");
//! assert_eq!(config.endpoint_url.as_deref(), Some("http://127.0.0.1:9999"));
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::store::MemoryStore;

pub const TEST_ACCESS_KEY_ID: &str = "AKIDEXAMPLE";
pub const TEST_SECRET_ACCESS_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

/// Config sending all AWS traffic to `endpoint_url`, polling every 10ms.
pub fn mock_config(endpoint_url: &str) -> Arc<ProviderConfig> {
    Arc::new(ProviderConfig {
        endpoint_url: Some(endpoint_url.to_string()),
        poll_interval: Duration::from_millis(10),
        timeout: Duration::from_secs(10),
        ..ProviderConfig::builder()
            .static_credentials(TEST_ACCESS_KEY_ID, TEST_SECRET_ACCESS_KEY)
            .region("us-east-1")
            .build()
            .unwrap_or_default()
    })
}

/// Empty in-memory key-value store.
pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}
