//! decomposer/health Tool Implementation
//!
//! Check server health status including uptime and entity counts.

use crate::mcp::health::{EntityCounts, HealthChecker, HealthStatus};
use crate::mcp::server::ServerConfig;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

/// Request for decomposer/health tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HealthRequest {
    /// Whether to include problem/component/phase counts (default true)
    #[serde(default)]
    pub include_counts: Option<bool>,
}

/// Response from decomposer/health tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    /// Health status information
    #[serde(flatten)]
    pub status: HealthStatus,
}

/// Execute health check
pub fn execute_health(
    request: &HealthRequest,
    checker: &HealthChecker,
    config: &ServerConfig,
    counts: EntityCounts,
) -> HealthResponse {
    let status = if request.include_counts.unwrap_or(true) {
        checker.check_with_counts(config, counts)
    } else {
        checker.check(config)
    };

    HealthResponse { status }
}
