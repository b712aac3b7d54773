//! decomposer/configure Tool Implementation
//!
//! Adjust validation limits and logging for subsequent calls.

use crate::core::{MAX_COMPLEXITY, MIN_COMPLEXITY};
use crate::mcp::server::ServerConfig;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

/// Request for decomposer/configure tool
///
/// Every field is optional; only the ones present are changed. The event
/// bus capacity is fixed at startup and cannot be set here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ConfigRequest {
    /// Maximum identifier length in characters (optional, > 0)
    #[serde(default)]
    pub max_identifier_length: Option<usize>,
    /// Maximum statement/name/description length (optional, > 0)
    #[serde(default)]
    pub max_text_length: Option<usize>,
    /// Maximum number of constraints or dependencies (optional, > 0)
    #[serde(default)]
    pub max_list_length: Option<usize>,
    /// Complexity used when a request omits it (optional, 1-10)
    #[serde(default)]
    pub default_complexity: Option<u8>,
    /// Log a one-line summary of every action (optional)
    #[serde(default)]
    pub log_summaries: Option<bool>,
}

impl ConfigRequest {
    /// Check if any configuration values are provided
    pub fn has_updates(&self) -> bool {
        self.max_identifier_length.is_some()
            || self.max_text_length.is_some()
            || self.max_list_length.is_some()
            || self.default_complexity.is_some()
            || self.log_summaries.is_some()
    }
}

/// Response from decomposer/configure tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ConfigResponse {
    /// Whether any value was applied
    pub applied: bool,
    /// Current configuration after update
    pub current_config: ServerConfig,
}

/// Apply configuration updates to a ServerConfig
///
/// Out-of-range values are skipped. Returns whether anything changed.
pub fn apply_config_updates(config: &mut ServerConfig, request: &ConfigRequest) -> bool {
    let mut applied = false;

    if let Some(len) = request.max_identifier_length {
        if len > 0 {
            config.max_identifier_length = len;
            applied = true;
        }
    }

    if let Some(len) = request.max_text_length {
        if len > 0 {
            config.max_text_length = len;
            applied = true;
        }
    }

    if let Some(len) = request.max_list_length {
        if len > 0 {
            config.max_list_length = len;
            applied = true;
        }
    }

    if let Some(complexity) = request.default_complexity {
        if (MIN_COMPLEXITY..=MAX_COMPLEXITY).contains(&complexity) {
            config.default_complexity = complexity;
            applied = true;
        }
    }

    if let Some(enabled) = request.log_summaries {
        config.log_summaries = enabled;
        applied = true;
    }

    applied
}
