//! Health Check for the Decomposer MCP Server
//!
//! Provides the health status payload and configuration validation.

use crate::core::DecompositionEngine;
use crate::core::{MAX_COMPLEXITY, MIN_COMPLEXITY};
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime};

/// Health status of the server
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HealthStatus {
    /// Overall health status
    pub status: HealthState,
    /// Server version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Server start time (RFC 3339)
    pub started_at: String,
    /// Component health checks
    pub components: ComponentHealth,
    /// Entity counts, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<EntityCounts>,
}

/// Overall health state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Server is healthy and operational
    Healthy,
    /// Server is degraded but functional
    Degraded,
    /// Server is unhealthy
    Unhealthy,
}

impl HealthState {
    /// Check if the state is healthy
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthState::Healthy)
    }
}

/// Health of individual components
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ComponentHealth {
    /// Decomposition engine status
    pub engine: SubsystemStatus,
    /// Configuration status
    pub config: SubsystemStatus,
}

/// Status of a single subsystem
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubsystemStatus {
    /// Subsystem is operational
    pub healthy: bool,
    /// Optional status message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Last check time (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<String>,
}

impl SubsystemStatus {
    /// Create a healthy status
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            message: None,
            last_check: Some(iso_now()),
        }
    }

    /// Create an unhealthy status with message
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
            last_check: Some(iso_now()),
        }
    }
}

/// Number of entities held by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntityCounts {
    pub problems: usize,
    pub components: usize,
    pub phases: usize,
}

impl From<&DecompositionEngine> for EntityCounts {
    fn from(engine: &DecompositionEngine) -> Self {
        Self {
            problems: engine.store().problem_count(),
            components: engine.store().component_count(),
            phases: engine.phases().len(),
        }
    }
}

/// Health check service
#[derive(Debug)]
pub struct HealthChecker {
    start_time: Instant,
    start_system_time: SystemTime,
    version: String,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthChecker {
    /// Create a new health checker
    pub fn new() -> Self {
        Self::with_version(env!("CARGO_PKG_VERSION"))
    }

    /// Create with custom version
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            start_time: Instant::now(),
            start_system_time: SystemTime::now(),
            version: version.into(),
        }
    }

    /// Get current uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get server version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Perform health check against the active configuration
    pub fn check(&self, config: &super::server::ServerConfig) -> HealthStatus {
        // The engine is in-memory and cannot fail independently
        let engine = SubsystemStatus::healthy();

        let config = match validate_config(config) {
            Ok(()) => SubsystemStatus::healthy(),
            Err(errors) => SubsystemStatus::unhealthy(errors.join("; ")),
        };

        let status = if engine.healthy && config.healthy {
            HealthState::Healthy
        } else if engine.healthy || config.healthy {
            HealthState::Degraded
        } else {
            HealthState::Unhealthy
        };

        HealthStatus {
            status,
            version: self.version.clone(),
            uptime_seconds: self.uptime().as_secs(),
            started_at: humantime::format_rfc3339(self.start_system_time).to_string(),
            components: ComponentHealth { engine, config },
            entities: None,
        }
    }

    /// Perform health check and attach entity counts
    pub fn check_with_counts(
        &self,
        config: &super::server::ServerConfig,
        counts: EntityCounts,
    ) -> HealthStatus {
        let mut status = self.check(config);
        status.entities = Some(counts);
        status
    }
}

/// Validate configuration and return any errors
pub fn validate_config(config: &super::server::ServerConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.max_identifier_length == 0 {
        errors.push("max_identifier_length must be > 0".to_string());
    }

    if config.max_text_length == 0 {
        errors.push("max_text_length must be > 0".to_string());
    }

    if config.max_list_length == 0 {
        errors.push("max_list_length must be > 0".to_string());
    }

    if !(MIN_COMPLEXITY..=MAX_COMPLEXITY).contains(&config.default_complexity) {
        errors.push(format!(
            "default_complexity ({}) must be between {} and {}",
            config.default_complexity, MIN_COMPLEXITY, MAX_COMPLEXITY
        ));
    }

    if config.event_capacity == 0 {
        errors.push("event_capacity must be > 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn iso_now() -> String {
    humantime::format_rfc3339(SystemTime::now()).to_string()
}
