//! Decomposer MCP Server Implementation
//!
//! Provides the core server handler for rmcp, managing server state
//! and routing tool calls to their respective handlers.

use crate::core::DecompositionEngine;
use crate::events::EventBus;
use crate::mcp::health::{EntityCounts, HealthChecker};
use crate::mcp::tools::{
    configure::{apply_config_updates, ConfigRequest, ConfigResponse},
    decompose::{dispatch_shared, DecomposeRequest, ToolEnvelope},
    health::{execute_health, HealthRequest},
};
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    schemars::{self, JsonSchema},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Server configuration with defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ServerConfig {
    /// Maximum length of any identifier, in characters
    pub max_identifier_length: usize,
    /// Maximum length of statements, names and descriptions
    pub max_text_length: usize,
    /// Maximum number of constraints or dependencies in one request
    pub max_list_length: usize,
    /// Complexity used when a request omits it
    pub default_complexity: u8,
    /// Log a one-line summary of every action
    pub log_summaries: bool,
    /// Event bus buffer size (read at startup)
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_identifier_length: 256,
            max_text_length: 10_000,
            max_list_length: 256,
            default_complexity: 5,
            log_summaries: true,
            event_capacity: crate::events::bus::DEFAULT_CAPACITY,
        }
    }
}

/// Shared server state
#[derive(Debug)]
pub struct ServerState {
    /// Current configuration
    pub config: RwLock<ServerConfig>,
    /// The decomposition session; mutations take the write lock
    pub engine: RwLock<DecompositionEngine>,
    pub health: HealthChecker,
    pub events: EventBus,
}

impl ServerState {
    fn new(config: ServerConfig) -> Self {
        let events = EventBus::new(config.event_capacity);
        Self {
            engine: RwLock::new(DecompositionEngine::with_event_bus(events.clone())),
            config: RwLock::new(config),
            health: HealthChecker::new(),
            events,
        }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

/// Decomposer MCP Server
///
/// Implements the rmcp ServerHandler trait to expose the decomposition
/// engine via the Model Context Protocol.
#[derive(Clone)]
pub struct DecomposerServer {
    state: Arc<ServerState>,
    tool_router: ToolRouter<Self>,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))
}

#[tool_router]
impl DecomposerServer {
    /// Create a new server with default configuration
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Create a new server with custom configuration
    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            state: Arc::new(ServerState::new(config)),
            tool_router: Self::tool_router(),
        }
    }

    /// Get the current server configuration
    pub async fn get_config(&self) -> ServerConfig {
        self.state.config.read().await.clone()
    }

    /// Update the server configuration
    pub async fn set_config(&self, config: ServerConfig) {
        *self.state.config.write().await = config;
    }

    /// Event bus the engine publishes on; subscribe observers here
    pub fn event_bus(&self) -> EventBus {
        self.state.events.clone()
    }

    /// Current number of problems, components and phases
    pub async fn entity_counts(&self) -> EntityCounts {
        let engine = self.state.engine.read().await;
        EntityCounts::from(&*engine)
    }

    /// Run one decomposition action and return the envelope
    pub async fn run_action(&self, request: DecomposeRequest) -> Result<ToolEnvelope, McpError> {
        let config = self.get_config().await;
        dispatch_shared(&self.state.engine, request, &config)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }

    /// Execute one action against the decomposition engine.
    ///
    /// Problems and components are created here, linked through the
    /// cycle guard, and measured; phases bracket the work with metric
    /// snapshots.
    #[tool(
        name = "decomposer/decompose",
        description = "Run a decomposition action (createProblem, createComponent, linkComponents, startPhase, completePhase, calculateMetrics, getDecomposition, ...) and return a status envelope"
    )]
    async fn decompose(
        &self,
        Parameters(request): Parameters<DecomposeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let envelope = self.run_action(request).await?;
        let json = to_json(&envelope)?;
        if envelope.is_success() {
            Ok(CallToolResult::success(vec![Content::text(json)]))
        } else {
            Ok(CallToolResult::error(vec![Content::text(json)]))
        }
    }

    /// Update validation limits and logging for subsequent calls.
    #[tool(
        name = "decomposer/configure",
        description = "Update validation limits, default complexity and summary logging"
    )]
    async fn configure(
        &self,
        Parameters(request): Parameters<ConfigRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut config = self.state.config.write().await;
        let applied = apply_config_updates(&mut config, &request);

        let response = ConfigResponse {
            applied,
            current_config: config.clone(),
        };

        Ok(CallToolResult::success(vec![Content::text(to_json(
            &response,
        )?)]))
    }

    /// Report server health, uptime and entity counts.
    #[tool(
        name = "decomposer/health",
        description = "Report server health, uptime and entity counts"
    )]
    async fn health(
        &self,
        Parameters(request): Parameters<HealthRequest>,
    ) -> Result<CallToolResult, McpError> {
        let config = self.get_config().await;
        let counts = self.entity_counts().await;
        let response = execute_health(&request, &self.state.health, &config, counts);
        Ok(CallToolResult::success(vec![Content::text(to_json(
            &response,
        )?)]))
    }
}

impl Default for DecomposerServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for DecomposerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "decomposer-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Decomposition Engine - break a problem into components with acyclic \
                 dependencies, measure depth and balance, and snapshot progress in phases. \
                 Available tools: decomposer/decompose, decomposer/configure, decomposer/health."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(result: &CallToolResult) -> String {
        format!("{:?}", result)
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_identifier_length, 256);
        assert_eq!(config.max_text_length, 10_000);
        assert_eq!(config.max_list_length, 256);
        assert_eq!(config.default_complexity, 5);
        assert!(config.log_summaries);
        assert_eq!(config.event_capacity, 1024);
    }

    #[test]
    fn test_server_config_partial_deserialization() {
        let config: ServerConfig = serde_json::from_str(r#"{"default_complexity": 3}"#).unwrap();
        assert_eq!(config.default_complexity, 3);
        assert_eq!(config.max_text_length, 10_000);
    }

    #[test]
    fn test_server_info() {
        let server = DecomposerServer::new();
        let info = server.get_info();
        assert_eq!(info.server_info.name, "decomposer-mcp");
        assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("decomposer/decompose"));
    }

    #[tokio::test]
    async fn test_server_config_update() {
        let server = DecomposerServer::new();

        let mut config = server.get_config().await;
        config.default_complexity = 8;
        server.set_config(config).await;

        assert_eq!(server.get_config().await.default_complexity, 8);
    }

    #[tokio::test]
    async fn test_decompose_tool_handler() {
        let server = DecomposerServer::new();
        let request = DecomposeRequest {
            problem_id: Some("p1".into()),
            problem_statement: Some("Plan a migration".into()),
            ..DecomposeRequest::new("createProblem")
        };

        let result = server.decompose(Parameters(request)).await.unwrap();
        assert_ne!(result.is_error, Some(true));
        assert!(text_of(&result).contains("Problem 'p1' created"));
        assert_eq!(server.entity_counts().await.problems, 1);
    }

    #[tokio::test]
    async fn test_decompose_tool_failure_is_tool_error() {
        let server = DecomposerServer::new();
        let request = DecomposeRequest {
            problem_id: Some("ghost".into()),
            ..DecomposeRequest::new("calculateMetrics")
        };

        let result = server.decompose(Parameters(request)).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("not found"));
    }

    #[tokio::test]
    async fn test_configure_tool_handler() {
        let server = DecomposerServer::new();
        let request = ConfigRequest {
            default_complexity: Some(2),
            ..Default::default()
        };

        let result = server.configure(Parameters(request)).await;
        assert!(result.is_ok());
        assert_eq!(server.get_config().await.default_complexity, 2);
    }

    #[tokio::test]
    async fn test_health_tool_handler() {
        let server = DecomposerServer::new();
        let result = server
            .health(Parameters(HealthRequest::default()))
            .await
            .unwrap();
        assert!(text_of(&result).contains("healthy"));
    }

    #[tokio::test]
    async fn test_engine_publishes_on_server_bus() {
        let server = DecomposerServer::new();
        let mut rx = server.event_bus().subscribe();

        let request = DecomposeRequest {
            phase_id: Some("ph1".into()),
            phase_name: Some("Analysis".into()),
            description: Some(String::new()),
            ..DecomposeRequest::new("startPhase")
        };
        server.run_action(request).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "PhaseStarted");
    }
}
