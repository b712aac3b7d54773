//! MCP Tool Definitions for the Decomposer
//!
//! Each tool is defined with serde/schemars for automatic JSON schema generation.

pub mod configure;
pub mod decompose;
pub mod health;

pub use configure::{ConfigRequest, ConfigResponse};
pub use decompose::{DecomposeRequest, DecomposeToolError, ToolEnvelope};
pub use health::{HealthRequest, HealthResponse};
