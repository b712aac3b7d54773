//! MCP Server Implementation for the Decomposition Engine
//!
//! Exposes the engine as MCP tools over the rmcp SDK with stdio transport.
//!
//! # Available Tools
//!
//! - `decomposer/decompose` - Run one decomposition action
//! - `decomposer/configure` - Adjust validation limits and logging
//! - `decomposer/health` - Uptime, subsystem health and entity counts

pub mod health;
pub mod server;
pub mod tools;

pub use server::{DecomposerServer, ServerConfig};
