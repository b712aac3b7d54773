//! Decomposer - Structured Problem Decomposition Engine
//!
//! Breaks a problem into components, tracks the dependencies between them,
//! and measures the resulting structure:
//!
//! - **Entity Store**: Problems and Components keyed by identifier
//! - **Dependency Graph**: cycle guard on every new edge, depth, balance
//!   and a dependency-first resolution order
//! - **Phases**: timestamped spans closed with a metrics snapshot
//!
//! The engine is exposed over MCP (`decomposer-mcp`) and as a CLI
//! (`decomposer-cli`); both route through the same request dispatcher.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use decomposer::core::DecompositionEngine;
//! use decomposer::mcp::tools::decompose::dispatch_value;
//! use serde_json::json;
//!
//! let mut engine = DecompositionEngine::new();
//! dispatch_value(
//!     &mut engine,
//!     "createProblem",
//!     json!({"problemId": "p1", "problemStatement": "Ship the release"}),
//! )
//! .unwrap();
//!
//! let envelope = dispatch_value(&mut engine, "calculateMetrics", json!({"problemId": "p1"}))
//!     .unwrap();
//! println!("{}", envelope.to_json_pretty().unwrap());
//! ```

pub mod core;
pub mod events;
pub mod mcp;

// Re-export commonly used items at crate root
pub use core::{DecompositionEngine, DecompositionMetrics, EngineError, EntityKind};
pub use events::observers::{LoggingObserver, MetricsObserver};
pub use events::{DecompositionEvent, EventBus};
pub use mcp::{DecomposerServer, ServerConfig};
