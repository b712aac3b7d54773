//! Event Observers for the Decomposition Engine
//!
//! Observers subscribe to the EventBus and process events for different purposes:
//! - `logging`: Structured logging via tracing
//! - `metrics`: Prometheus-compatible counters and gauges

pub mod logging;
pub mod metrics;

pub use logging::LoggingObserver;
pub use metrics::MetricsObserver;
