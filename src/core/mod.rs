//! Core Decomposition Engine
//!
//! Pure, synchronous, in-memory. Nothing in this module performs I/O or
//! suspends; every operation is a bounded computation over the component
//! graph.
//!
//! - [`store`]: Problems and Components keyed by identifier
//! - [`graph`]: adjacency view, cycle guard, depth, balance, resolution order
//! - [`metrics`]: per-problem structural metrics
//! - [`phases`]: append-only phase history with metric snapshots
//! - [`engine`]: the session object tying the above together

pub mod engine;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod phases;
pub mod store;

pub use engine::{
    ComponentDetails, DecompositionEngine, DecompositionView, LinkOutcome, PhaseHistory,
    ProblemDetails,
};
pub use error::{EngineError, EntityKind};
pub use graph::{balance_score, DependencyGraph};
pub use metrics::{calculate_metrics, DecompositionMetrics};
pub use phases::{DecompositionPhase, PhaseLog, PhaseState};
pub use store::{
    Component, ComponentDraft, ComponentStatus, EntityStore, Metadata, Problem, ProblemDraft,
    MAX_COMPLEXITY, MIN_COMPLEXITY,
};

/// Serde module for `SystemTime` as an RFC 3339 string with millisecond precision
pub(crate) mod rfc3339 {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::SystemTime;

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_rfc3339_millis(*time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_rfc3339_weak(&raw).map_err(serde::de::Error::custom)
    }

    /// Same encoding for optional timestamps (`null` when unset)
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::SystemTime;

        pub fn serialize<S>(time: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match time {
                Some(time) => serializer.collect_str(&humantime::format_rfc3339_millis(*time)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|s| humantime::parse_rfc3339_weak(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
