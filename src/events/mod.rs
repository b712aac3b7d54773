//! Event-Driven Observability for the Decomposition Engine
//!
//! The engine emits a structured event for every state change, every
//! rejected link, and every metrics computation:
//! - Problem and component creation/update
//! - Dependency links (accepted or rejected by the cycle guard)
//! - Phase start and completion
//! - Metrics calculations
//!
//! # Architecture
//!
//! Events are emitted via an `EventBus` which uses a broadcast channel.
//! Multiple observers can subscribe to receive all events:
//!
//! ```text
//! DecompositionEngine → EventBus → [LoggingObserver, MetricsObserver, ...]
//! ```

pub mod bus;
pub mod observers;

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// All events emitted by the decomposition engine
///
/// Events are tagged with their type for JSON serialization and include
/// timestamps for ordering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DecompositionEvent {
    /// A problem was created
    ProblemCreated {
        problem_id: String,
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// A problem's mutable fields were replaced
    ProblemUpdated {
        problem_id: String,
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// A component was created
    ComponentCreated {
        component_id: String,
        problem_id: String,
        /// Number of dependencies declared at creation
        dependency_count: usize,
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// A component's mutable fields were replaced
    ComponentUpdated {
        component_id: String,
        problem_id: String,
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// A dependency edge was requested and accepted
    ComponentsLinked {
        source_id: String,
        target_id: String,
        /// True when the edge already existed and nothing changed
        already_linked: bool,
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// The cycle guard refused a dependency edge
    LinkRejected {
        source_id: String,
        target_id: String,
        /// Existing chain `target -> ... -> source`
        cycle: Vec<String>,
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// A phase was opened
    PhaseStarted {
        phase_id: String,
        /// Position in phase history
        phase_index: usize,
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// A phase was closed with a snapshot
    PhaseCompleted {
        phase_id: String,
        problem_id: String,
        component_count: usize,
        max_depth: usize,
        balance_score: f64,
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },

    /// Metrics were computed for a problem
    MetricsCalculated {
        problem_id: String,
        component_count: usize,
        max_depth: usize,
        balance_score: f64,
        #[serde(with = "system_time_serde")]
        timestamp: SystemTime,
    },
}

impl DecompositionEvent {
    /// Create a ProblemCreated event
    pub fn problem_created(problem_id: &str) -> Self {
        Self::ProblemCreated {
            problem_id: problem_id.to_string(),
            timestamp: SystemTime::now(),
        }
    }

    /// Create a ProblemUpdated event
    pub fn problem_updated(problem_id: &str) -> Self {
        Self::ProblemUpdated {
            problem_id: problem_id.to_string(),
            timestamp: SystemTime::now(),
        }
    }

    /// Create a ComponentCreated event
    pub fn component_created(component_id: &str, problem_id: &str, dependency_count: usize) -> Self {
        Self::ComponentCreated {
            component_id: component_id.to_string(),
            problem_id: problem_id.to_string(),
            dependency_count,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a ComponentUpdated event
    pub fn component_updated(component_id: &str, problem_id: &str) -> Self {
        Self::ComponentUpdated {
            component_id: component_id.to_string(),
            problem_id: problem_id.to_string(),
            timestamp: SystemTime::now(),
        }
    }

    /// Create a ComponentsLinked event
    pub fn components_linked(source_id: &str, target_id: &str, already_linked: bool) -> Self {
        Self::ComponentsLinked {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            already_linked,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a LinkRejected event
    pub fn link_rejected(source_id: &str, target_id: &str, cycle: Vec<String>) -> Self {
        Self::LinkRejected {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            cycle,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a PhaseStarted event
    pub fn phase_started(phase_id: &str, phase_index: usize) -> Self {
        Self::PhaseStarted {
            phase_id: phase_id.to_string(),
            phase_index,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a PhaseCompleted event
    pub fn phase_completed(
        phase_id: &str,
        problem_id: &str,
        component_count: usize,
        max_depth: usize,
        balance_score: f64,
    ) -> Self {
        Self::PhaseCompleted {
            phase_id: phase_id.to_string(),
            problem_id: problem_id.to_string(),
            component_count,
            max_depth,
            balance_score,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a MetricsCalculated event
    pub fn metrics_calculated(
        problem_id: &str,
        component_count: usize,
        max_depth: usize,
        balance_score: f64,
    ) -> Self {
        Self::MetricsCalculated {
            problem_id: problem_id.to_string(),
            component_count,
            max_depth,
            balance_score,
            timestamp: SystemTime::now(),
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ProblemCreated { .. } => "ProblemCreated",
            Self::ProblemUpdated { .. } => "ProblemUpdated",
            Self::ComponentCreated { .. } => "ComponentCreated",
            Self::ComponentUpdated { .. } => "ComponentUpdated",
            Self::ComponentsLinked { .. } => "ComponentsLinked",
            Self::LinkRejected { .. } => "LinkRejected",
            Self::PhaseStarted { .. } => "PhaseStarted",
            Self::PhaseCompleted { .. } => "PhaseCompleted",
            Self::MetricsCalculated { .. } => "MetricsCalculated",
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            Self::ProblemCreated { timestamp, .. }
            | Self::ProblemUpdated { timestamp, .. }
            | Self::ComponentCreated { timestamp, .. }
            | Self::ComponentUpdated { timestamp, .. }
            | Self::ComponentsLinked { timestamp, .. }
            | Self::LinkRejected { timestamp, .. }
            | Self::PhaseStarted { timestamp, .. }
            | Self::PhaseCompleted { timestamp, .. }
            | Self::MetricsCalculated { timestamp, .. } => *timestamp,
        }
    }
}

/// Serde module for SystemTime serialization
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_millis(millis))
    }
}

// Re-exports
pub use bus::EventBus;

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================
    // Event Creation Tests
    // ==========================================

    #[test]
    fn test_component_created_creation() {
        let event = DecompositionEvent::component_created("c2", "p1", 1);

        match event {
            DecompositionEvent::ComponentCreated {
                component_id,
                problem_id,
                dependency_count,
                ..
            } => {
                assert_eq!(component_id, "c2");
                assert_eq!(problem_id, "p1");
                assert_eq!(dependency_count, 1);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_link_rejected_carries_cycle() {
        let event =
            DecompositionEvent::link_rejected("c1", "c2", vec!["c2".to_string(), "c1".to_string()]);

        match event {
            DecompositionEvent::LinkRejected { cycle, .. } => {
                assert_eq!(cycle, vec!["c2", "c1"]);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_event_type_name() {
        assert_eq!(
            DecompositionEvent::problem_created("p").event_type(),
            "ProblemCreated"
        );
        assert_eq!(
            DecompositionEvent::components_linked("a", "b", false).event_type(),
            "ComponentsLinked"
        );
        assert_eq!(
            DecompositionEvent::phase_completed("ph", "p", 0, 0, 10.0).event_type(),
            "PhaseCompleted"
        );
    }

    #[test]
    fn test_event_has_timestamp() {
        let before = SystemTime::now();
        let event = DecompositionEvent::phase_started("ph1", 0);
        let after = SystemTime::now();

        let ts = event.timestamp();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    // ==========================================
    // Serialization Tests
    // ==========================================

    #[test]
    fn test_event_serializes_to_json_with_type_tag() {
        let event = DecompositionEvent::components_linked("c2", "c1", false);
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains(r#""type":"ComponentsLinked""#));
        assert!(json.contains(r#""source_id":"c2""#));
        assert!(json.contains(r#""already_linked":false"#));
    }

    #[test]
    fn test_event_deserializes_from_json() {
        let json = r#"{
            "type": "MetricsCalculated",
            "problem_id": "p1",
            "component_count": 2,
            "max_depth": 2,
            "balance_score": 5.0,
            "timestamp": 1704067200000
        }"#;

        let event: DecompositionEvent = serde_json::from_str(json).unwrap();

        match event {
            DecompositionEvent::MetricsCalculated {
                problem_id,
                component_count,
                max_depth,
                ..
            } => {
                assert_eq!(problem_id, "p1");
                assert_eq!(component_count, 2);
                assert_eq!(max_depth, 2);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_all_events_serialize_with_type() {
        let events = vec![
            DecompositionEvent::problem_created("p"),
            DecompositionEvent::problem_updated("p"),
            DecompositionEvent::component_created("c", "p", 0),
            DecompositionEvent::component_updated("c", "p"),
            DecompositionEvent::components_linked("a", "b", true),
            DecompositionEvent::link_rejected("a", "b", vec![]),
            DecompositionEvent::phase_started("ph", 0),
            DecompositionEvent::phase_completed("ph", "p", 1, 1, 10.0),
            DecompositionEvent::metrics_calculated("p", 1, 1, 10.0),
        ];

        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let parsed: DecompositionEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(event.event_type(), parsed.event_type());
        }
    }
}
