//! Phase Lifecycle Manager
//!
//! Phases bracket a decomposition effort: `start` opens one, `complete`
//! closes it with a metrics snapshot. History is append-only; a phase that is
//! never completed stays in history with `completed_at` unset.
//!
//! ```text
//! NoPhase --start--> Open --complete--> Closed --start--> Open ...
//! ```
//!
//! Phase identifiers are not unique. Starting a phase with an id already in
//! history adds an independent entry; completing by id targets the most
//! recent entry with that id.

use super::metrics::DecompositionMetrics;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A named, timestamped span of decomposition work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecompositionPhase {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(with = "super::rfc3339")]
    pub started_at: SystemTime,
    #[serde(with = "super::rfc3339::option")]
    pub completed_at: Option<SystemTime>,
    pub metrics: DecompositionMetrics,
}

impl DecompositionPhase {
    pub fn is_open(&self) -> bool {
        self.completed_at.is_none()
    }
}

/// Lifecycle state of the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseState {
    NoPhase,
    Open,
    Closed,
}

/// Ordered phase history plus the index of the most recently started phase
#[derive(Debug, Clone, Default)]
pub struct PhaseLog {
    phases: Vec<DecompositionPhase>,
    current: Option<usize>,
}

impl PhaseLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new open phase with a placeholder snapshot and make it current
    pub fn start(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> &DecompositionPhase {
        self.phases.push(DecompositionPhase {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            started_at: SystemTime::now(),
            completed_at: None,
            metrics: DecompositionMetrics::empty(),
        });
        let index = self.phases.len() - 1;
        self.current = Some(index);
        &self.phases[index]
    }

    /// Index of the most recent phase with this id
    pub fn position(&self, id: &str) -> Option<usize> {
        self.phases.iter().rposition(|p| p.id == id)
    }

    /// Stamp completion on the phase at `index` and overwrite its snapshot.
    ///
    /// Completing an already closed phase refreshes both.
    pub fn complete(
        &mut self,
        index: usize,
        metrics: DecompositionMetrics,
    ) -> Option<&DecompositionPhase> {
        let phase = self.phases.get_mut(index)?;
        phase.completed_at = Some(SystemTime::now());
        phase.metrics = metrics;
        Some(&*phase)
    }

    pub fn history(&self) -> &[DecompositionPhase] {
        &self.phases
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&DecompositionPhase> {
        self.current.and_then(|i| self.phases.get(i))
    }

    pub fn state(&self) -> PhaseState {
        match self.current() {
            None => PhaseState::NoPhase,
            Some(phase) if phase.is_open() => PhaseState::Open,
            Some(_) => PhaseState::Closed,
        }
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(count: usize) -> DecompositionMetrics {
        DecompositionMetrics {
            component_count: count,
            average_complexity: 5.0,
            max_depth: 1,
            dependency_count: 0,
            balance_score: 10.0,
        }
    }

    #[test]
    fn test_initial_state() {
        let log = PhaseLog::new();
        assert_eq!(log.state(), PhaseState::NoPhase);
        assert!(log.current_index().is_none());
        assert!(log.is_empty());
    }

    #[test]
    fn test_start_uses_placeholder_snapshot() {
        let mut log = PhaseLog::new();
        let phase = log.start("ph1", "Analysis", "Split the problem");
        assert!(phase.is_open());
        assert_eq!(phase.metrics, DecompositionMetrics::empty());
        assert_eq!(log.state(), PhaseState::Open);
        assert_eq!(log.current_index(), Some(0));
    }

    #[test]
    fn test_complete_sets_snapshot() {
        let mut log = PhaseLog::new();
        log.start("ph1", "Analysis", "");
        let phase = log.complete(0, snapshot(3)).unwrap();
        assert!(phase.completed_at.is_some());
        assert_eq!(phase.metrics.component_count, 3);
        assert_eq!(log.state(), PhaseState::Closed);
    }

    #[test]
    fn test_complete_twice_overwrites() {
        let mut log = PhaseLog::new();
        log.start("ph1", "Analysis", "");
        log.complete(0, snapshot(1));
        let first = log.history()[0].completed_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        let phase = log.complete(0, snapshot(4)).unwrap();
        assert_eq!(phase.metrics.component_count, 4);
        assert!(phase.completed_at >= first);
    }

    #[test]
    fn test_duplicate_ids_are_independent_entries() {
        let mut log = PhaseLog::new();
        log.start("ph1", "First", "");
        log.start("ph1", "Second", "");
        assert_eq!(log.len(), 2);
        assert_eq!(log.position("ph1"), Some(1));
        assert_eq!(log.current().unwrap().name, "Second");
    }

    #[test]
    fn test_abandoned_phase_stays_in_history() {
        let mut log = PhaseLog::new();
        log.start("ph1", "Abandoned", "");
        log.start("ph2", "Next", "");
        assert!(log.history()[0].is_open());
        assert_eq!(log.current_index(), Some(1));
    }

    #[test]
    fn test_complete_unknown_index() {
        let mut log = PhaseLog::new();
        assert!(log.complete(3, snapshot(0)).is_none());
    }

    #[test]
    fn test_phase_serializes_null_completion() {
        let mut log = PhaseLog::new();
        let phase = log.start("ph1", "Analysis", "");
        let value = serde_json::to_value(phase).unwrap();
        assert!(value["completedAt"].is_null());
        assert_eq!(value["metrics"]["balanceScore"], serde_json::json!(10.0));
    }
}
