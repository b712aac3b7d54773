//! Structural metrics for one problem's decomposition
//!
//! Metrics are derived on demand and never stored on their own; the only
//! persisted copies are phase snapshots.

use super::error::EngineError;
use super::graph::{balance_score, DependencyGraph, PERFECT_BALANCE};
use super::store::EntityStore;
use serde::{Deserialize, Serialize};

/// Point-in-time measurement of a problem's decomposition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecompositionMetrics {
    pub component_count: usize,
    pub average_complexity: f64,
    pub max_depth: usize,
    pub dependency_count: usize,
    pub balance_score: f64,
}

impl DecompositionMetrics {
    /// Metrics of a problem with no components; also the placeholder
    /// snapshot of a freshly started phase.
    pub fn empty() -> Self {
        Self {
            component_count: 0,
            average_complexity: 0.0,
            max_depth: 0,
            dependency_count: 0,
            balance_score: PERFECT_BALANCE,
        }
    }

    /// One-line human-readable rendering
    pub fn summary(&self) -> String {
        format!(
            "{} components, avg complexity {:.1}, max depth {}, {} dependencies, balance {:.1}/10",
            self.component_count,
            self.average_complexity,
            self.max_depth,
            self.dependency_count,
            self.balance_score
        )
    }
}

impl Default for DecompositionMetrics {
    fn default() -> Self {
        Self::empty()
    }
}

/// Compute metrics for the components owned by `problem_id`.
///
/// Depth follows dependencies across the whole component universe; the
/// component count, complexity, edge count and in-degrees only consider
/// components whose parent is `problem_id`.
pub fn calculate_metrics(
    store: &EntityStore,
    problem_id: &str,
) -> Result<DecompositionMetrics, EngineError> {
    store.require_problem(problem_id)?;

    let graph = DependencyGraph::from_components(store.components());
    let scoped: Vec<_> = store.components_of(problem_id).collect();
    if scoped.is_empty() {
        return Ok(DecompositionMetrics::empty());
    }

    let scope: Vec<usize> = scoped
        .iter()
        .filter_map(|c| graph.index_of(&c.id))
        .collect();
    let total_complexity: u64 = scoped.iter().map(|c| u64::from(c.complexity)).sum();

    Ok(DecompositionMetrics {
        component_count: scoped.len(),
        average_complexity: total_complexity as f64 / scoped.len() as f64,
        max_depth: graph.max_depth(&scope),
        dependency_count: scoped.iter().map(|c| c.dependencies.len()).sum(),
        balance_score: balance_score(&graph.in_degrees(&scope)),
    })
}
