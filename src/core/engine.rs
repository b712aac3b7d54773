//! Decomposition session
//!
//! `DecompositionEngine` owns one entity store and one phase log and is the
//! only place that mutates them. Every mutating method validates fully
//! before writing, so an `Err` always leaves the session untouched.
//!
//! When an [`EventBus`] is attached, every successful mutation, every link
//! refused by the cycle guard, and every metrics computation is published.

use super::error::{EngineError, EntityKind};
use super::graph::DependencyGraph;
use super::metrics::{calculate_metrics, DecompositionMetrics};
use super::phases::{DecompositionPhase, PhaseLog, PhaseState};
use super::store::{Component, ComponentDraft, EntityStore, Problem, ProblemDraft};
use crate::events::{DecompositionEvent, EventBus};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Result of `link_components`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkOutcome {
    /// The source component after the call
    pub component: Component,
    /// False when the edge already existed
    pub created: bool,
}

/// A problem with its components, metrics and a dependency-first ordering
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecompositionView {
    pub problem: Problem,
    pub components: Vec<Component>,
    pub metrics: DecompositionMetrics,
    pub resolution_order: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDetails {
    pub component: Component,
    /// Ids of components that list this one as a dependency
    pub dependents: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    pub problem: Problem,
    pub component_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseHistory {
    pub phases: Vec<DecompositionPhase>,
    pub current_phase_index: Option<usize>,
    pub current_phase_state: PhaseState,
}

/// One in-memory decomposition session
#[derive(Debug, Default)]
pub struct DecompositionEngine {
    store: EntityStore,
    phases: PhaseLog,
    events: Option<EventBus>,
}

impl DecompositionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine that publishes events on `bus`
    pub fn with_event_bus(bus: EventBus) -> Self {
        Self {
            events: Some(bus),
            ..Self::default()
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn phases(&self) -> &PhaseLog {
        &self.phases
    }

    fn emit(&self, event: DecompositionEvent) {
        if let Some(bus) = &self.events {
            bus.emit(event);
        }
    }

    // ------------------------------------------------------------------
    // Problems
    // ------------------------------------------------------------------

    pub fn create_problem(&mut self, draft: ProblemDraft) -> Result<Problem, EngineError> {
        let problem = self.store.create_problem(draft)?.clone();
        info!(problem_id = %problem.id, complexity = problem.complexity, "Problem created");
        self.emit(DecompositionEvent::problem_created(&problem.id));
        Ok(problem)
    }

    pub fn update_problem(&mut self, draft: ProblemDraft) -> Result<Problem, EngineError> {
        let problem = self.store.update_problem(draft)?.clone();
        info!(problem_id = %problem.id, "Problem updated");
        self.emit(DecompositionEvent::problem_updated(&problem.id));
        Ok(problem)
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    pub fn create_component(&mut self, draft: ComponentDraft) -> Result<Component, EngineError> {
        let component = self.store.create_component(draft)?.clone();
        info!(
            component_id = %component.id,
            problem_id = %component.parent_problem_id,
            dependencies = component.dependencies.len(),
            "Component created"
        );
        self.emit(DecompositionEvent::component_created(
            &component.id,
            &component.parent_problem_id,
            component.dependencies.len(),
        ));
        Ok(component)
    }

    /// Replace a component's mutable fields.
    ///
    /// A draft without a dependency list keeps the stored set. A given list
    /// replaces it: no dependency in it may already reach the component,
    /// and a component may not depend on itself.
    pub fn update_component(&mut self, draft: ComponentDraft) -> Result<Component, EngineError> {
        self.store.check_component_update(&draft)?;

        let graph = DependencyGraph::from_components(self.store.components());
        for dep in draft.dependencies.iter().flatten() {
            if let Some(path) = graph.would_create_cycle(&draft.id, dep) {
                warn!(
                    component_id = %draft.id,
                    dependency = %dep,
                    "Component update rejected, dependency cycle"
                );
                self.emit(DecompositionEvent::link_rejected(
                    &draft.id,
                    dep,
                    path.clone(),
                ));
                return Err(EngineError::CycleDetected {
                    source: draft.id.clone(),
                    target: dep.clone(),
                    path,
                });
            }
        }

        let component = self.store.update_component(draft)?.clone();
        info!(
            component_id = %component.id,
            status = %component.status,
            "Component updated"
        );
        self.emit(DecompositionEvent::component_updated(
            &component.id,
            &component.parent_problem_id,
        ));
        Ok(component)
    }

    /// Add the edge `source -> target` (source depends on target).
    ///
    /// Linking an existing edge again succeeds without changing anything.
    pub fn link_components(
        &mut self,
        source_id: &str,
        target_id: &str,
    ) -> Result<LinkOutcome, EngineError> {
        let source = self.store.require_component(source_id)?;
        self.store.require_component(target_id)?;

        if source.depends_on(target_id) {
            let component = source.clone();
            debug!(source_id, target_id, "Components already linked");
            self.emit(DecompositionEvent::components_linked(source_id, target_id, true));
            return Ok(LinkOutcome {
                component,
                created: false,
            });
        }

        let cycle = DependencyGraph::from_components(self.store.components())
            .would_create_cycle(source_id, target_id);
        if let Some(path) = cycle {
            warn!(
                source_id,
                target_id,
                path = %path.join(" -> "),
                "Link rejected, would create dependency cycle"
            );
            self.emit(DecompositionEvent::link_rejected(
                source_id,
                target_id,
                path.clone(),
            ));
            return Err(EngineError::CycleDetected {
                source: source_id.to_string(),
                target: target_id.to_string(),
                path,
            });
        }

        let created = self.store.add_dependency(source_id, target_id)?;
        let component = self.store.require_component(source_id)?.clone();
        info!(source_id, target_id, "Components linked");
        self.emit(DecompositionEvent::components_linked(
            source_id, target_id, !created,
        ));
        Ok(LinkOutcome { component, created })
    }

    // ------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------

    /// Open a new phase and make it current. Phase ids need not be unique.
    pub fn start_phase(
        &mut self,
        phase_id: &str,
        name: &str,
        description: &str,
    ) -> Result<DecompositionPhase, EngineError> {
        if phase_id.trim().is_empty() {
            return Err(EngineError::validation("phaseId", "must not be empty"));
        }
        if name.trim().is_empty() {
            return Err(EngineError::validation("phaseName", "must not be empty"));
        }

        let phase = self.phases.start(phase_id, name, description).clone();
        let index = self.phases.len() - 1;
        info!(phase_id, phase_index = index, "Phase started");
        self.emit(DecompositionEvent::phase_started(phase_id, index));
        Ok(phase)
    }

    /// Close the most recent phase with this id, snapshotting the metrics of
    /// `problem_id` as they are right now.
    pub fn complete_phase(
        &mut self,
        phase_id: &str,
        problem_id: &str,
    ) -> Result<DecompositionPhase, EngineError> {
        let index = self
            .phases
            .position(phase_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Phase, phase_id))?;
        let metrics = calculate_metrics(&self.store, problem_id)?;

        let phase = self
            .phases
            .complete(index, metrics)
            .cloned()
            .ok_or_else(|| EngineError::not_found(EntityKind::Phase, phase_id))?;
        info!(
            phase_id,
            problem_id,
            metrics = %metrics.summary(),
            "Phase completed"
        );
        self.emit(DecompositionEvent::phase_completed(
            phase_id,
            problem_id,
            metrics.component_count,
            metrics.max_depth,
            metrics.balance_score,
        ));
        Ok(phase)
    }

    pub fn phase_history(&self) -> PhaseHistory {
        PhaseHistory {
            phases: self.phases.history().to_vec(),
            current_phase_index: self.phases.current_index(),
            current_phase_state: self.phases.state(),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn calculate_metrics(&self, problem_id: &str) -> Result<DecompositionMetrics, EngineError> {
        let metrics = calculate_metrics(&self.store, problem_id)?;
        debug!(problem_id, metrics = %metrics.summary(), "Metrics calculated");
        self.emit(DecompositionEvent::metrics_calculated(
            problem_id,
            metrics.component_count,
            metrics.max_depth,
            metrics.balance_score,
        ));
        Ok(metrics)
    }

    pub fn decomposition(&self, problem_id: &str) -> Result<DecompositionView, EngineError> {
        let problem = self.store.require_problem(problem_id)?.clone();
        let metrics = calculate_metrics(&self.store, problem_id)?;

        let components: Vec<Component> = self.store.components_of(problem_id).cloned().collect();
        let graph = DependencyGraph::from_components(self.store.components());
        let scope: Vec<usize> = components
            .iter()
            .filter_map(|c| graph.index_of(&c.id))
            .collect();
        let resolution_order = graph.resolution_order(&scope);

        debug!(problem_id, components = components.len(), "Decomposition read");
        Ok(DecompositionView {
            problem,
            components,
            metrics,
            resolution_order,
        })
    }

    pub fn component_details(&self, component_id: &str) -> Result<ComponentDetails, EngineError> {
        let component = self.store.require_component(component_id)?.clone();
        let dependents = self.store.dependents_of(component_id);
        Ok(ComponentDetails {
            component,
            dependents,
        })
    }

    pub fn problem_details(&self, problem_id: &str) -> Result<ProblemDetails, EngineError> {
        let problem = self.store.require_problem(problem_id)?.clone();
        let component_count = self.store.components_of(problem_id).count();
        Ok(ProblemDetails {
            problem,
            component_count,
        })
    }
}
