//! Logging Observer
//!
//! Provides structured logging for all decomposition events using the
//! `tracing` crate. Events are logged at appropriate levels:
//! - INFO: PhaseStarted, PhaseCompleted, ComponentsLinked
//! - WARN: LinkRejected
//! - DEBUG: entity creation/update, MetricsCalculated

use crate::events::{DecompositionEvent, EventBus};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Observer that logs decomposition events using tracing
///
/// Maps events to appropriate log levels:
/// - `PhaseStarted/Completed` → INFO (lifecycle milestones)
/// - `ComponentsLinked` → INFO (graph changes)
/// - `LinkRejected` → WARN (refused by the cycle guard)
/// - entity and metrics events → DEBUG (high-volume)
pub struct LoggingObserver {
    receiver: broadcast::Receiver<DecompositionEvent>,
}

impl LoggingObserver {
    /// Create a new logging observer subscribed to the event bus
    pub fn new(bus: &EventBus) -> Self {
        Self {
            receiver: bus.subscribe(),
        }
    }

    /// Run the observer, logging events until the channel closes
    ///
    /// This should be spawned as a tokio task:
    /// ```rust,ignore
    /// tokio::spawn(observer.run());
    /// ```
    pub async fn run(mut self) {
        loop {
            match self.receiver.recv().await {
                Ok(event) => Self::log_event(&event),
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("EventBus closed, logging observer stopping");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(
                        skipped = count,
                        "Logging observer lagged, skipped {} events", count
                    );
                }
            }
        }
    }

    /// Log a single event at the appropriate level
    pub fn log_event(event: &DecompositionEvent) {
        match event {
            DecompositionEvent::ProblemCreated { problem_id, .. } => {
                debug!(problem = %problem_id, "Problem created");
            }

            DecompositionEvent::ProblemUpdated { problem_id, .. } => {
                debug!(problem = %problem_id, "Problem updated");
            }

            DecompositionEvent::ComponentCreated {
                component_id,
                problem_id,
                dependency_count,
                ..
            } => {
                debug!(
                    component = %component_id,
                    problem = %problem_id,
                    dependencies = dependency_count,
                    "Component created"
                );
            }

            DecompositionEvent::ComponentUpdated {
                component_id,
                problem_id,
                ..
            } => {
                debug!(
                    component = %component_id,
                    problem = %problem_id,
                    "Component updated"
                );
            }

            DecompositionEvent::ComponentsLinked {
                source_id,
                target_id,
                already_linked,
                ..
            } => {
                info!(
                    source = %source_id,
                    target = %target_id,
                    already_linked = already_linked,
                    "Components linked"
                );
            }

            DecompositionEvent::LinkRejected {
                source_id,
                target_id,
                cycle,
                ..
            } => {
                warn!(
                    source = %source_id,
                    target = %target_id,
                    cycle = %cycle.join(" -> "),
                    "Link rejected by cycle guard"
                );
            }

            DecompositionEvent::PhaseStarted {
                phase_id,
                phase_index,
                ..
            } => {
                info!(phase = %phase_id, index = phase_index, "Phase started");
            }

            DecompositionEvent::PhaseCompleted {
                phase_id,
                problem_id,
                component_count,
                max_depth,
                balance_score,
                ..
            } => {
                info!(
                    phase = %phase_id,
                    problem = %problem_id,
                    components = component_count,
                    max_depth = max_depth,
                    balance = %format!("{:.2}", balance_score),
                    "Phase completed"
                );
            }

            DecompositionEvent::MetricsCalculated {
                problem_id,
                component_count,
                max_depth,
                balance_score,
                ..
            } => {
                debug!(
                    problem = %problem_id,
                    components = component_count,
                    max_depth = max_depth,
                    balance = %format!("{:.2}", balance_score),
                    "Metrics calculated"
                );
            }
        }
    }
}
