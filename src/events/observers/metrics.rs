//! Metrics Observer
//!
//! Tracks Prometheus-compatible metrics for monitoring:
//! - Counters: events by type, links created, links rejected
//! - Gauges: last observed balance score and max depth per problem

use crate::events::{DecompositionEvent, EventBus};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// Last structural measurement seen for a problem
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProblemGauge {
    pub component_count: usize,
    pub max_depth: usize,
    pub balance_score: f64,
}

/// Metrics collected from decomposition events
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Events observed, by event type
    pub events_total: HashMap<String, u64>,
    /// New dependency edges
    pub links_created: u64,
    /// Link requests for an edge that already existed
    pub links_repeated: u64,
    /// Links refused by the cycle guard
    pub links_rejected: u64,
    /// Phases closed
    pub phases_completed: u64,
    /// Latest measurement per problem, ordered by problem id
    pub problems: BTreeMap<String, ProblemGauge>,
}

impl Metrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one event of the given type
    pub fn record_event(&mut self, event_type: &str) {
        *self.events_total.entry(event_type.to_string()).or_insert(0) += 1;
    }

    /// Record the outcome of a link request
    pub fn record_link(&mut self, already_linked: bool) {
        if already_linked {
            self.links_repeated += 1;
        } else {
            self.links_created += 1;
        }
    }

    pub fn record_rejection(&mut self) {
        self.links_rejected += 1;
    }

    /// Overwrite the gauge for a problem
    pub fn record_measurement(
        &mut self,
        problem_id: &str,
        component_count: usize,
        max_depth: usize,
        balance_score: f64,
    ) {
        self.problems.insert(
            problem_id.to_string(),
            ProblemGauge {
                component_count,
                max_depth,
                balance_score,
            },
        );
    }

    /// Share of link requests refused by the cycle guard
    pub fn rejection_rate(&self) -> f64 {
        let total = self.links_created + self.links_repeated + self.links_rejected;
        if total == 0 {
            0.0
        } else {
            self.links_rejected as f64 / total as f64
        }
    }

    /// Format metrics as Prometheus text format
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP decomposer_events_total Events observed by type\n");
        output.push_str("# TYPE decomposer_events_total counter\n");
        let mut types: Vec<_> = self.events_total.iter().collect();
        types.sort();
        for (event_type, count) in types {
            output.push_str(&format!(
                "decomposer_events_total{{type=\"{}\"}} {}\n",
                event_type, count
            ));
        }

        output.push_str("# HELP decomposer_links_total Link requests by outcome\n");
        output.push_str("# TYPE decomposer_links_total counter\n");
        for (outcome, count) in [
            ("created", self.links_created),
            ("repeated", self.links_repeated),
            ("rejected", self.links_rejected),
        ] {
            output.push_str(&format!(
                "decomposer_links_total{{outcome=\"{}\"}} {}\n",
                outcome, count
            ));
        }

        output.push_str("# HELP decomposer_phases_completed_total Phases closed\n");
        output.push_str("# TYPE decomposer_phases_completed_total counter\n");
        output.push_str(&format!(
            "decomposer_phases_completed_total {}\n",
            self.phases_completed
        ));

        output.push_str("# HELP decomposer_balance_score Last observed balance score\n");
        output.push_str("# TYPE decomposer_balance_score gauge\n");
        for (problem, gauge) in &self.problems {
            output.push_str(&format!(
                "decomposer_balance_score{{problem=\"{}\"}} {}\n",
                problem, gauge.balance_score
            ));
        }

        output.push_str("# HELP decomposer_max_depth Last observed maximum dependency depth\n");
        output.push_str("# TYPE decomposer_max_depth gauge\n");
        for (problem, gauge) in &self.problems {
            output.push_str(&format!(
                "decomposer_max_depth{{problem=\"{}\"}} {}\n",
                problem, gauge.max_depth
            ));
        }

        output
    }

    /// Generate a human-readable report
    pub fn report(&self) -> String {
        let mut output = String::new();

        output.push_str("=== Decomposition Metrics Report ===\n\n");

        output.push_str("Events:\n");
        let mut types: Vec<_> = self.events_total.iter().collect();
        types.sort();
        for (event_type, count) in types {
            output.push_str(&format!("  {}: {}\n", event_type, count));
        }

        output.push_str(&format!(
            "\nLinks: created={}, repeated={}, rejected={} ({:.1}% rejected)\n",
            self.links_created,
            self.links_repeated,
            self.links_rejected,
            self.rejection_rate() * 100.0
        ));
        output.push_str(&format!("Phases completed: {}\n", self.phases_completed));

        output.push_str("\nProblems:\n");
        for (problem, gauge) in &self.problems {
            output.push_str(&format!(
                "  {}: {} components, depth {}, balance {:.2}\n",
                problem, gauge.component_count, gauge.max_depth, gauge.balance_score
            ));
        }

        output
    }
}

/// Observer that collects metrics from decomposition events
pub struct MetricsObserver {
    receiver: broadcast::Receiver<DecompositionEvent>,
    metrics: Arc<Mutex<Metrics>>,
}

impl MetricsObserver {
    /// Create a new metrics observer subscribed to the event bus
    pub fn new(bus: &EventBus) -> Self {
        Self {
            receiver: bus.subscribe(),
            metrics: Arc::new(Mutex::new(Metrics::new())),
        }
    }

    /// Get a handle to the metrics for reading
    pub fn metrics(&self) -> Arc<Mutex<Metrics>> {
        Arc::clone(&self.metrics)
    }

    /// Run the observer, collecting metrics until the channel closes
    pub async fn run(mut self) {
        loop {
            match self.receiver.recv().await {
                Ok(event) => self.process_event(&event),
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Metrics> {
        self.metrics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Process a single event and update metrics
    fn process_event(&self, event: &DecompositionEvent) {
        let mut metrics = self.lock();
        metrics.record_event(event.event_type());

        match event {
            DecompositionEvent::ComponentsLinked { already_linked, .. } => {
                metrics.record_link(*already_linked);
            }

            DecompositionEvent::LinkRejected { .. } => {
                metrics.record_rejection();
            }

            DecompositionEvent::PhaseCompleted {
                problem_id,
                component_count,
                max_depth,
                balance_score,
                ..
            } => {
                metrics.phases_completed += 1;
                metrics.record_measurement(problem_id, *component_count, *max_depth, *balance_score);
            }

            DecompositionEvent::MetricsCalculated {
                problem_id,
                component_count,
                max_depth,
                balance_score,
                ..
            } => {
                metrics.record_measurement(problem_id, *component_count, *max_depth, *balance_score);
            }

            DecompositionEvent::ProblemCreated { .. }
            | DecompositionEvent::ProblemUpdated { .. }
            | DecompositionEvent::ComponentCreated { .. }
            | DecompositionEvent::ComponentUpdated { .. }
            | DecompositionEvent::PhaseStarted { .. } => {
                // Counted by type only
            }
        }
    }
}
