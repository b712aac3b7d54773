//! EventBus - Central event distribution for the decomposition engine
//!
//! Provides a broadcast-based event bus for decoupled observability.
//! The engine emits events, and multiple observers can subscribe to
//! receive all events without blocking the emitter.
//!
//! # Design
//!
//! - Uses `tokio::sync::broadcast` for multi-producer, multi-consumer
//! - Non-blocking emit (fire-and-forget)
//! - Lagging receivers drop old events (no backpressure)
//! - Thread-safe via Clone (Arc internally)

use super::DecompositionEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Default capacity for the event bus channel
pub const DEFAULT_CAPACITY: usize = 1024;

/// Central event bus for engine observability
///
/// # Example
///
/// ```rust,ignore
/// use decomposer::events::{DecompositionEvent, EventBus};
///
/// let bus = EventBus::new(1024);
/// let mut rx = bus.subscribe();
///
/// bus.emit(DecompositionEvent::problem_created("p1"));
///
/// while let Ok(event) = rx.recv().await {
///     println!("Event: {:?}", event);
/// }
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DecompositionEvent>>,
}

impl EventBus {
    /// Create a new EventBus with the specified capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer before old events
    ///   are dropped for lagging receivers (must be > 0)
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create an EventBus with default capacity (1024)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Non-blocking and fire-and-forget. If there are no subscribers, the
    /// event is silently dropped.
    pub fn emit(&self, event: DecompositionEvent) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<DecompositionEvent> {
        self.sender.subscribe()
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
