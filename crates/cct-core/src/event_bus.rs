//! Framework-agnostic session event broadcasting.
//!
//! The EventBus distributes terminal output and exit notifications to
//! multiple consumers (desktop IPC, WebSocket clients, tests) from a single
//! source. Events are typed rather than stringly-keyed so that ordering
//! (data before exit, exactly one exit per session) is visible in the type
//! signature of the producer, not a convention.
//!
//! # Example
//!
//! ```rust
//! use cct_core::event_bus::{EventBus, SessionEvent};
//! use std::sync::Arc;
//!
//! let event_bus = Arc::new(EventBus::new());
//!
//! // Subscribe to events
//! let mut rx = event_bus.subscribe();
//!
//! // Emit an event
//! event_bus.emit(SessionEvent::Data { id: 1, data: b"hello".to_vec() });
//!
//! // Receive the event (in async context)
//! // let event = rx.recv().await.unwrap();
//! ```

use serde::Serialize;
use tokio::sync::broadcast;

/// Default channel capacity for the event bus.
/// Events beyond this capacity will cause slow subscribers to miss events (lag).
const DEFAULT_CAPACITY: usize = 1024;

/// An event emitted on behalf of one session, tagged with its id.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum SessionEvent {
    /// One batched flush of PTY output.
    Data { id: u64, data: Vec<u8> },
    /// The session's process terminated. Emitted exactly once per session,
    /// always after its final `Data` event.
    Exit { id: u64, exit_code: i32 },
}

impl SessionEvent {
    /// The id of the session this event belongs to.
    pub fn session_id(&self) -> u64 {
        match self {
            SessionEvent::Data { id, .. } => *id,
            SessionEvent::Exit { id, .. } => *id,
        }
    }
}

/// A broadcast bus fanning session events out to every subscriber.
///
/// Uses a tokio broadcast channel internally, allowing multiple consumers to
/// receive the same events concurrently.
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new EventBus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new EventBus with specified capacity.
    ///
    /// The capacity determines how many events can be buffered before slow
    /// subscribers start missing events (experiencing lag).
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// If there are no subscribers, the event is dropped and 0 is returned.
    pub fn emit(&self, event: SessionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to all events on this bus.
    ///
    /// Returns a receiver that will receive all future events.
    /// Past events are not delivered to new subscribers.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Get the current number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
