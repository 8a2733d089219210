//! Event types for the Louvor event system
//!
//! Provides shared event definitions and EventBus for all Louvor modules.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Louvor event types
///
/// Events are broadcast via EventBus and can be serialized for transmission.
/// All events use this central enum for type safety and exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LouvorEvent {
    /// Records in a collection were created, updated, or deleted
    ///
    /// Triggers:
    /// - UI: Refresh views bound to the collection
    /// - Repertoire director: Re-examine songs after `musicas` changes
    CollectionChanged {
        /// Name of the collection that changed
        collection: String,
        /// When the change was persisted
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A user joined a ministry via invite PIN
    ///
    /// Triggers:
    /// - UI: Refresh member lists
    /// - Leaders: Notification of the new member
    MemberJoined {
        /// Ministry that gained a member
        ministerio_id: String,
        /// User who joined
        usuario_id: String,
        /// When the join was persisted
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A song was promoted into the shared repertoire pool
    ///
    /// Triggers:
    /// - UI: Refresh the shared repertoire view
    SongShared {
        /// Song that became shared
        musica_id: String,
        /// Ministry that originally added the song
        ministerio_id: String,
        /// When the promotion was persisted
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl LouvorEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            LouvorEvent::CollectionChanged { .. } => "CollectionChanged",
            LouvorEvent::MemberJoined { .. } => "MemberJoined",
            LouvorEvent::SongShared { .. } => "SongShared",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Capacity Recommendations
///
/// - Desktop deployments: 256-1000
/// - Testing: 10-100
///
/// # Examples
///
/// ```
/// use louvor_common::events::{EventBus, LouvorEvent};
/// use std::sync::Arc;
///
/// let event_bus = Arc::new(EventBus::new(256));
///
/// // Subscribe to events
/// let mut rx = event_bus.subscribe();
///
/// // Emit an event
/// event_bus.emit(LouvorEvent::CollectionChanged {
///     collection: "usuarios".to_string(),
///     timestamp: chrono::Utc::now(),
/// }).ok();
///
/// // Receive events (in async context)
/// // while let Ok(event) = rx.recv().await {
/// //     match event {
/// //         LouvorEvent::CollectionChanged { .. } => {
/// //             // Handle collection change
/// //         }
/// //         _ => {}
/// //     }
/// // }
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LouvorEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    /// # Examples
    ///
    /// ```
    /// use louvor_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Returns a receiver that will receive all events emitted after subscription.
    /// Events emitted before subscription are not received.
    ///
    /// # Examples
    ///
    /// ```
    /// use louvor_common::events::EventBus;
    /// use std::sync::Arc;
    ///
    /// let event_bus = Arc::new(EventBus::new(256));
    /// let mut rx = event_bus.subscribe();
    ///
    /// // In async context:
    /// // tokio::spawn(async move {
    /// //     while let Ok(event) = rx.recv().await {
    /// //         println!("Received event: {:?}", event);
    /// //     }
    /// // });
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<LouvorEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: LouvorEvent,
    ) -> Result<usize, broadcast::error::SendError<LouvorEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// This is useful for non-critical events where it's acceptable if
    /// no component is currently listening. Change notifications from the
    /// document store use this path so writes never fail on delivery.
    ///
    /// # Examples
    ///
    /// ```
    /// use louvor_common::events::{EventBus, LouvorEvent};
    ///
    /// let event_bus = EventBus::new(100);
    ///
    /// // Collection notifications - OK if no one is listening
    /// event_bus.emit_lossy(LouvorEvent::CollectionChanged {
    ///     collection: "musicas".to_string(),
    ///     timestamp: chrono::Utc::now(),
    /// });
    /// ```
    pub fn emit_lossy(&self, event: LouvorEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    ///
    /// Useful for debugging and monitoring
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
