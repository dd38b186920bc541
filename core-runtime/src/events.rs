//! # Event Bus System
//!
//! Provides an event-driven channel out of the importer using
//! `tokio::sync::broadcast`, plus the [`ProgressSink`] abstraction the
//! downloader reports through.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wraps batch, transfer and publish events
//! - **EventBus**: central broadcast channel; emitting with no subscriber is
//!   not an error worth acting on
//! - **ProgressSink**: injected per call; a closure, the event bus, or
//!   [`NullProgress`]
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{BatchEvent, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Batch(BatchEvent::Usable {
//!         batch_id: "f00d".to_string(),
//!     }))
//!     .ok();
//!
//! assert!(subscriber.try_recv().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::SendError, Receiver};

/// Default buffer size for the event bus
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Capacity reservation lifecycle
    Batch(BatchEvent),
    /// Byte transfer progress
    Transfer(TransferEvent),
    /// Publication stages
    Publish(PublishEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Batch(e) => e.description(),
            CoreEvent::Transfer(e) => e.description(),
            CoreEvent::Publish(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Batch(BatchEvent::TimedOut { .. }) => EventSeverity::Error,
            CoreEvent::Publish(PublishEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Batch(BatchEvent::Usable { .. }) => EventSeverity::Info,
            CoreEvent::Publish(PublishEvent::Indexed { .. }) => EventSeverity::Info,
            CoreEvent::Transfer(TransferEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Batch Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum BatchEvent {
    /// Reservation request sent
    Requested { depth: u8, amount: u64 },
    /// Gateway accepted the reservation
    ReferenceObtained { reference: String },
    /// Chain assigned the batch id
    IdentifierResolved { reference: String, batch_id: String },
    /// Batch can stamp uploads
    Usable { batch_id: String },
    /// Polling budget exhausted
    TimedOut {
        /// "identifier" or "usability"
        stage: String,
        /// Reference or batch id being polled
        identifier: String,
        waited_secs: u64,
    },
}

impl BatchEvent {
    fn description(&self) -> &str {
        match self {
            BatchEvent::Requested { .. } => "Batch requested",
            BatchEvent::ReferenceObtained { .. } => "Batch reference obtained",
            BatchEvent::IdentifierResolved { .. } => "Batch identifier resolved",
            BatchEvent::Usable { .. } => "Batch usable",
            BatchEvent::TimedOut { .. } => "Batch polling timed out",
        }
    }
}

// ============================================================================
// Transfer Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum TransferEvent {
    Progress {
        resource: String,
        bytes_transferred: u64,
        total_bytes: u64,
    },
    Completed {
        resource: String,
        bytes: u64,
    },
}

impl TransferEvent {
    fn description(&self) -> &str {
        match self {
            TransferEvent::Progress { .. } => "Transfer in progress",
            TransferEvent::Completed { .. } => "Transfer completed",
        }
    }
}

// ============================================================================
// Publish Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PublishEvent {
    ThumbnailUploaded { address: String },
    VariantUploaded { label: String, address: String },
    ManifestUploaded { address: String },
    /// Public offer registered for an uploaded resource
    Offered { address: String },
    Indexed { entry_id: String, created: bool },
    Failed { stage: String, message: String },
}

impl PublishEvent {
    fn description(&self) -> &str {
        match self {
            PublishEvent::ThumbnailUploaded { .. } => "Thumbnail uploaded",
            PublishEvent::VariantUploaded { .. } => "Video variant uploaded",
            PublishEvent::ManifestUploaded { .. } => "Manifest uploaded",
            PublishEvent::Offered { .. } => "Resource offered",
            PublishEvent::Indexed { .. } => "Index entry published",
            PublishEvent::Failed { .. } => "Publication failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for broadcasting events to multiple subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// A subscriber that falls behind by more than `capacity` events
    /// receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber; past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Progress sink that emits [`TransferEvent::Progress`] for `resource`
    pub fn progress(&self, resource: impl Into<String>) -> BusProgress {
        BusProgress {
            bus: self.clone(),
            resource: resource.into(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Receives `(bytes_transferred, total_bytes)` updates
pub trait ProgressSink: Send + Sync {
    fn report(&self, transferred: u64, total: u64);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn report(&self, transferred: u64, total: u64) {
        self(transferred, total)
    }
}

/// Discards progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _transferred: u64, _total: u64) {}
}

/// Event bus adapter returned by [`EventBus::progress`]
#[derive(Debug, Clone)]
pub struct BusProgress {
    bus: EventBus,
    resource: String,
}

impl ProgressSink for BusProgress {
    fn report(&self, transferred: u64, total: u64) {
        self.bus
            .emit(CoreEvent::Transfer(TransferEvent::Progress {
                resource: self.resource.clone(),
                bytes_transferred: transferred,
                total_bytes: total,
            }))
            .ok();
    }
}
