//! # Lifecycle events emitted by the conductor.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Startup events**: registration and the sequential start loop (starting, ready, failed, timeout)
//! - **Shutdown events**: the stop path (requested, stopping, stopped, all stopped, ceiling exceeded)
//! - **Subscriber events**: delivery problems inside the fan-out layer
//!
//! The [`Event`] struct carries additional metadata such as timestamps, service name,
//! position in registration order, reasons, and timeouts.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use conductor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StartTimeout)
//!     .with_service("db")
//!     .with_position(0)
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::StartTimeout);
//! assert_eq!(ev.service.as_deref(), Some("db"));
//! assert_eq!(ev.timeout_ms, Some(5_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of conductor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `service`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `service`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Startup events ===
    /// A service was appended to the registration list.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `position`: index in registration order
    ServiceRegistered,

    /// `run` is about to be invoked for a service.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `position`: index in registration order
    ServiceStarting,

    /// The service fired its readiness signal.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `position`: index in registration order
    ServiceReady,

    /// `run` returned an error, or the readiness signal was dropped unfired.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `position`: index in registration order
    /// - `reason`: error message
    ServiceFailed,

    /// The service did not become ready within the start timeout.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `position`: index in registration order
    /// - `timeout_ms`: configured start timeout (ms)
    StartTimeout,

    /// The start loop stopped early; remaining services were never launched.
    ///
    /// Sets:
    /// - `reason`: why startup was abandoned
    StartAborted,

    /// Every registered service reported ready.
    StartCompleted,

    // === Shutdown events ===
    /// The shutdown path was entered.
    ///
    /// Sets:
    /// - `reason`: trigger (explicit call, startup failure, signal)
    /// - `timeout_ms`: stop timeout communicated to services (ms)
    ShutdownRequested,

    /// An OS termination signal was observed by the signal bridge.
    ///
    /// Sets:
    /// - `reason`: signal name
    SignalReceived,

    /// A shutdown request was delivered to a service.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `position`: index in registration order
    ServiceStopping,

    /// The service acknowledged shutdown.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `position`: index in registration order
    /// - `reason`: set when the stopped signal was dropped instead of fired
    ServiceStopped,

    /// Every targeted service acknowledged shutdown.
    AllStopped,

    /// The stop ceiling elapsed before every service acknowledged.
    ///
    /// Sets:
    /// - `reason`: names of the services still running
    /// - `timeout_ms`: the ceiling that was exceeded (ms)
    StopTimeoutExceeded,
}

/// Conductor event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, triggers, stragglers).
    pub reason: Option<Arc<str>>,
    /// Index of the service in registration order.
    pub position: Option<u32>,
    /// Name of the service, if applicable.
    pub service: Option<Arc<str>>,
    /// Event classification.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            timeout_ms: None,
            reason: None,
            position: None,
            service: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a service name.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches the registration index.
    #[inline]
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }

    /// True for events produced by the fan-out layer itself.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
