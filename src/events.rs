//! Event dispatch from the polling loop to consumers.
//!
//! The poller reports asynchronously through exactly four named events. Consumers
//! register callbacks before starting the poller (the registry is intended to be
//! append-only after setup); firing is safe from any task. A callback that panics
//! is caught and logged, never propagated, and never prevents the remaining
//! callbacks from running.
//!
//! # Example
//!
//! ```
//! use temp_inbox::{Event, EventDispatcher, EventKind};
//!
//! let dispatcher = EventDispatcher::new();
//! dispatcher.subscribe(EventKind::VerificationCode, |event| {
//!     if let Event::VerificationCode { code, .. } = event {
//!         println!("code: {code}");
//!     }
//! });
//! ```

use crate::session::Message;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, error};

/// The four event channels raised by the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A new message was appended to the session.
    EmailReceived,
    /// A message carried a verification code above the quality gate.
    VerificationCode,
    /// A non-fatal failure occurred (fetch error, callback problem).
    Error,
    /// Human-readable lifecycle narration (acquiring, expired, stopped, ...).
    StatusChange,
}

/// A fired event with its payload.
#[derive(Debug, Clone)]
pub enum Event {
    /// A new message arrived.
    EmailReceived(Message),
    /// A verification code was extracted from a new message.
    VerificationCode {
        /// The extracted code.
        code: String,
        /// The message it was found in.
        message: Message,
    },
    /// A non-fatal error description.
    Error(String),
    /// A status narration line.
    StatusChange(String),
}

impl Event {
    /// Returns the channel this event belongs to.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Event::EmailReceived(_) => EventKind::EmailReceived,
            Event::VerificationCode { .. } => EventKind::VerificationCode,
            Event::Error(_) => EventKind::Error,
            Event::StatusChange(_) => EventKind::StatusChange,
        }
    }
}

type Callback = Box<dyn Fn(&Event) + Send + Sync>;

/// Registry mapping event kind to an ordered list of callbacks.
///
/// The dispatcher never owns consumer state beyond the callbacks themselves.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<HashMap<EventKind, Vec<Callback>>>,
}

impl EventDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for one event kind.
    ///
    /// Callbacks fire in registration order. Register everything before starting
    /// the poller; registration is not synchronized against concurrent firing
    /// beyond the registry lock itself.
    pub fn subscribe(&self, kind: EventKind, callback: impl Fn(&Event) + Send + Sync + 'static) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(Box::new(callback));
    }

    /// Invokes every callback registered for the event's kind, in order.
    ///
    /// A panicking callback is caught and logged; the remaining callbacks still run.
    pub fn fire(&self, event: &Event) {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let Some(callbacks) = handlers.get(&event.kind()) else {
            debug!(kind = ?event.kind(), "No handlers registered for event");
            return;
        };

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                error!(kind = ?event.kind(), "Event callback panicked");
            }
        }
    }

    /// Returns the number of callbacks registered for a kind.
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EventDispatcher")
            .field(
                "handler_counts",
                &handlers
                    .iter()
                    .map(|(kind, list)| (*kind, list.len()))
                    .collect::<HashMap<_, _>>(),
            )
            .finish()
    }
}
