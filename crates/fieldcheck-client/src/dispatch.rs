//! Inbound message parsing and fan-out.
//!
//! Raw frames are parsed into [`ServerMessage`] and broadcast, in
//! registration order, to every registered handler. Malformed frames are
//! logged and dropped; they never reach handlers and never escape the
//! dispatch path.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use fieldcheck_core::messages::ServerMessage;

/// Capability token returned by [`MessageDispatcher::add_handler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// A registered message consumer.
pub type Handler = Arc<dyn Fn(&ServerMessage) + Send + Sync>;

/// Parses raw frames and broadcasts them to registered handlers.
///
/// Each broadcast iterates a snapshot of the registry taken under the lock
/// and released before invocation, so handlers may register or unregister
/// during a broadcast; such changes take effect with the next message.
#[derive(Default)]
pub struct MessageDispatcher {
    handlers: Mutex<Vec<(HandlerId, Handler)>>,
    next_id: AtomicU64,
}

impl MessageDispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer; returns the token for later removal.
    pub fn add_handler(&self, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, handler));
        id
    }

    /// Unregister by token. Returns whether a handler was removed.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        handlers.len() != before
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Whether no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.lock().is_empty()
    }

    /// Parse a raw frame and broadcast it.
    pub fn dispatch_raw(&self, raw: &str) {
        match ServerMessage::parse(raw) {
            Ok(message) => self.dispatch(&message),
            Err(e) => warn!(error = %e, "dropping malformed inbound frame"),
        }
    }

    /// Broadcast an already-parsed message in registration order.
    pub fn dispatch(&self, message: &ServerMessage) {
        let snapshot: Vec<Handler> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in snapshot {
            handler(message);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
