//! Session boundary events.
//!
//! The auth provider publishes an explicit event whenever the signed-in
//! identity changes; consumers (the note collection) subscribe and perform a
//! deterministic reset-and-refetch. No field-by-field identity comparison
//! happens anywhere downstream.

use tokio::sync::broadcast;

use crate::defaults::SESSION_BUS_CAPACITY;
use crate::models::ScopeId;

/// A change of the signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A caller signed in (or the active identity switched to this scope).
    SignedIn(ScopeId),
    /// The active caller signed out.
    SignedOut,
}

/// Broadcast channel for [`SessionEvent`]s.
///
/// Cheap to clone; subscribers each get an independent receiver. Emission
/// with no subscribers is a no-op, not an error.
#[derive(Debug, Clone)]
pub struct SessionBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SESSION_BUS_CAPACITY);
        Self { tx }
    }

    /// Subscribe to session events from this point onward.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers.
    pub fn emit(&self, event: SessionEvent) {
        // A send error only means nobody is listening right now.
        let _ = self.tx.send(event);
    }
}

impl Default for SessionBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let bus = SessionBus::new();
        let mut rx = bus.subscribe();

        bus.emit(SessionEvent::SignedIn(ScopeId::new("alice")));
        bus.emit(SessionEvent::SignedOut);

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::SignedIn(ScopeId::new("alice"))
        );
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::SignedOut);
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_noop() {
        let bus = SessionBus::new();
        bus.emit(SessionEvent::SignedOut);
        // A later subscriber sees only subsequent events.
        let mut rx = bus.subscribe();
        bus.emit(SessionEvent::SignedIn(ScopeId::new("bob")));
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::SignedIn(ScopeId::new("bob"))
        );
    }
}
