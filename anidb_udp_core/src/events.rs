//! Connection notifications
//!
//! Events are published on a broadcast channel. Nobody has to listen; a send
//! without receivers is silently dropped.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Something a scheduler or UI may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// A login, test login or command failed to establish a session
    LoginFailed,
    /// The invalid-session flag changed
    InvalidSessionChanged(bool),
    /// The client is now banned
    Banned { expires: DateTime<Utc> },
    /// A ban was lifted
    BanCleared,
    /// The server asked for a pause
    BanPaused { seconds: u64, reason: String },
}

#[derive(Debug)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<ConnectionEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn emit(&self, event: ConnectionEvent) {
        log::trace!("Connection event: {event:?}");
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new();
        bus.emit(ConnectionEvent::LoginFailed);
    }

    #[test]
    fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(ConnectionEvent::InvalidSessionChanged(true));
        bus.emit(ConnectionEvent::LoginFailed);

        assert_eq!(
            rx.try_recv().unwrap(),
            ConnectionEvent::InvalidSessionChanged(true)
        );
        assert_eq!(rx.try_recv().unwrap(), ConnectionEvent::LoginFailed);
        assert!(rx.try_recv().is_err());
    }
}
