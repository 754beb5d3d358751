//! Authentication events for the application shell.
//!
//! The request client never navigates. When the server rejects the session
//! it clears the store and publishes `AuthEvent::SessionExpired`; whatever
//! owns the user interface subscribes and moves to the login view.

use tokio::sync::broadcast;
use tracing::debug;

/// Route of the login view.
pub const LOGIN_ROUTE: &str = "/login";

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SessionExpired { redirect_to: &'static str },
}

/// Cloneable broadcaster of auth events.
#[derive(Debug, Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }

    /// Publish a session expiry. Having no subscribers is fine.
    pub fn session_expired(&self) {
        let event = AuthEvent::SessionExpired {
            redirect_to: LOGIN_ROUTE,
        };
        if self.tx.send(event).is_err() {
            debug!("Session expired with no auth event subscribers");
        }
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expired_reaches_subscribers() {
        let events = AuthEvents::new();
        let mut first = events.subscribe();
        let mut second = events.clone().subscribe();

        events.session_expired();

        let expected = AuthEvent::SessionExpired {
            redirect_to: "/login",
        };
        assert_eq!(first.try_recv().unwrap(), expected);
        assert_eq!(second.try_recv().unwrap(), expected);
    }

    #[test]
    fn test_session_expired_without_subscribers() {
        let events = AuthEvents::new();
        events.session_expired();

        let mut late = events.subscribe();
        assert!(late.try_recv().is_err());
    }
}
