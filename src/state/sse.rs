use tokio::sync::{Mutex, broadcast};

use crate::dto::sse::ServerEvent;

/// Broadcast hubs for the two SSE audiences: displays and the admin console.
pub struct SseState {
    public: SseHub,
    admin: AdminSseState,
}

impl SseState {
    pub fn new(public_capacity: usize, admin_capacity: usize) -> Self {
        Self {
            public: SseHub::new(public_capacity),
            admin: AdminSseState::new(admin_capacity),
        }
    }

    pub fn public(&self) -> &SseHub {
        &self.public
    }

    pub fn admin(&self) -> &AdminSseState {
        &self.admin
    }
}

/// Admin hub plus the token handed to the single connected admin console.
pub struct AdminSseState {
    hub: SseHub,
    token: Mutex<Option<String>>,
}

impl AdminSseState {
    fn new(capacity: usize) -> Self {
        Self {
            hub: SseHub::new(capacity),
            token: Mutex::new(None),
        }
    }

    pub fn hub(&self) -> &SseHub {
        &self.hub
    }

    pub fn token(&self) -> &Mutex<Option<String>> {
        &self.token
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers. Having no subscriber is not an error.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
