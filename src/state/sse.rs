use dashmap::DashMap;
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

const PARTICIPANT_CAPACITY: usize = 8;

/// SSE-specific sub-state carved out from [`AppState`](super::AppState).
pub struct SseState {
    public: SseHub,
    admin: AdminSseState,
    participants: DashMap<Uuid, SseHub>,
}

impl SseState {
    /// Build the SSE sub-tree with per-stream channel capacities.
    pub fn new(public_capacity: usize, admin_capacity: usize) -> Self {
        Self {
            public: SseHub::new(public_capacity),
            admin: AdminSseState::new(admin_capacity),
            participants: DashMap::new(),
        }
    }

    /// Access the public SSE hub used to fan out broadcast events.
    pub fn public(&self) -> &SseHub {
        &self.public
    }

    /// Access the admin SSE state bundle containing both hub and token.
    pub fn admin(&self) -> &AdminSseState {
        &self.admin
    }

    /// Subscribe to a participant channel, creating it on first use.
    pub fn subscribe_participant(&self, id: Uuid) -> broadcast::Receiver<ServerEvent> {
        self.participants
            .entry(id)
            .or_insert_with(|| SseHub::new(PARTICIPANT_CAPACITY))
            .subscribe()
    }

    /// Send to a participant channel; dropped silently when nobody listens.
    pub fn send_participant(&self, id: Uuid, event: ServerEvent) {
        if let Some(hub) = self.participants.get(&id) {
            hub.broadcast(event);
        }
    }

    /// Send a final event to every participant channel, then drop the channels so streams end.
    pub fn close_participants(&self, farewell: impl Fn(Uuid) -> Option<ServerEvent>) -> usize {
        let ids: Vec<Uuid> = self.participants.iter().map(|entry| *entry.key()).collect();
        for id in &ids {
            if let Some((_, hub)) = self.participants.remove(id) {
                if let Some(event) = farewell(*id) {
                    hub.broadcast(event);
                }
            }
        }
        ids.len()
    }

    /// Number of participant channels currently allocated.
    pub fn participant_channels(&self) -> usize {
        self.participants.len()
    }
}

/// State bundle holding the admin SSE hub and its coordinating token.
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

    /// Borrow the broadcast hub used for admin-only events.
    pub fn hub(&self) -> &SseHub {
        &self.hub
    }

    /// Borrow the token mutex that coordinates the single admin connection.
    pub fn token(&self) -> &Mutex<Option<String>> {
        &self.token
    }
}

/// Broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
