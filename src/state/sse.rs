use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// SSE-specific sub-state carved out from [`AppState`](super::AppState): one hub per session.
pub struct SseState {
    hubs: DashMap<Uuid, SseHub>,
    capacity: usize,
}

impl SseState {
    /// Build the SSE sub-tree with the given per-session channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity,
        }
    }

    /// Hub of `session_id`, created on first use.
    pub fn session(&self, session_id: Uuid) -> SseHub {
        self.hubs
            .entry(session_id)
            .or_insert_with(|| SseHub::new(self.capacity))
            .clone()
    }

    /// Number of live hubs.
    pub fn hub_count(&self) -> usize {
        self.hubs.len()
    }

    /// Forget the hub; connected streams end once the last sender is dropped.
    pub fn remove(&self, session_id: Uuid) {
        self.hubs.remove(&session_id);
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
#[derive(Clone)]
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
