use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::sse::{Handshake, QuizEvent, ServerEvent},
    state::{SharedState, SseHub},
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Publish a quiz event on the stream of `session_id`. Delivery is best effort.
pub fn publish(state: &SharedState, session_id: Uuid, event: &QuizEvent) {
    let name = event.name();
    match ServerEvent::json(Some(name.to_string()), event) {
        Ok(payload) => state.session_sse(session_id).broadcast(payload),
        Err(err) => warn!(%session_id, event = name, error = %err, "failed to serialize SSE payload"),
    }
}

/// Greet a freshly connected client.
pub fn broadcast_handshake(hub: &SseHub, session_id: Uuid, degraded: bool) {
    let payload = Handshake {
        session_id,
        message: "session stream connected".into(),
        degraded,
    };
    match ServerEvent::json(Some(EVENT_HANDSHAKE.to_string()), &payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(%session_id, error = %err, "failed to serialize SSE handshake"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        services::{identity::HeaderIdentityProvider, video_provider::StaticVideoProvider},
        state::AppState,
    };

    #[tokio::test]
    async fn published_events_reach_session_subscribers_only() {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(StaticVideoProvider::empty()),
            Arc::new(HeaderIdentityProvider),
        );
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut receiver = state.session_sse(watched).subscribe();
        let mut other_receiver = state.session_sse(other).subscribe();

        publish(
            &state,
            watched,
            &QuizEvent::ScoreUpdated {
                participant_id: Uuid::nil(),
                score: 3,
            },
        );

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("score_updated"));
        assert!(event.data.contains("\"score\":3"));
        assert!(other_receiver.try_recv().is_err());
    }
}
