use tracing::warn;

use crate::{
    dto::health::{HealthResponse, HealthStatus},
    state::SharedState,
};

/// Probe the quiz store and describe the collaborators currently wired in.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let store = match state.quiz_store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => Some(store.backend().to_owned()),
            Err(err) => {
                warn!(backend = store.backend(), error = %err, "quiz store health check failed");
                None
            }
        },
        None => None,
    };

    let status = if store.is_some() && !state.is_degraded().await {
        HealthStatus::Ok
    } else {
        HealthStatus::Degraded
    };

    HealthResponse {
        status,
        store,
        video_provider: state.video_provider().name().to_owned(),
        open_sessions: state.open_session_hubs(),
        pending_advances: state.pending_advances(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        services::{
            identity::HeaderIdentityProvider, test_support, video_provider::StaticVideoProvider,
        },
        state::AppState,
    };

    #[tokio::test]
    async fn reports_backend_and_provider_when_healthy() {
        let state = test_support::state().await;
        let report = health_status(&state).await;

        assert_eq!(report.status, HealthStatus::Ok);
        assert_eq!(report.store.as_deref(), Some("memory"));
        assert_eq!(report.video_provider, "static");
        assert_eq!(report.pending_advances, 0);
    }

    #[tokio::test]
    async fn missing_store_is_degraded() {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(StaticVideoProvider::empty()),
            Arc::new(HeaderIdentityProvider),
        );
        let report = health_status(&state).await;

        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.store, None);
    }

    #[tokio::test]
    async fn counts_sessions_with_live_streams() {
        let state = test_support::state().await;
        let session_id = test_support::session(&state, Default::default()).await;
        let _events = state.session_sse(session_id).subscribe();

        assert_eq!(health_status(&state).await.open_sessions, 1);
    }
}
