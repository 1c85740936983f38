//! Participant registry: joining and leaving the lobby of a session.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{ParticipantEntity, SessionEntity, SessionStatus},
    dto::{
        participant::{JoinSessionRequest, ParticipantSummary},
        sse::QuizEvent,
    },
    error::ServiceError,
    services::{
        identity::Identity,
        session_service::{load_session, session_by_room_code},
        sse_events,
    },
    state::SharedState,
};

/// Join a waiting session by id.
pub async fn join_session(
    state: &SharedState,
    session_id: Uuid,
    identity: &Identity,
    request: JoinSessionRequest,
) -> Result<ParticipantSummary, ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    let store = state.require_quiz_store().await?;
    let session = load_session(&store, session_id).await?;
    join(state, session, identity, request).await
}

/// Join a waiting session by its room code.
pub async fn join_by_room_code(
    state: &SharedState,
    code: &str,
    identity: &Identity,
    request: JoinSessionRequest,
) -> Result<ParticipantSummary, ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    let session = session_by_room_code(state, code).await?;
    join(state, session, identity, request).await
}

async fn join(
    state: &SharedState,
    session: SessionEntity,
    identity: &Identity,
    request: JoinSessionRequest,
) -> Result<ParticipantSummary, ServiceError> {
    if session.status != SessionStatus::Waiting {
        return Err(ServiceError::InvalidState(
            "session is no longer accepting participants".into(),
        ));
    }

    let participant = ParticipantEntity {
        id: Uuid::new_v4(),
        session_id: session.id,
        identity: identity.as_str().to_owned(),
        display_name: request.display_name.trim().to_owned(),
        score: 0,
        connected: true,
        joined_at: SystemTime::now(),
    };

    // Identity uniqueness and capacity are enforced by the store in a single step.
    let store = state.require_quiz_store().await?;
    store
        .insert_participant(participant.clone(), session.settings.max_participants)
        .await?;

    info!(session_id = %session.id, participant_id = %participant.id, "participant joined");
    let summary = ParticipantSummary::from(participant);
    sse_events::publish(
        state,
        session.id,
        &QuizEvent::ParticipantJoined {
            participant: summary.clone(),
        },
    );
    Ok(summary)
}

/// Leave a session. Leaving a session one never joined is not an error.
pub async fn leave_session(
    state: &SharedState,
    session_id: Uuid,
    identity: &Identity,
) -> Result<(), ServiceError> {
    let store = state.require_quiz_store().await?;
    let Some(participant) = store
        .delete_participant(session_id, identity.as_str().to_owned())
        .await?
    else {
        return Ok(());
    };

    info!(%session_id, participant_id = %participant.id, "participant left");
    sse_events::publish(
        state,
        session_id,
        &QuizEvent::ParticipantLeft {
            participant_id: participant.id,
            display_name: participant.display_name,
        },
    );
    Ok(())
}

/// Participants of a session in join order.
pub async fn list_participants(
    state: &SharedState,
    session_id: Uuid,
) -> Result<Vec<ParticipantSummary>, ServiceError> {
    let store = state.require_quiz_store().await?;
    load_session(&store, session_id).await?;
    let participants = store.list_participants(session_id).await?;
    Ok(participants.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::{
            session_service,
            test_support::{self, HOST, identity},
        },
        state::settings::PartialQuizSettings,
    };

    fn request(name: &str) -> JoinSessionRequest {
        JoinSessionRequest {
            display_name: name.into(),
        }
    }

    #[tokio::test]
    async fn join_enforces_identity_uniqueness_and_capacity() {
        let state = test_support::state().await;
        let session_id = test_support::session(
            &state,
            PartialQuizSettings {
                max_participants: Some(2),
                ..Default::default()
            },
        )
        .await;

        let first = join_session(&state, session_id, &identity("p1"), request("  Alice  "))
            .await
            .unwrap();
        assert_eq!(first.display_name, "Alice");
        assert_eq!(first.score, 0);

        let twice = join_session(&state, session_id, &identity("p1"), request("Alice")).await;
        assert!(matches!(twice, Err(ServiceError::AlreadyJoined)));

        join_session(&state, session_id, &identity("p2"), request("Bob"))
            .await
            .unwrap();
        let full = join_session(&state, session_id, &identity("p3"), request("Carol")).await;
        assert!(matches!(full, Err(ServiceError::CapacityExceeded { max: 2 })));

        let names: Vec<String> = list_participants(&state, session_id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.display_name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn join_requires_a_waiting_session() {
        let state = test_support::state().await;
        let missing = join_session(&state, Uuid::new_v4(), &identity("p1"), request("A")).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));

        let session_id = test_support::session(&state, PartialQuizSettings::default()).await;
        session_service::terminate_session(&state, session_id, &identity(HOST))
            .await
            .unwrap();
        let closed = join_session(&state, session_id, &identity("p1"), request("A")).await;
        assert!(matches!(closed, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn blank_display_name_is_rejected() {
        let state = test_support::state().await;
        let session_id = test_support::session(&state, PartialQuizSettings::default()).await;
        let blank = join_session(&state, session_id, &identity("p1"), request("   ")).await;
        assert!(matches!(blank, Err(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn room_code_join_is_case_insensitive() {
        let state = test_support::state().await;
        let session_id = test_support::session(&state, PartialQuizSettings::default()).await;
        let details = session_service::get_details(&state, session_id).await.unwrap();
        let code = details.session.room_code.to_lowercase();

        let joined = join_by_room_code(&state, &code, &identity("p1"), request("A"))
            .await
            .unwrap();
        assert_eq!(joined.session_id, session_id);

        let unknown = join_by_room_code(&state, "zzzzzz", &identity("p2"), request("B")).await;
        assert!(matches!(unknown, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn leave_is_idempotent() {
        let state = test_support::state().await;
        let session_id = test_support::session(&state, PartialQuizSettings::default()).await;
        test_support::join(&state, session_id, "p1").await;
        let mut events = state.session_sse(session_id).subscribe();

        leave_session(&state, session_id, &identity("p1")).await.unwrap();
        leave_session(&state, session_id, &identity("p1")).await.unwrap();
        leave_session(&state, session_id, &identity("never-joined"))
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("participant_left"));
        assert!(events.try_recv().is_err());
        assert!(list_participants(&state, session_id).await.unwrap().is_empty());
    }
}
