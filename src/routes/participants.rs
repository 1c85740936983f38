use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::participant::{JoinSessionRequest, ParticipantSummary},
    error::AppError,
    routes::extract::Caller,
    services::participant_service,
    state::SharedState,
};

/// Lobby routes: joining, leaving and listing participants.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/sessions/{id}/participants",
            post(join_session)
                .delete(leave_session)
                .get(list_participants),
        )
        .route(
            "/sessions/by-code/{code}/participants",
            post(join_by_room_code),
        )
}

/// Join a waiting session.
#[utoipa::path(
    post,
    path = "/sessions/{id}/participants",
    tag = "participants",
    params(
        ("X-User-Id" = String, Header, description = "Identity of the participant"),
        ("id" = String, Path, description = "Identifier of the session")
    ),
    request_body = JoinSessionRequest,
    responses(
        (status = 201, description = "Joined", body = ParticipantSummary),
        (status = 409, description = "Already joined, session full or not waiting")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    Caller(identity): Caller,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<JoinSessionRequest>>,
) -> Result<(StatusCode, Json<ParticipantSummary>), AppError> {
    let participant = participant_service::join_session(&state, id, &identity, payload).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

/// Join a waiting session by room code.
#[utoipa::path(
    post,
    path = "/sessions/by-code/{code}/participants",
    tag = "participants",
    params(
        ("X-User-Id" = String, Header, description = "Identity of the participant"),
        ("code" = String, Path, description = "Six character room code")
    ),
    request_body = JoinSessionRequest,
    responses(
        (status = 201, description = "Joined", body = ParticipantSummary),
        (status = 404, description = "No session uses this code")
    )
)]
pub async fn join_by_room_code(
    State(state): State<SharedState>,
    Caller(identity): Caller,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<JoinSessionRequest>>,
) -> Result<(StatusCode, Json<ParticipantSummary>), AppError> {
    let participant =
        participant_service::join_by_room_code(&state, &code, &identity, payload).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

/// Leave a session. Succeeds even when the caller never joined.
#[utoipa::path(
    delete,
    path = "/sessions/{id}/participants",
    tag = "participants",
    params(
        ("X-User-Id" = String, Header, description = "Identity of the participant"),
        ("id" = String, Path, description = "Identifier of the session")
    ),
    responses((status = 204, description = "Left the session"))
)]
pub async fn leave_session(
    State(state): State<SharedState>,
    Caller(identity): Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    participant_service::leave_session(&state, id, &identity).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Participants of a session in join order.
#[utoipa::path(
    get,
    path = "/sessions/{id}/participants",
    tag = "participants",
    params(("id" = String, Path, description = "Identifier of the session")),
    responses((status = 200, description = "Participants", body = [ParticipantSummary]))
)]
pub async fn list_participants(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ParticipantSummary>>, AppError> {
    Ok(Json(participant_service::list_participants(&state, id).await?))
}
