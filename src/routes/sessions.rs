use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        question::{GenerateQuestionsResponse, QuestionPreview},
        session::{CreateSessionRequest, SessionDetails, SessionSummary},
    },
    error::AppError,
    routes::extract::Caller,
    services::session_service::{self, AdvanceTrigger},
    state::SharedState,
};

/// Session lifecycle routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/by-code/{code}", get(find_by_room_code))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route(
            "/sessions/{id}/questions",
            get(list_questions).post(generate_questions),
        )
        .route("/sessions/{id}/start", post(start_session))
        .route("/sessions/{id}/advance", post(advance_session))
        .route("/sessions/{id}/terminate", post(terminate_session))
}

/// Open a new session hosted by the caller.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    params(("X-User-Id" = String, Header, description = "Identity of the host")),
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionSummary),
        (status = 404, description = "Unknown playlist")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Caller(host): Caller,
    Valid(Json(payload)): Valid<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<SessionSummary>), AppError> {
    let session = session_service::create_session(&state, &host, payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// List the sessions hosted by the caller.
#[utoipa::path(
    get,
    path = "/sessions",
    tag = "sessions",
    params(("X-User-Id" = String, Header, description = "Identity of the host")),
    responses((status = 200, description = "Hosted sessions", body = [SessionSummary]))
)]
pub async fn list_sessions(
    State(state): State<SharedState>,
    Caller(host): Caller,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    Ok(Json(session_service::list_hosted(&state, &host).await?))
}

/// Session details: participants, question previews, current question and standings.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Session details", body = SessionDetails),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDetails>, AppError> {
    Ok(Json(session_service::get_details(&state, id).await?))
}

/// Delete a session and everything attached to it.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    tag = "sessions",
    params(
        ("X-User-Id" = String, Header, description = "Identity of the host"),
        ("id" = String, Path, description = "Identifier of the session")
    ),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 403, description = "Caller is not the host")
    )
)]
pub async fn delete_session(
    State(state): State<SharedState>,
    Caller(host): Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    session_service::delete_session(&state, id, &host).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Look a session up by its room code, ignoring case.
#[utoipa::path(
    get,
    path = "/sessions/by-code/{code}",
    tag = "sessions",
    params(("code" = String, Path, description = "Six character room code")),
    responses(
        (status = 200, description = "Session", body = SessionSummary),
        (status = 404, description = "No session uses this code")
    )
)]
pub async fn find_by_room_code(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(session_service::find_by_room_code(&state, &code).await?))
}

/// Generate the question set from the session playlist.
#[utoipa::path(
    post,
    path = "/sessions/{id}/questions",
    tag = "sessions",
    params(
        ("X-User-Id" = String, Header, description = "Identity of the host"),
        ("id" = String, Path, description = "Identifier of the session")
    ),
    responses(
        (status = 200, description = "Questions generated", body = GenerateQuestionsResponse),
        (status = 409, description = "Session not waiting or no question could be generated")
    )
)]
pub async fn generate_questions(
    State(state): State<SharedState>,
    Caller(host): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<GenerateQuestionsResponse>, AppError> {
    Ok(Json(
        session_service::generate_questions(&state, id, &host).await?,
    ))
}

/// List question previews; accepted answers are never included.
#[utoipa::path(
    get,
    path = "/sessions/{id}/questions",
    tag = "sessions",
    params(("id" = String, Path, description = "Identifier of the session")),
    responses((status = 200, description = "Question previews", body = [QuestionPreview]))
)]
pub async fn list_questions(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<QuestionPreview>>, AppError> {
    Ok(Json(session_service::list_questions(&state, id).await?))
}

/// Start the quiz.
#[utoipa::path(
    post,
    path = "/sessions/{id}/start",
    tag = "sessions",
    params(
        ("X-User-Id" = String, Header, description = "Identity of the host"),
        ("id" = String, Path, description = "Identifier of the session")
    ),
    responses(
        (status = 200, description = "Session started", body = SessionSummary),
        (status = 409, description = "Session cannot be started")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    Caller(host): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(session_service::start_session(&state, id, &host).await?))
}

/// Move to the next question, finishing the session after the last one.
#[utoipa::path(
    post,
    path = "/sessions/{id}/advance",
    tag = "sessions",
    params(
        ("X-User-Id" = String, Header, description = "Identity of the host"),
        ("id" = String, Path, description = "Identifier of the session")
    ),
    responses(
        (status = 200, description = "Session advanced", body = SessionSummary),
        (status = 409, description = "Session is not playing")
    )
)]
pub async fn advance_session(
    State(state): State<SharedState>,
    Caller(host): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(
        session_service::advance_session(&state, id, AdvanceTrigger::Host(host)).await?,
    ))
}

/// Stop the session early.
#[utoipa::path(
    post,
    path = "/sessions/{id}/terminate",
    tag = "sessions",
    params(
        ("X-User-Id" = String, Header, description = "Identity of the host"),
        ("id" = String, Path, description = "Identifier of the session")
    ),
    responses(
        (status = 200, description = "Session finished", body = SessionSummary),
        (status = 409, description = "Session already finished")
    )
)]
pub async fn terminate_session(
    State(state): State<SharedState>,
    Caller(host): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(
        session_service::terminate_session(&state, id, &host).await?,
    ))
}
