use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::answer::{SubmitAnswerRequest, SubmitAnswerResponse},
    error::AppError,
    routes::extract::Caller,
    services::scoring_service,
    state::SharedState,
};

/// Answer submission route.
pub fn router() -> Router<SharedState> {
    Router::new().route("/sessions/{id}/answers", post(submit_answer))
}

/// Submit an answer to the current question and get it scored.
#[utoipa::path(
    post,
    path = "/sessions/{id}/answers",
    tag = "answers",
    params(
        ("X-User-Id" = String, Header, description = "Identity of the participant"),
        ("id" = String, Path, description = "Identifier of the session")
    ),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer scored", body = SubmitAnswerResponse),
        (status = 409, description = "Not playing, wrong question or already answered")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Caller(identity): Caller,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    Ok(Json(
        scoring_service::submit_answer(&state, id, &identity, payload).await?,
    ))
}
