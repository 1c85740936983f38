use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::playlist::{CreatePlaylistRequest, PlaylistSummary},
    error::AppError,
    routes::extract::Caller,
    services::playlist_service,
    state::SharedState,
};

/// Playlist registration routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/playlists", post(create_playlist))
        .route("/playlists/{id}", get(get_playlist))
}

/// Register a playlist the caller can then build sessions from.
#[utoipa::path(
    post,
    path = "/playlists",
    tag = "playlists",
    params(("X-User-Id" = String, Header, description = "Identity of the caller")),
    request_body = CreatePlaylistRequest,
    responses(
        (status = 201, description = "Playlist created", body = PlaylistSummary),
        (status = 400, description = "Invalid playlist")
    )
)]
pub async fn create_playlist(
    State(state): State<SharedState>,
    Caller(owner): Caller,
    Valid(Json(payload)): Valid<Json<CreatePlaylistRequest>>,
) -> Result<(StatusCode, Json<PlaylistSummary>), AppError> {
    let playlist = playlist_service::create_playlist(&state, &owner, payload).await?;
    Ok((StatusCode::CREATED, Json(playlist)))
}

/// Retrieve a playlist by its identifier.
#[utoipa::path(
    get,
    path = "/playlists/{id}",
    tag = "playlists",
    params(("id" = String, Path, description = "Identifier of the playlist")),
    responses(
        (status = 200, description = "Playlist", body = PlaylistSummary),
        (status = 404, description = "Unknown playlist")
    )
)]
pub async fn get_playlist(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlaylistSummary>, AppError> {
    Ok(Json(playlist_service::get_playlist(&state, id).await?))
}
