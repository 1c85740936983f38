use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{PlaylistEntity, PlaylistVideoEntity},
    dto::playlist::{CreatePlaylistRequest, PlaylistSummary, PlaylistVideoInput},
    error::ServiceError,
    services::{identity::Identity, question_generator::resolve_video_reference},
    state::SharedState,
};

/// Persist a playlist owned by `owner`.
pub async fn create_playlist(
    state: &SharedState,
    owner: &Identity,
    request: CreatePlaylistRequest,
) -> Result<PlaylistSummary, ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let videos = request
        .videos
        .into_iter()
        .map(into_video)
        .collect::<Result<Vec<_>, _>>()?;

    let playlist = PlaylistEntity {
        id: Uuid::new_v4(),
        name: request.name.trim().to_owned(),
        owner_id: owner.as_str().to_owned(),
        videos,
        created_at: SystemTime::now(),
    };

    let store = state.require_quiz_store().await?;
    store.save_playlist(playlist.clone()).await?;
    info!(playlist_id = %playlist.id, videos = playlist.videos.len(), "playlist created");
    Ok(playlist.into())
}

/// Fetch a playlist by id.
pub async fn get_playlist(state: &SharedState, id: Uuid) -> Result<PlaylistSummary, ServiceError> {
    let store = state.require_quiz_store().await?;
    store
        .find_playlist(id)
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("playlist `{id}` not found")))
}

fn into_video(input: PlaylistVideoInput) -> Result<PlaylistVideoEntity, ServiceError> {
    let video_id = resolve_video_reference(&input.video).ok_or_else(|| {
        ServiceError::InvalidInput(format!("`{}` is not a video reference", input.video))
    })?;
    Ok(PlaylistVideoEntity {
        video_id,
        title: input
            .title
            .map(|title| title.trim().to_owned())
            .filter(|title| !title.is_empty()),
        duration_secs: input.duration_secs.filter(|secs| *secs > 0),
        thumbnail_url: input.thumbnail_url,
    })
}
