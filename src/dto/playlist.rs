//! DTOs for playlist creation and retrieval.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{PlaylistEntity, PlaylistVideoEntity},
    dto::{format_system_time, validation::validate_video_reference},
};

/// Payload used to register a playlist of videos.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreatePlaylistRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 200), nested)]
    pub videos: Vec<PlaylistVideoInput>,
}

/// Video entry of a playlist. Metadata left out is resolved when questions are generated.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlaylistVideoInput {
    /// Bare YouTube id or any usual YouTube URL.
    pub video: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl Validate for PlaylistVideoInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_video_reference(&self.video) {
            errors.add("video", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Playlist as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlaylistSummary {
    pub id: Uuid,
    pub name: String,
    pub owner_id: String,
    pub videos: Vec<PlaylistVideoSummary>,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlaylistVideoSummary {
    pub video_id: String,
    pub title: Option<String>,
    pub duration_secs: Option<u32>,
    pub thumbnail_url: Option<String>,
}

impl From<PlaylistVideoEntity> for PlaylistVideoSummary {
    fn from(value: PlaylistVideoEntity) -> Self {
        Self {
            video_id: value.video_id,
            title: value.title,
            duration_secs: value.duration_secs,
            thumbnail_url: value.thumbnail_url,
        }
    }
}

impl From<PlaylistEntity> for PlaylistSummary {
    fn from(value: PlaylistEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            owner_id: value.owner_id,
            videos: value.videos.into_iter().map(Into::into).collect(),
            created_at: format_system_time(value.created_at),
        }
    }
}
