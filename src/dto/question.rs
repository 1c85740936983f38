//! Question projections. Accepted answers only leave the server once a question is over.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::QuestionEntity,
    services::question_generator::{ThumbnailQuality, thumbnail_url},
};

/// Question as shown to players: no title, no answers.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct QuestionPreview {
    pub id: Uuid,
    pub question_order: usize,
    pub video_id: String,
    pub thumbnail_url: String,
    pub audio_start_time: u32,
    pub video_start_time: u32,
}

impl From<&QuestionEntity> for QuestionPreview {
    fn from(value: &QuestionEntity) -> Self {
        Self {
            id: value.id,
            question_order: value.question_order,
            video_id: value.video_id.clone(),
            thumbnail_url: thumbnail_url(&value.video_id, ThumbnailQuality::default()),
            audio_start_time: value.audio_start_time,
            video_start_time: value.video_start_time,
        }
    }
}

/// Question together with its answers, published once it is no longer current.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct RevealedQuestion {
    pub id: Uuid,
    pub video_id: String,
    pub video_title: String,
    pub correct_answers: Vec<String>,
}

impl From<&QuestionEntity> for RevealedQuestion {
    fn from(value: &QuestionEntity) -> Self {
        Self {
            id: value.id,
            video_id: value.video_id.clone(),
            video_title: value.video_title.clone(),
            correct_answers: value.correct_answers.clone(),
        }
    }
}

/// Question currently being played along with its stage.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct CurrentQuestion {
    pub index: usize,
    pub question: QuestionPreview,
    /// 1 = audio only, 2 = video, 3 = unrestricted.
    pub stage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_started_at: Option<String>,
}

/// Outcome of a question generation run.
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateQuestionsResponse {
    /// Number of questions stored.
    pub generated: usize,
    /// Playlist videos that produced no question.
    pub skipped: usize,
    pub questions: Vec<QuestionPreview>,
}
