//! DTOs for session creation, lookup and lifecycle operations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{QuizSettings, SessionEntity, SessionStatus},
    dto::{
        format_system_time,
        participant::ParticipantSummary,
        question::{CurrentQuestion, QuestionPreview},
    },
    state::settings::PartialQuizSettings,
};

/// Payload used by a host to open a new session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateSessionRequest {
    /// Playlist the questions will be generated from.
    pub playlist_id: Uuid,
    /// Settings overrides; anything omitted takes its default.
    #[serde(default)]
    #[validate(nested)]
    pub settings: PartialQuizSettings,
}

/// Summary of a session returned by every lifecycle operation.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    pub id: Uuid,
    pub room_code: String,
    pub host_id: String,
    pub playlist_id: Uuid,
    pub status: SessionStatus,
    pub current_question_index: usize,
    pub settings: QuizSettings,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

impl From<SessionEntity> for SessionSummary {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id,
            room_code: value.room_code,
            host_id: value.host_id,
            playlist_id: value.playlist_id,
            status: value.status,
            current_question_index: value.current_question_index,
            settings: value.settings,
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
            started_at: value.started_at.map(format_system_time),
            finished_at: value.finished_at.map(format_system_time),
        }
    }
}

/// Full view of a session: participants, question previews and standings.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionDetails {
    pub session: SessionSummary,
    pub participants: Vec<ParticipantSummary>,
    pub questions: Vec<QuestionPreview>,
    pub current_question: Option<CurrentQuestion>,
    pub stats: SessionStats,
}

/// Aggregated numbers about a session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionStats {
    pub total_participants: usize,
    pub total_questions: usize,
    /// Index of the question being played, if any.
    pub current_question: Option<usize>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Ranked participant, highest score first.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    pub participant_id: Uuid,
    pub display_name: String,
    pub score: i32,
    /// 1-based; tied scores share a rank.
    pub rank: usize,
}
