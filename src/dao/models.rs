use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a quiz session. Transitions only move forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    Playing,
    Finished,
}

/// Whether questions advance on a timer or only when the host asks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StageProgression {
    Auto,
    Manual,
}

/// Fully populated settings of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct QuizSettings {
    /// Maximum number of participants allowed to join.
    pub max_participants: usize,
    /// Duration (seconds) of each presentation stage.
    pub time_per_stage: u32,
    /// Time (seconds) a participant gets to type an answer.
    pub answer_time_limit: u32,
    /// Progression mode for questions.
    pub stage_progression: StageProgression,
    /// Points for a correct answer while only the audio is playing.
    pub points_for_stage1: i32,
    /// Points for a correct answer once the video is revealed.
    pub points_for_stage2: i32,
    /// Points for a correct answer in the unrestricted stage.
    pub points_for_stage3: i32,
    /// Points applied to a wrong answer (usually negative).
    pub penalty_points: i32,
}

/// Quiz session persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Canonical (uppercase) room code participants type to join.
    pub room_code: String,
    /// Identity of the host owning the session.
    pub host_id: String,
    /// Playlist the questions are generated from.
    pub playlist_id: Uuid,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Index of the current question, meaningful while playing.
    pub current_question_index: usize,
    /// Settings the session was created with.
    pub settings: QuizSettings,
    /// Optimistic concurrency token, bumped on every persisted transition.
    pub version: u64,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last update timestamp.
    pub updated_at: SystemTime,
    /// When the session moved to playing.
    pub started_at: Option<SystemTime>,
    /// When the session moved to finished.
    pub finished_at: Option<SystemTime>,
    /// When the current question started playing (server clock).
    pub stage_started_at: Option<SystemTime>,
}

/// Player that joined a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Primary key of the participant.
    pub id: Uuid,
    /// Session the participant joined.
    pub session_id: Uuid,
    /// Identity that joined; unique per session.
    pub identity: String,
    /// Name shown to other players.
    pub display_name: String,
    /// Running score, may be negative.
    pub score: i32,
    /// Whether the participant is still considered connected.
    pub connected: bool,
    /// Join timestamp.
    pub joined_at: SystemTime,
}

/// Question generated from a playlist video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Primary key of the question.
    pub id: Uuid,
    /// Owning session.
    pub session_id: Uuid,
    /// External video reference.
    pub video_id: String,
    /// Title of the source video.
    pub video_title: String,
    /// Play sequence position, unique within the session.
    pub question_order: usize,
    /// Accepted answers, longest first. Never empty.
    pub correct_answers: Vec<String>,
    /// Playback offset (seconds) for the audio-only stage.
    pub audio_start_time: u32,
    /// Playback offset (seconds) for the video stage.
    pub video_start_time: u32,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Scored answer submitted by a participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntity {
    /// Primary key of the submission.
    pub id: Uuid,
    /// Session the answer belongs to.
    pub session_id: Uuid,
    /// Answered question.
    pub question_id: Uuid,
    /// Participant who answered.
    pub participant_id: Uuid,
    /// Raw text as typed.
    pub answer: String,
    /// Resolved correctness.
    pub is_correct: bool,
    /// Points added to the participant score.
    pub points_awarded: i32,
    /// Stage (1..=3) the answer was submitted in.
    pub stage: u8,
    /// Submission timestamp.
    pub answered_at: SystemTime,
}

/// Playlist of videos a session draws its questions from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistEntity {
    /// Stable identifier for the playlist.
    pub id: Uuid,
    /// Human readable playlist name.
    pub name: String,
    /// Identity that created the playlist.
    pub owner_id: String,
    /// Ordered videos of the playlist.
    pub videos: Vec<PlaylistVideoEntity>,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Video entry inside a playlist. Missing metadata is resolved at generation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistVideoEntity {
    /// External video identifier.
    pub video_id: String,
    /// Cached title, if known.
    pub title: Option<String>,
    /// Cached duration in seconds, if known.
    pub duration_secs: Option<u32>,
    /// Cached thumbnail URL, if known.
    pub thumbnail_url: Option<String>,
}
