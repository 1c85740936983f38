use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{
    participant::ParticipantSummary,
    question::{QuestionPreview, RevealedQuestion},
    session::{LeaderboardEntry, SessionSummary},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from already serialised data.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Session the stream belongs to.
    pub session_id: Uuid,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

/// Why a session reached the finished status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Every question was played.
    Completed,
    /// The host stopped the session early.
    Terminated,
}

/// Realtime notifications published on a session stream.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuizEvent {
    /// A participant entered the lobby.
    ParticipantJoined { participant: ParticipantSummary },
    /// A participant left the lobby.
    ParticipantLeft {
        participant_id: Uuid,
        display_name: String,
    },
    /// The host (re)generated the question set.
    QuestionsGenerated {
        total_questions: usize,
        skipped_videos: usize,
    },
    /// The session moved to playing; `question` is the first one.
    SessionStarted {
        session: SessionSummary,
        question: Option<QuestionPreview>,
    },
    /// A new question became current. `previous` reveals the answers of the one before.
    QuestionAdvanced {
        question_index: usize,
        question: Option<QuestionPreview>,
        previous: Option<RevealedQuestion>,
    },
    /// A participant answered the current question.
    AnswerSubmitted {
        participant_id: Uuid,
        display_name: String,
        question_id: Uuid,
        is_correct: bool,
        points_awarded: i32,
        stage: u8,
    },
    /// A participant score changed.
    ScoreUpdated { participant_id: Uuid, score: i32 },
    /// The session is over.
    SessionFinished {
        reason: FinishReason,
        previous: Option<RevealedQuestion>,
        leaderboard: Vec<LeaderboardEntry>,
    },
}

impl QuizEvent {
    /// SSE event name, identical to the `type` tag of the payload.
    pub fn name(&self) -> &'static str {
        match self {
            QuizEvent::ParticipantJoined { .. } => "participant_joined",
            QuizEvent::ParticipantLeft { .. } => "participant_left",
            QuizEvent::QuestionsGenerated { .. } => "questions_generated",
            QuizEvent::SessionStarted { .. } => "session_started",
            QuizEvent::QuestionAdvanced { .. } => "question_advanced",
            QuizEvent::AnswerSubmitted { .. } => "answer_submitted",
            QuizEvent::ScoreUpdated { .. } => "score_updated",
            QuizEvent::SessionFinished { .. } => "session_finished",
        }
    }
}
