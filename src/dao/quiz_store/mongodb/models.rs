use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{
    AnswerEntity, ParticipantEntity, PlaylistEntity, PlaylistVideoEntity, QuestionEntity,
    QuizSettings, SessionEntity, SessionStatus, StageProgression,
};

pub const SESSIONS: &str = "sessions";
pub const PARTICIPANTS: &str = "participants";
pub const QUESTIONS: &str = "questions";
pub const ANSWERS: &str = "answers";
pub const PLAYLISTS: &str = "playlists";

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

fn parse_id(collection: &'static str, raw: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(raw).map_err(|err| MongoDaoError::Malformed {
        collection,
        reason: format!("invalid uuid `{raw}`: {err}"),
    })
}

fn to_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSettings {
    max_participants: i64,
    time_per_stage: i64,
    answer_time_limit: i64,
    stage_progression: StageProgression,
    points_for_stage1: i32,
    points_for_stage2: i32,
    points_for_stage3: i32,
    penalty_points: i32,
}

impl From<QuizSettings> for MongoSettings {
    fn from(value: QuizSettings) -> Self {
        Self {
            max_participants: value.max_participants as i64,
            time_per_stage: value.time_per_stage.into(),
            answer_time_limit: value.answer_time_limit.into(),
            stage_progression: value.stage_progression,
            points_for_stage1: value.points_for_stage1,
            points_for_stage2: value.points_for_stage2,
            points_for_stage3: value.points_for_stage3,
            penalty_points: value.penalty_points,
        }
    }
}

impl From<MongoSettings> for QuizSettings {
    fn from(value: MongoSettings) -> Self {
        Self {
            max_participants: to_count(value.max_participants),
            time_per_stage: u32::try_from(value.time_per_stage).unwrap_or_default(),
            answer_time_limit: u32::try_from(value.answer_time_limit).unwrap_or_default(),
            stage_progression: value.stage_progression,
            points_for_stage1: value.points_for_stage1,
            points_for_stage2: value.points_for_stage2,
            points_for_stage3: value.points_for_stage3,
            penalty_points: value.penalty_points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    id: String,
    room_code: String,
    host_id: String,
    playlist_id: String,
    status: SessionStatus,
    current_question_index: i64,
    settings: MongoSettings,
    version: i64,
    created_at: DateTime,
    updated_at: DateTime,
    started_at: Option<DateTime>,
    finished_at: Option<DateTime>,
    stage_started_at: Option<DateTime>,
}

impl From<SessionEntity> for MongoSessionDocument {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            room_code: value.room_code,
            host_id: value.host_id,
            playlist_id: value.playlist_id.to_string(),
            status: value.status,
            current_question_index: value.current_question_index as i64,
            settings: value.settings.into(),
            version: value.version as i64,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
            started_at: value.started_at.map(DateTime::from_system_time),
            finished_at: value.finished_at.map(DateTime::from_system_time),
            stage_started_at: value.stage_started_at.map(DateTime::from_system_time),
        }
    }
}

impl TryFrom<MongoSessionDocument> for SessionEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSessionDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(SESSIONS, &value.id)?,
            room_code: value.room_code,
            host_id: value.host_id,
            playlist_id: parse_id(SESSIONS, &value.playlist_id)?,
            status: value.status,
            current_question_index: to_count(value.current_question_index),
            settings: value.settings.into(),
            version: u64::try_from(value.version).unwrap_or_default(),
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
            started_at: value.started_at.map(|at| at.to_system_time()),
            finished_at: value.finished_at.map(|at| at.to_system_time()),
            stage_started_at: value.stage_started_at.map(|at| at.to_system_time()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    #[serde(rename = "_id")]
    id: String,
    session_id: String,
    identity: String,
    display_name: String,
    score: i32,
    connected: bool,
    joined_at: DateTime,
}

impl From<ParticipantEntity> for MongoParticipantDocument {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id.to_string(),
            session_id: value.session_id.to_string(),
            identity: value.identity,
            display_name: value.display_name,
            score: value.score,
            connected: value.connected,
            joined_at: DateTime::from_system_time(value.joined_at),
        }
    }
}

impl TryFrom<MongoParticipantDocument> for ParticipantEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoParticipantDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(PARTICIPANTS, &value.id)?,
            session_id: parse_id(PARTICIPANTS, &value.session_id)?,
            identity: value.identity,
            display_name: value.display_name,
            score: value.score,
            connected: value.connected,
            joined_at: value.joined_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuestionDocument {
    #[serde(rename = "_id")]
    id: String,
    session_id: String,
    video_id: String,
    video_title: String,
    question_order: i64,
    correct_answers: Vec<String>,
    audio_start_time: i64,
    video_start_time: i64,
    created_at: DateTime,
}

impl From<QuestionEntity> for MongoQuestionDocument {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            session_id: value.session_id.to_string(),
            video_id: value.video_id,
            video_title: value.video_title,
            question_order: value.question_order as i64,
            correct_answers: value.correct_answers,
            audio_start_time: value.audio_start_time.into(),
            video_start_time: value.video_start_time.into(),
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoQuestionDocument> for QuestionEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoQuestionDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(QUESTIONS, &value.id)?,
            session_id: parse_id(QUESTIONS, &value.session_id)?,
            video_id: value.video_id,
            video_title: value.video_title,
            question_order: to_count(value.question_order),
            correct_answers: value.correct_answers,
            audio_start_time: u32::try_from(value.audio_start_time).unwrap_or_default(),
            video_start_time: u32::try_from(value.video_start_time).unwrap_or_default(),
            created_at: value.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoAnswerDocument {
    #[serde(rename = "_id")]
    id: String,
    session_id: String,
    question_id: String,
    participant_id: String,
    answer: String,
    is_correct: bool,
    points_awarded: i32,
    stage: i32,
    answered_at: DateTime,
}

impl From<AnswerEntity> for MongoAnswerDocument {
    fn from(value: AnswerEntity) -> Self {
        Self {
            id: value.id.to_string(),
            session_id: value.session_id.to_string(),
            question_id: value.question_id.to_string(),
            participant_id: value.participant_id.to_string(),
            answer: value.answer,
            is_correct: value.is_correct,
            points_awarded: value.points_awarded,
            stage: value.stage.into(),
            answered_at: DateTime::from_system_time(value.answered_at),
        }
    }
}

impl TryFrom<MongoAnswerDocument> for AnswerEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoAnswerDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(ANSWERS, &value.id)?,
            session_id: parse_id(ANSWERS, &value.session_id)?,
            question_id: parse_id(ANSWERS, &value.question_id)?,
            participant_id: parse_id(ANSWERS, &value.participant_id)?,
            answer: value.answer,
            is_correct: value.is_correct,
            points_awarded: value.points_awarded,
            stage: u8::try_from(value.stage).unwrap_or(3),
            answered_at: value.answered_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlaylistVideo {
    video_id: String,
    title: Option<String>,
    duration_secs: Option<i64>,
    thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlaylistDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    owner_id: String,
    videos: Vec<MongoPlaylistVideo>,
    created_at: DateTime,
}

impl From<PlaylistEntity> for MongoPlaylistDocument {
    fn from(value: PlaylistEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            owner_id: value.owner_id,
            videos: value
                .videos
                .into_iter()
                .map(|video| MongoPlaylistVideo {
                    video_id: video.video_id,
                    title: video.title,
                    duration_secs: video.duration_secs.map(i64::from),
                    thumbnail_url: video.thumbnail_url,
                })
                .collect(),
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoPlaylistDocument> for PlaylistEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoPlaylistDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(PLAYLISTS, &value.id)?,
            name: value.name,
            owner_id: value.owner_id,
            videos: value
                .videos
                .into_iter()
                .map(|video| PlaylistVideoEntity {
                    video_id: video.video_id,
                    title: video.title,
                    duration_secs: video.duration_secs.and_then(|d| u32::try_from(d).ok()),
                    thumbnail_url: video.thumbnail_url,
                })
                .collect(),
            created_at: value.created_at.to_system_time(),
        })
    }
}
