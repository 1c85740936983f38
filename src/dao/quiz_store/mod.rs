pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    AnswerEntity, ParticipantEntity, PlaylistEntity, QuestionEntity, SessionEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for sessions, participants, questions and answers.
///
/// Implementations own the tie-breaking of concurrent writes: unique constraints are reported
/// as [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict) and the
/// first writer wins.
pub trait QuizStore: Send + Sync {
    /// Insert a new session, rejecting duplicate room codes.
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Lookup by canonical (uppercase) room code.
    fn find_session_by_room_code(
        &self,
        room_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    fn list_sessions_by_host(
        &self,
        host_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>>;
    /// Replace the session only if the stored version still equals `expected_version`.
    ///
    /// Returns `false` when another writer got there first.
    fn update_session(
        &self,
        session: SessionEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete a session together with its participants, questions and answers.
    fn delete_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    fn save_playlist(&self, playlist: PlaylistEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_playlist(&self, id: Uuid)
    -> BoxFuture<'static, StorageResult<Option<PlaylistEntity>>>;

    /// Delete every question of the session, then insert `questions`.
    fn replace_questions(
        &self,
        session_id: Uuid,
        questions: Vec<QuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Questions of a session ordered by `question_order`.
    fn list_questions(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;

    /// Insert a participant, enforcing identity uniqueness and the capacity limit.
    fn insert_participant(
        &self,
        participant: ParticipantEntity,
        max_participants: usize,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove the participant row for `identity`, returning it when one existed.
    fn delete_participant(
        &self,
        session_id: Uuid,
        identity: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Participants of a session in join order.
    fn list_participants(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    /// Atomically add `delta` to the participant score, returning the new score.
    fn increment_score(
        &self,
        participant_id: Uuid,
        delta: i32,
    ) -> BoxFuture<'static, StorageResult<Option<i32>>>;

    /// Insert a scored answer, rejecting a second answer for the same question/participant.
    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Withdraw an answer whose points could not be credited.
    fn delete_answer(&self, answer_id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    fn list_answers(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>>;

    /// Short name of the backend, reported by the health endpoint.
    fn backend(&self) -> &'static str;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
