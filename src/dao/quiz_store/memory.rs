//! In-process [`QuizStore`] used when no database is configured and by the test-suite.
//!
//! All tables live behind a single lock so that check-then-insert sequences (capacity,
//! uniqueness) are atomic, mirroring what unique indexes give the database backends.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    models::{AnswerEntity, ParticipantEntity, PlaylistEntity, QuestionEntity, SessionEntity},
    quiz_store::QuizStore,
    storage::{StorageError, StorageResult, UniqueConstraint},
};

#[derive(Clone, Default)]
pub struct MemoryQuizStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    sessions: HashMap<Uuid, SessionEntity>,
    playlists: HashMap<Uuid, PlaylistEntity>,
    questions: HashMap<Uuid, Vec<QuestionEntity>>,
    participants: IndexMap<Uuid, ParticipantEntity>,
    answers: Vec<AnswerEntity>,
}

impl MemoryQuizStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuizStore for MemoryQuizStore {
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut tables = tables.write().await;
            if tables
                .sessions
                .values()
                .any(|existing| existing.room_code == session.room_code)
            {
                return Err(StorageError::Conflict(UniqueConstraint::RoomCode));
            }
            tables.sessions.insert(session.id, session);
            Ok(())
        })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move { Ok(tables.read().await.sessions.get(&id).cloned()) })
    }

    fn find_session_by_room_code(
        &self,
        room_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            Ok(tables
                .read()
                .await
                .sessions
                .values()
                .find(|session| session.room_code == room_code)
                .cloned())
        })
    }

    fn list_sessions_by_host(
        &self,
        host_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut sessions: Vec<SessionEntity> = tables
                .read()
                .await
                .sessions
                .values()
                .filter(|session| session.host_id == host_id)
                .cloned()
                .collect();
            sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(sessions)
        })
    }

    fn update_session(
        &self,
        session: SessionEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut tables = tables.write().await;
            match tables.sessions.get_mut(&session.id) {
                Some(stored) if stored.version == expected_version => {
                    *stored = session;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn delete_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut tables = tables.write().await;
            if tables.sessions.remove(&id).is_none() {
                return Ok(false);
            }
            tables.questions.remove(&id);
            tables
                .participants
                .retain(|_, participant| participant.session_id != id);
            tables.answers.retain(|answer| answer.session_id != id);
            Ok(true)
        })
    }

    fn save_playlist(&self, playlist: PlaylistEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.write().await.playlists.insert(playlist.id, playlist);
            Ok(())
        })
    }

    fn find_playlist(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlaylistEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move { Ok(tables.read().await.playlists.get(&id).cloned()) })
    }

    fn replace_questions(
        &self,
        session_id: Uuid,
        mut questions: Vec<QuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            questions.sort_by_key(|question| question.question_order);
            tables.write().await.questions.insert(session_id, questions);
            Ok(())
        })
    }

    fn list_questions(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            Ok(tables
                .read()
                .await
                .questions
                .get(&session_id)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
        max_participants: usize,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut tables = tables.write().await;
            let mut count = 0;
            for existing in tables.participants.values() {
                if existing.session_id != participant.session_id {
                    continue;
                }
                if existing.identity == participant.identity {
                    return Err(StorageError::Conflict(UniqueConstraint::SessionIdentity));
                }
                count += 1;
            }
            if count >= max_participants {
                return Err(StorageError::CapacityExceeded {
                    max: max_participants,
                });
            }
            tables.participants.insert(participant.id, participant);
            Ok(())
        })
    }

    fn delete_participant(
        &self,
        session_id: Uuid,
        identity: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut tables = tables.write().await;
            let id = tables
                .participants
                .values()
                .find(|p| p.session_id == session_id && p.identity == identity)
                .map(|p| p.id);
            Ok(id.and_then(|id| tables.participants.shift_remove(&id)))
        })
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move { Ok(tables.read().await.participants.get(&id).cloned()) })
    }

    fn list_participants(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            Ok(tables
                .read()
                .await
                .participants
                .values()
                .filter(|p| p.session_id == session_id)
                .cloned()
                .collect())
        })
    }

    fn increment_score(
        &self,
        participant_id: Uuid,
        delta: i32,
    ) -> BoxFuture<'static, StorageResult<Option<i32>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut tables = tables.write().await;
            let Some(participant) = tables.participants.get_mut(&participant_id) else {
                return Ok(None);
            };
            participant.score = participant
                .score
                .checked_add(delta)
                .ok_or(StorageError::ScoreOutOfRange { participant_id })?;
            Ok(Some(participant.score))
        })
    }

    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut tables = tables.write().await;
            if tables.answers.iter().any(|existing| {
                existing.question_id == answer.question_id
                    && existing.participant_id == answer.participant_id
            }) {
                return Err(StorageError::Conflict(UniqueConstraint::QuestionParticipant));
            }
            tables.answers.push(answer);
            Ok(())
        })
    }

    fn delete_answer(&self, answer_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut tables = tables.write().await;
            let before = tables.answers.len();
            tables.answers.retain(|answer| answer.id != answer_id);
            Ok(tables.answers.len() != before)
        })
    }

    fn list_answers(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            Ok(tables
                .read()
                .await
                .answers
                .iter()
                .filter(|answer| answer.question_id == question_id)
                .cloned()
                .collect())
        })
    }

    fn backend(&self) -> &'static str {
        "memory"
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn participant(session_id: Uuid, identity: &str) -> ParticipantEntity {
        ParticipantEntity {
            id: Uuid::new_v4(),
            session_id,
            identity: identity.into(),
            display_name: identity.into(),
            score: 0,
            connected: true,
            joined_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn participant_insert_enforces_identity_and_capacity() {
        let store = MemoryQuizStore::new();
        let session_id = Uuid::new_v4();

        store
            .insert_participant(participant(session_id, "alice"), 2)
            .await
            .unwrap();
        let err = store
            .insert_participant(participant(session_id, "alice"), 2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Conflict(UniqueConstraint::SessionIdentity)
        ));

        store
            .insert_participant(participant(session_id, "bob"), 2)
            .await
            .unwrap();
        let err = store
            .insert_participant(participant(session_id, "carol"), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::CapacityExceeded { max: 2 }));

        // Capacity is per session.
        store
            .insert_participant(participant(Uuid::new_v4(), "carol"), 2)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn score_increment_can_go_negative() {
        let store = MemoryQuizStore::new();
        let p = participant(Uuid::new_v4(), "alice");
        let id = p.id;
        store.insert_participant(p, 4).await.unwrap();

        assert_eq!(store.increment_score(id, -1).await.unwrap(), Some(-1));
        assert_eq!(store.increment_score(id, 3).await.unwrap(), Some(2));
        assert_eq!(
            store.increment_score(Uuid::new_v4(), 3).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn score_overflow_is_rejected_and_leaves_the_score_unchanged() {
        let store = MemoryQuizStore::new();
        let p = participant(Uuid::new_v4(), "alice");
        let id = p.id;
        store.insert_participant(p, 4).await.unwrap();

        assert_eq!(
            store.increment_score(id, i32::MAX).await.unwrap(),
            Some(i32::MAX)
        );
        let err = store.increment_score(id, 1).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::ScoreOutOfRange { participant_id } if participant_id == id
        ));
        let stored = store.find_participant(id).await.unwrap().unwrap();
        assert_eq!(stored.score, i32::MAX);
    }

    #[tokio::test]
    async fn delete_missing_participant_is_not_an_error() {
        let store = MemoryQuizStore::new();
        let removed = store
            .delete_participant(Uuid::new_v4(), "ghost".into())
            .await
            .unwrap();
        assert!(removed.is_none());
    }
}
