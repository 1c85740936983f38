use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{Document, doc},
    options::ReturnDocument,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::open_quiz_database,
    error::{MongoDaoError, MongoResult},
    models::{
        ANSWERS, MongoAnswerDocument, MongoParticipantDocument, MongoPlaylistDocument,
        MongoQuestionDocument, MongoSessionDocument, PARTICIPANTS, PLAYLISTS, QUESTIONS,
        SESSIONS, doc_id,
    },
};
use crate::dao::{
    models::{AnswerEntity, ParticipantEntity, PlaylistEntity, QuestionEntity, SessionEntity},
    quiz_store::QuizStore,
    storage::{StorageResult, UniqueConstraint},
};

/// MongoDB-backed [`QuizStore`].
///
/// Room codes, `(session_id, identity)` and `(question_id, participant_id)` are protected by
/// unique indexes. The participant capacity check is a count followed by an insert, so two
/// simultaneous joins on the last free seat may both succeed.
#[derive(Clone)]
pub struct MongoQuizStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = open_quiz_database(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

async fn collect<D, E>(
    collection: &Collection<D>,
    filter: Document,
    sort: Option<Document>,
    name: &'static str,
) -> MongoResult<Vec<E>>
where
    D: DeserializeOwned + Send + Sync,
    E: TryFrom<D, Error = MongoDaoError>,
{
    let find = collection.find(filter);
    let find = match sort {
        Some(sort) => find.sort(sort),
        None => find,
    };
    let documents: Vec<D> = find
        .await
        .map_err(MongoDaoError::operation("find", name))?
        .try_collect()
        .await
        .map_err(MongoDaoError::operation("find", name))?;
    documents.into_iter().map(E::try_from).collect()
}

impl MongoQuizStore {
    /// Open the quiz database and wrap it in a store.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = open_quiz_database(&config).await?;
        Ok(Self {
            inner: Arc::new(MongoInner {
                state: RwLock::new(MongoState { client, database }),
                config,
            }),
        })
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection<D: Serialize + DeserializeOwned + Send + Sync>(
        &self,
        name: &str,
    ) -> Collection<D> {
        self.database().await.collection::<D>(name)
    }

    async fn insert_session(&self, session: SessionEntity) -> MongoResult<()> {
        let collection = self.collection::<MongoSessionDocument>(SESSIONS).await;
        collection
            .insert_one(MongoSessionDocument::from(session))
            .await
            .map_err(MongoDaoError::write(
                "insert_one",
                SESSIONS,
                UniqueConstraint::RoomCode,
            ))?;
        Ok(())
    }

    async fn find_session_by(&self, filter: Document) -> MongoResult<Option<SessionEntity>> {
        let collection = self.collection::<MongoSessionDocument>(SESSIONS).await;
        collection
            .find_one(filter)
            .await
            .map_err(MongoDaoError::operation("find_one", SESSIONS))?
            .map(SessionEntity::try_from)
            .transpose()
    }

    async fn list_sessions_by_host(&self, host_id: String) -> MongoResult<Vec<SessionEntity>> {
        let collection = self.collection::<MongoSessionDocument>(SESSIONS).await;
        collect(
            &collection,
            doc! {"host_id": host_id},
            Some(doc! {"created_at": -1}),
            SESSIONS,
        )
        .await
    }

    async fn update_session(
        &self,
        session: SessionEntity,
        expected_version: u64,
    ) -> MongoResult<bool> {
        let collection = self.collection::<MongoSessionDocument>(SESSIONS).await;
        let filter = doc! {"_id": session.id.to_string(), "version": expected_version as i64};
        let result = collection
            .replace_one(filter, MongoSessionDocument::from(session))
            .await
            .map_err(MongoDaoError::operation("replace_one", SESSIONS))?;
        Ok(result.matched_count > 0)
    }

    async fn delete_session(&self, id: Uuid) -> MongoResult<bool> {
        let database = self.database().await;
        let session_filter = doc! {"session_id": id.to_string()};
        for name in [ANSWERS, QUESTIONS, PARTICIPANTS] {
            database
                .collection::<Document>(name)
                .delete_many(session_filter.clone())
                .await
                .map_err(MongoDaoError::operation("delete_many", name))?;
        }
        let result = database
            .collection::<Document>(SESSIONS)
            .delete_one(doc_id(id))
            .await
            .map_err(MongoDaoError::operation("delete_one", SESSIONS))?;
        Ok(result.deleted_count > 0)
    }

    async fn save_playlist(&self, playlist: PlaylistEntity) -> MongoResult<()> {
        let collection = self.collection::<MongoPlaylistDocument>(PLAYLISTS).await;
        let id = playlist.id;
        collection
            .replace_one(doc_id(id), MongoPlaylistDocument::from(playlist))
            .upsert(true)
            .await
            .map_err(MongoDaoError::operation("replace_one", PLAYLISTS))?;
        Ok(())
    }

    async fn find_playlist(&self, id: Uuid) -> MongoResult<Option<PlaylistEntity>> {
        let collection = self.collection::<MongoPlaylistDocument>(PLAYLISTS).await;
        collection
            .find_one(doc_id(id))
            .await
            .map_err(MongoDaoError::operation("find_one", PLAYLISTS))?
            .map(PlaylistEntity::try_from)
            .transpose()
    }

    async fn replace_questions(
        &self,
        session_id: Uuid,
        questions: Vec<QuestionEntity>,
    ) -> MongoResult<()> {
        let collection = self.collection::<MongoQuestionDocument>(QUESTIONS).await;
        collection
            .delete_many(doc! {"session_id": session_id.to_string()})
            .await
            .map_err(MongoDaoError::operation("delete_many", QUESTIONS))?;
        if questions.is_empty() {
            return Ok(());
        }
        let documents: Vec<MongoQuestionDocument> =
            questions.into_iter().map(Into::into).collect();
        collection
            .insert_many(documents)
            .await
            .map_err(MongoDaoError::operation("insert_many", QUESTIONS))?;
        Ok(())
    }

    async fn list_questions(&self, session_id: Uuid) -> MongoResult<Vec<QuestionEntity>> {
        let collection = self.collection::<MongoQuestionDocument>(QUESTIONS).await;
        collect(
            &collection,
            doc! {"session_id": session_id.to_string()},
            Some(doc! {"question_order": 1}),
            QUESTIONS,
        )
        .await
    }

    async fn insert_participant(
        &self,
        participant: ParticipantEntity,
        max_participants: usize,
    ) -> MongoResult<()> {
        let collection = self
            .collection::<MongoParticipantDocument>(PARTICIPANTS)
            .await;
        let count = collection
            .count_documents(doc! {"session_id": participant.session_id.to_string()})
            .await
            .map_err(MongoDaoError::operation("count_documents", PARTICIPANTS))?;
        if count >= max_participants as u64 {
            return Err(MongoDaoError::Capacity {
                max: max_participants,
            });
        }
        collection
            .insert_one(MongoParticipantDocument::from(participant))
            .await
            .map_err(MongoDaoError::write(
                "insert_one",
                PARTICIPANTS,
                UniqueConstraint::SessionIdentity,
            ))?;
        Ok(())
    }

    async fn delete_participant(
        &self,
        session_id: Uuid,
        identity: String,
    ) -> MongoResult<Option<ParticipantEntity>> {
        let collection = self
            .collection::<MongoParticipantDocument>(PARTICIPANTS)
            .await;
        collection
            .find_one_and_delete(doc! {"session_id": session_id.to_string(), "identity": identity})
            .await
            .map_err(MongoDaoError::operation("find_one_and_delete", PARTICIPANTS))?
            .map(ParticipantEntity::try_from)
            .transpose()
    }

    async fn find_participant(&self, id: Uuid) -> MongoResult<Option<ParticipantEntity>> {
        let collection = self
            .collection::<MongoParticipantDocument>(PARTICIPANTS)
            .await;
        collection
            .find_one(doc_id(id))
            .await
            .map_err(MongoDaoError::operation("find_one", PARTICIPANTS))?
            .map(ParticipantEntity::try_from)
            .transpose()
    }

    async fn list_participants(&self, session_id: Uuid) -> MongoResult<Vec<ParticipantEntity>> {
        let collection = self
            .collection::<MongoParticipantDocument>(PARTICIPANTS)
            .await;
        collect(
            &collection,
            doc! {"session_id": session_id.to_string()},
            Some(doc! {"joined_at": 1}),
            PARTICIPANTS,
        )
        .await
    }

    async fn increment_score(&self, participant_id: Uuid, delta: i32) -> MongoResult<Option<i32>> {
        let collection = self
            .collection::<MongoParticipantDocument>(PARTICIPANTS)
            .await;
        let updated = collection
            .find_one_and_update(doc_id(participant_id), doc! {"$inc": {"score": delta}})
            .return_document(ReturnDocument::After)
            .await
            .map_err(MongoDaoError::operation("find_one_and_update", PARTICIPANTS))?;
        updated
            .map(|document| ParticipantEntity::try_from(document).map(|p| p.score))
            .transpose()
    }

    async fn insert_answer(&self, answer: AnswerEntity) -> MongoResult<()> {
        let collection = self.collection::<MongoAnswerDocument>(ANSWERS).await;
        collection
            .insert_one(MongoAnswerDocument::from(answer))
            .await
            .map_err(MongoDaoError::write(
                "insert_one",
                ANSWERS,
                UniqueConstraint::QuestionParticipant,
            ))?;
        Ok(())
    }

    async fn delete_answer(&self, answer_id: Uuid) -> MongoResult<bool> {
        let collection = self.collection::<MongoAnswerDocument>(ANSWERS).await;
        let result = collection
            .delete_one(doc_id(answer_id))
            .await
            .map_err(MongoDaoError::operation("delete_one", ANSWERS))?;
        Ok(result.deleted_count > 0)
    }

    async fn list_answers(&self, question_id: Uuid) -> MongoResult<Vec<AnswerEntity>> {
        let collection = self.collection::<MongoAnswerDocument>(ANSWERS).await;
        collect(
            &collection,
            doc! {"question_id": question_id.to_string()},
            Some(doc! {"answered_at": 1}),
            ANSWERS,
        )
        .await
    }
}

impl QuizStore for MongoQuizStore {
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_session(session).await.map_err(Into::into) })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_session_by(doc_id(id)).await.map_err(Into::into) })
    }

    fn find_session_by_room_code(
        &self,
        room_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_session_by(doc! {"room_code": room_code})
                .await
                .map_err(Into::into)
        })
    }

    fn list_sessions_by_host(
        &self,
        host_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_sessions_by_host(host_id).await.map_err(Into::into) })
    }

    fn update_session(
        &self,
        session: SessionEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_session(session, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_session(id).await.map_err(Into::into) })
    }

    fn save_playlist(&self, playlist: PlaylistEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_playlist(playlist).await.map_err(Into::into) })
    }

    fn find_playlist(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlaylistEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_playlist(id).await.map_err(Into::into) })
    }

    fn replace_questions(
        &self,
        session_id: Uuid,
        questions: Vec<QuestionEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_questions(session_id, questions)
                .await
                .map_err(Into::into)
        })
    }

    fn list_questions(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_questions(session_id).await.map_err(Into::into) })
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
        max_participants: usize,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_participant(participant, max_participants)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_participant(
        &self,
        session_id: Uuid,
        identity: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_participant(session_id, identity)
                .await
                .map_err(Into::into)
        })
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_participant(id).await.map_err(Into::into) })
    }

    fn list_participants(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_participants(session_id).await.map_err(Into::into) })
    }

    fn increment_score(
        &self,
        participant_id: Uuid,
        delta: i32,
    ) -> BoxFuture<'static, StorageResult<Option<i32>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .increment_score(participant_id, delta)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_answer(answer).await.map_err(Into::into) })
    }

    fn delete_answer(&self, answer_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_answer(answer_id).await.map_err(Into::into) })
    }

    fn list_answers(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_answers(question_id).await.map_err(Into::into) })
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
