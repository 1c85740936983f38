//! Scoring of submitted answers.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{
        models::{AnswerEntity, QuizSettings, SessionEntity, SessionStatus},
        quiz_store::QuizStore,
    },
    dto::{
        answer::{SubmitAnswerRequest, SubmitAnswerResponse},
        sse::QuizEvent,
    },
    error::ServiceError,
    services::{answer_matcher, identity::Identity, session_service::load_session, sse_events},
    state::SharedState,
};

/// Presentation stage of the current question, which decides the points of a correct answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Only the audio is playing.
    AudioOnly,
    /// The video is shown.
    Video,
    /// Anything goes.
    Unrestricted,
}

impl Stage {
    /// Stage reached `elapsed` after the question started.
    pub fn from_elapsed(elapsed: Duration, time_per_stage: u32) -> Self {
        let stage_len = Duration::from_secs(u64::from(time_per_stage));
        if elapsed < stage_len {
            Stage::AudioOnly
        } else if elapsed < stage_len * 2 {
            Stage::Video
        } else {
            Stage::Unrestricted
        }
    }

    /// Stage of the current question of `session` at `now`, measured on the server clock.
    pub fn of_session(session: &SessionEntity, now: SystemTime) -> Self {
        let elapsed = session
            .stage_started_at
            .and_then(|started| now.duration_since(started).ok())
            .unwrap_or_default();
        Self::from_elapsed(elapsed, session.settings.time_per_stage)
    }

    /// 1-based stage number.
    pub fn number(self) -> u8 {
        match self {
            Stage::AudioOnly => 1,
            Stage::Video => 2,
            Stage::Unrestricted => 3,
        }
    }

    /// Points awarded for a correct answer in this stage.
    pub fn points(self, settings: &QuizSettings) -> i32 {
        match self {
            Stage::AudioOnly => settings.points_for_stage1,
            Stage::Video => settings.points_for_stage2,
            Stage::Unrestricted => settings.points_for_stage3,
        }
    }
}

/// Score the answer of a participant to the current question of a session.
pub async fn submit_answer(
    state: &SharedState,
    session_id: Uuid,
    caller: &Identity,
    request: SubmitAnswerRequest,
) -> Result<SubmitAnswerResponse, ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let store = state.require_quiz_store().await?;
    let now = SystemTime::now();

    let session = load_session(&store, session_id).await?;
    if session.status != SessionStatus::Playing {
        return Err(ServiceError::InvalidState("session is not playing".into()));
    }

    let questions = store.list_questions(session_id).await?;
    let question = questions
        .get(session.current_question_index)
        .filter(|question| question.id == request.question_id)
        .ok_or(ServiceError::QuestionMismatch)?;

    let participant = store
        .find_participant(request.participant_id)
        .await?
        .filter(|participant| participant.session_id == session_id)
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "participant `{}` not found in session",
                request.participant_id
            ))
        })?;
    if participant.identity != caller.as_str() {
        return Err(ServiceError::PermissionDenied(
            "answers can only be submitted for yourself".into(),
        ));
    }

    let already_answered = store
        .list_answers(question.id)
        .await?
        .iter()
        .any(|answer| answer.participant_id == participant.id);
    if already_answered {
        return Err(ServiceError::DuplicateSubmission);
    }

    let stage = Stage::of_session(&session, now);
    if let Some(elapsed_ms) = request.elapsed_ms {
        let claimed = Stage::from_elapsed(
            Duration::from_millis(elapsed_ms),
            session.settings.time_per_stage,
        );
        if claimed != stage {
            debug!(
                %session_id,
                participant_id = %participant.id,
                claimed = claimed.number(),
                measured = stage.number(),
                "client elapsed time disagrees with server clock"
            );
        }
    }

    let is_correct = answer_matcher::is_match(&request.answer, &question.correct_answers);
    let confidence = answer_matcher::confidence(&request.answer, &question.correct_answers);
    let points_awarded = if is_correct {
        stage.points(&session.settings)
    } else {
        session.settings.penalty_points
    };

    let new_score = record_answer(
        &store,
        AnswerEntity {
            id: Uuid::new_v4(),
            session_id,
            question_id: question.id,
            participant_id: participant.id,
            answer: request.answer,
            is_correct,
            points_awarded,
            stage: stage.number(),
            answered_at: now,
        },
    )
    .await?;

    info!(
        %session_id,
        participant_id = %participant.id,
        is_correct,
        points_awarded,
        stage = stage.number(),
        "answer scored"
    );

    sse_events::publish(
        state,
        session_id,
        &QuizEvent::AnswerSubmitted {
            participant_id: participant.id,
            display_name: participant.display_name.clone(),
            question_id: question.id,
            is_correct,
            points_awarded,
            stage: stage.number(),
        },
    );
    sse_events::publish(
        state,
        session_id,
        &QuizEvent::ScoreUpdated {
            participant_id: participant.id,
            score: new_score,
        },
    );

    Ok(SubmitAnswerResponse {
        is_correct,
        points_awarded,
        stage: stage.number(),
        new_score,
        confidence,
    })
}

/// Store `answer` and credit its points, returning the new score.
///
/// The unique (question, participant) constraint settles concurrent duplicates. When the score
/// cannot be credited (participant gone, score out of range) the answer is withdrawn again.
async fn record_answer(
    store: &Arc<dyn QuizStore>,
    answer: AnswerEntity,
) -> Result<i32, ServiceError> {
    let (answer_id, participant_id, delta) =
        (answer.id, answer.participant_id, answer.points_awarded);
    store.insert_answer(answer).await?;

    let failure = match store.increment_score(participant_id, delta).await {
        Ok(Some(score)) => return Ok(score),
        Ok(None) => ServiceError::NotFound("participant left the session".into()),
        Err(err) => err.into(),
    };
    if let Err(err) = store.delete_answer(answer_id).await {
        warn!(%answer_id, error = %err, "failed to withdraw unscored answer");
    }
    Err(failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::StageProgression,
        services::{
            session_service::{self, AdvanceTrigger},
            test_support::{self, HOST, identity},
        },
        state::settings::PartialQuizSettings,
    };

    #[test]
    fn stage_boundaries_follow_time_per_stage() {
        let at = |secs| Stage::from_elapsed(Duration::from_secs(secs), 15);
        assert_eq!(at(0), Stage::AudioOnly);
        assert_eq!(at(14), Stage::AudioOnly);
        assert_eq!(at(15), Stage::Video);
        assert_eq!(at(29), Stage::Video);
        assert_eq!(at(30), Stage::Unrestricted);
        assert_eq!(at(600), Stage::Unrestricted);
    }

    #[test]
    fn stage_points_come_from_settings() {
        let settings = QuizSettings::default();
        assert_eq!(Stage::AudioOnly.points(&settings), 3);
        assert_eq!(Stage::Video.points(&settings), 2);
        assert_eq!(Stage::Unrestricted.points(&settings), 1);
    }

    struct Playing {
        state: SharedState,
        session_id: Uuid,
        participant_id: Uuid,
        question_id: Uuid,
        answer: String,
    }

    async fn playing() -> Playing {
        let state = test_support::state().await;
        let session_id = test_support::session(
            &state,
            PartialQuizSettings {
                stage_progression: Some(StageProgression::Manual),
                ..Default::default()
            },
        )
        .await;
        session_service::generate_questions(&state, session_id, &identity(HOST))
            .await
            .unwrap();
        let participant_id = test_support::join(&state, session_id, "p1").await;
        test_support::join(&state, session_id, "p2").await;
        session_service::start_session(&state, session_id, &identity(HOST))
            .await
            .unwrap();

        let store = state.quiz_store().await.unwrap();
        let first = store.list_questions(session_id).await.unwrap().remove(0);
        Playing {
            state,
            session_id,
            participant_id,
            question_id: first.id,
            answer: first.correct_answers[0].clone(),
        }
    }

    fn request(game: &Playing, answer: &str) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            participant_id: game.participant_id,
            question_id: game.question_id,
            answer: answer.into(),
            elapsed_ms: Some(0),
        }
    }

    #[tokio::test]
    async fn correct_answer_in_first_stage_scores_stage_one_points() {
        let game = playing().await;
        let response = submit_answer(
            &game.state,
            game.session_id,
            &identity("p1"),
            request(&game, &game.answer),
        )
        .await
        .unwrap();

        assert!(response.is_correct);
        assert_eq!(response.stage, 1);
        assert_eq!(response.points_awarded, 3);
        assert_eq!(response.new_score, 3);
        assert_eq!(response.confidence, 1.0);
    }

    /// Move the start of the current question `secs` seconds into the past.
    async fn rewind_current_question(game: &Playing, secs: u64) {
        let store = game.state.quiz_store().await.unwrap();
        let mut session = store.find_session(game.session_id).await.unwrap().unwrap();
        session.stage_started_at = session
            .stage_started_at
            .map(|started| started - Duration::from_secs(secs));
        let version = session.version;
        assert!(store.update_session(session, version).await.unwrap());
    }

    #[tokio::test]
    async fn correct_answer_in_later_stages_scores_their_points() {
        let game = playing().await;
        rewind_current_question(&game, 15).await;

        let response = submit_answer(
            &game.state,
            game.session_id,
            &identity("p1"),
            request(&game, &game.answer),
        )
        .await
        .unwrap();
        assert!(response.is_correct);
        assert_eq!(response.stage, 2);
        assert_eq!(response.points_awarded, 2);
        assert_eq!(response.new_score, 2);

        rewind_current_question(&game, 15).await;
        let p2 = game
            .state
            .quiz_store()
            .await
            .unwrap()
            .list_participants(game.session_id)
            .await
            .unwrap()
            .into_iter()
            .find(|participant| participant.identity == "p2")
            .unwrap();
        let mut late = request(&game, &game.answer);
        late.participant_id = p2.id;
        let response = submit_answer(&game.state, game.session_id, &identity("p2"), late)
            .await
            .unwrap();
        assert_eq!(response.stage, 3);
        assert_eq!(response.points_awarded, 1);
    }

    #[tokio::test]
    async fn unscorable_answer_is_withdrawn() {
        let game = playing().await;
        let store = game.state.quiz_store().await.unwrap();
        store
            .increment_score(game.participant_id, i32::MAX)
            .await
            .unwrap();

        let overflow = submit_answer(
            &game.state,
            game.session_id,
            &identity("p1"),
            request(&game, &game.answer),
        )
        .await;
        assert!(matches!(overflow, Err(ServiceError::InvalidState(_))));
        assert!(store.list_answers(game.question_id).await.unwrap().is_empty());
        let participant = store.find_participant(game.participant_id).await.unwrap().unwrap();
        assert_eq!(participant.score, i32::MAX);
    }

    #[tokio::test]
    async fn answer_of_a_departed_participant_is_not_kept() {
        let game = playing().await;
        let store = game.state.quiz_store().await.unwrap();
        let answer = AnswerEntity {
            id: Uuid::new_v4(),
            session_id: game.session_id,
            question_id: game.question_id,
            participant_id: Uuid::new_v4(),
            answer: game.answer.clone(),
            is_correct: true,
            points_awarded: 3,
            stage: 1,
            answered_at: SystemTime::now(),
        };

        let result = record_answer(&store, answer).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert!(store.list_answers(game.question_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_answer_applies_penalty_and_score_can_go_negative() {
        let game = playing().await;
        let response = submit_answer(
            &game.state,
            game.session_id,
            &identity("p1"),
            request(&game, "まったく違う"),
        )
        .await
        .unwrap();

        assert!(!response.is_correct);
        assert_eq!(response.points_awarded, -1);
        assert_eq!(response.new_score, -1);
    }

    #[tokio::test]
    async fn second_submission_is_rejected() {
        let game = playing().await;
        submit_answer(
            &game.state,
            game.session_id,
            &identity("p1"),
            request(&game, "まったく違う"),
        )
        .await
        .unwrap();

        let duplicate = submit_answer(
            &game.state,
            game.session_id,
            &identity("p1"),
            request(&game, &game.answer),
        )
        .await;
        assert!(matches!(duplicate, Err(ServiceError::DuplicateSubmission)));
    }

    #[tokio::test]
    async fn answers_must_target_the_current_question() {
        let game = playing().await;
        session_service::advance_session(
            &game.state,
            game.session_id,
            AdvanceTrigger::Host(identity(HOST)),
        )
        .await
        .unwrap();

        let stale = submit_answer(
            &game.state,
            game.session_id,
            &identity("p1"),
            request(&game, &game.answer),
        )
        .await;
        assert!(matches!(stale, Err(ServiceError::QuestionMismatch)));
    }

    #[tokio::test]
    async fn answers_are_only_accepted_while_playing() {
        let game = playing().await;
        session_service::terminate_session(&game.state, game.session_id, &identity(HOST))
            .await
            .unwrap();

        let closed = submit_answer(
            &game.state,
            game.session_id,
            &identity("p1"),
            request(&game, &game.answer),
        )
        .await;
        assert!(matches!(closed, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn participants_answer_only_for_themselves() {
        let game = playing().await;

        let impersonated = submit_answer(
            &game.state,
            game.session_id,
            &identity("p2"),
            request(&game, &game.answer),
        )
        .await;
        assert!(matches!(impersonated, Err(ServiceError::PermissionDenied(_))));

        let mut unknown = request(&game, &game.answer);
        unknown.participant_id = Uuid::new_v4();
        let missing = submit_answer(&game.state, game.session_id, &identity("p1"), unknown).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn scoring_is_broadcast() {
        let game = playing().await;
        let mut events = game.state.session_sse(game.session_id).subscribe();

        submit_answer(
            &game.state,
            game.session_id,
            &identity("p1"),
            request(&game, &game.answer),
        )
        .await
        .unwrap();

        let submitted = events.recv().await.unwrap();
        assert_eq!(submitted.event.as_deref(), Some("answer_submitted"));
        let score = events.recv().await.unwrap();
        assert_eq!(score.event.as_deref(), Some("score_updated"));
    }
}
