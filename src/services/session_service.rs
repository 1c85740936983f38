//! Session lifecycle: creation, question generation and the waiting → playing → finished
//! progression driven through [`SessionStateMachine`].

use std::{
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

use rand::rng;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{
        models::{
            ParticipantEntity, PlaylistVideoEntity, QuestionEntity, SessionEntity, SessionStatus,
            StageProgression,
        },
        quiz_store::QuizStore,
        storage::{StorageError, UniqueConstraint},
    },
    dto::{
        format_system_time,
        question::{CurrentQuestion, GenerateQuestionsResponse, QuestionPreview, RevealedQuestion},
        session::{CreateSessionRequest, LeaderboardEntry, SessionDetails, SessionStats, SessionSummary},
        sse::{FinishReason, QuizEvent},
    },
    error::ServiceError,
    services::{
        identity::Identity,
        question_generator::{self, QuestionDraft},
        room_code,
        scoring_service::Stage,
        sse_events,
        video_provider::VideoInfo,
    },
    state::{
        ScheduledAdvance, SharedState,
        state_machine::{SessionEvent, SessionPhase, SessionStateMachine},
    },
};

/// Who asked a session to move to its next question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceTrigger {
    /// The host pressed "next".
    Host(Identity),
    /// The auto-progression timer armed for `expected_index` fired.
    Timer {
        /// Question index the timer was armed for; a stale timer is ignored.
        expected_index: usize,
    },
}

/// Load a session or fail with [`ServiceError::NotFound`].
pub(crate) async fn load_session(
    store: &Arc<dyn QuizStore>,
    session_id: Uuid,
) -> Result<SessionEntity, ServiceError> {
    store
        .find_session(session_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}` not found")))
}

fn ensure_host(session: &SessionEntity, requester: &Identity) -> Result<(), ServiceError> {
    if session.host_id != requester.as_str() {
        return Err(ServiceError::PermissionDenied(
            "only the host can perform this action".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Creation and lookups
// ---------------------------------------------------------------------------

/// Open a new session in the waiting status with a freshly allocated room code.
pub async fn create_session(
    state: &SharedState,
    host: &Identity,
    request: CreateSessionRequest,
) -> Result<SessionSummary, ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let store = state.require_quiz_store().await?;
    if store.find_playlist(request.playlist_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "playlist `{}` not found",
            request.playlist_id
        )));
    }

    let settings = request.settings.apply_defaults();
    let attempts = state.config().room_code_attempts;
    let mut last_conflict = None;

    for attempt in 0..attempts {
        let now = SystemTime::now();
        let session = SessionEntity {
            id: Uuid::new_v4(),
            room_code: room_code::generate(&mut rng()),
            host_id: host.as_str().to_owned(),
            playlist_id: request.playlist_id,
            status: SessionStatus::Waiting,
            current_question_index: 0,
            settings: settings.clone(),
            version: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
            stage_started_at: None,
        };

        match store.insert_session(session.clone()).await {
            Ok(()) => {
                info!(session_id = %session.id, room_code = %session.room_code, host = %host, "session created");
                return Ok(session.into());
            }
            Err(err @ StorageError::Conflict(UniqueConstraint::RoomCode)) => {
                debug!(attempt, "room code collision; drawing another one");
                last_conflict = Some(err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    warn!(attempts, "could not allocate a unique room code");
    Err(ServiceError::Unavailable(last_conflict.unwrap_or(
        StorageError::Conflict(UniqueConstraint::RoomCode),
    )))
}

/// Session addressed by its (case-insensitive) room code.
pub async fn find_by_room_code(
    state: &SharedState,
    code: &str,
) -> Result<SessionSummary, ServiceError> {
    let session = session_by_room_code(state, code).await?;
    Ok(session.into())
}

pub(crate) async fn session_by_room_code(
    state: &SharedState,
    code: &str,
) -> Result<SessionEntity, ServiceError> {
    let canonical = room_code::canonicalize(code)
        .ok_or_else(|| ServiceError::InvalidInput(format!("`{code}` is not a room code")))?;
    let store = state.require_quiz_store().await?;
    store
        .find_session_by_room_code(canonical.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no session with room code `{canonical}`")))
}

/// Sessions hosted by `requester`, newest first.
pub async fn list_hosted(
    state: &SharedState,
    requester: &Identity,
) -> Result<Vec<SessionSummary>, ServiceError> {
    let store = state.require_quiz_store().await?;
    let mut sessions = store
        .list_sessions_by_host(requester.as_str().to_owned())
        .await?;
    sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(sessions.into_iter().map(Into::into).collect())
}

/// Session with its participants, question previews, current question and standings.
pub async fn get_details(
    state: &SharedState,
    session_id: Uuid,
) -> Result<SessionDetails, ServiceError> {
    let store = state.require_quiz_store().await?;
    let session = load_session(&store, session_id).await?;
    let participants = store.list_participants(session_id).await?;
    let questions = store.list_questions(session_id).await?;

    let current_question = current_question(&session, &questions, SystemTime::now());
    let stats = SessionStats {
        total_participants: participants.len(),
        total_questions: questions.len(),
        current_question: current_question.as_ref().map(|current| current.index),
        leaderboard: leaderboard(&participants),
    };

    Ok(SessionDetails {
        session: session.into(),
        participants: participants.into_iter().map(Into::into).collect(),
        questions: questions.iter().map(QuestionPreview::from).collect(),
        current_question,
        stats,
    })
}

/// Previews of the question set, in play order.
pub async fn list_questions(
    state: &SharedState,
    session_id: Uuid,
) -> Result<Vec<QuestionPreview>, ServiceError> {
    let store = state.require_quiz_store().await?;
    load_session(&store, session_id).await?;
    let questions = store.list_questions(session_id).await?;
    Ok(questions.iter().map(QuestionPreview::from).collect())
}

fn current_question(
    session: &SessionEntity,
    questions: &[QuestionEntity],
    now: SystemTime,
) -> Option<CurrentQuestion> {
    if session.status != SessionStatus::Playing {
        return None;
    }
    let index = session.current_question_index;
    let question = questions.get(index)?;
    Some(CurrentQuestion {
        index,
        question: question.into(),
        stage: Stage::of_session(session, now).number(),
        stage_started_at: session.stage_started_at.map(format_system_time),
    })
}

/// Rank participants by score, highest first. Tied scores share a rank and keep join order.
pub fn leaderboard(participants: &[ParticipantEntity]) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&ParticipantEntity> = participants.iter().collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));

    let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(ranked.len());
    for (position, participant) in ranked.into_iter().enumerate() {
        let rank = match entries.last() {
            Some(previous) if previous.score == participant.score => previous.rank,
            _ => position + 1,
        };
        entries.push(LeaderboardEntry {
            participant_id: participant.id,
            display_name: participant.display_name.clone(),
            score: participant.score,
            rank,
        });
    }
    entries
}

// ---------------------------------------------------------------------------
// Question generation
// ---------------------------------------------------------------------------

/// Replace the question set of a waiting session with questions built from its playlist.
pub async fn generate_questions(
    state: &SharedState,
    session_id: Uuid,
    requester: &Identity,
) -> Result<GenerateQuestionsResponse, ServiceError> {
    let store = state.require_quiz_store().await?;
    let session = load_session(&store, session_id).await?;
    ensure_host(&session, requester)?;
    if session.status != SessionStatus::Waiting {
        return Err(ServiceError::InvalidState(
            "questions can only be generated while waiting".into(),
        ));
    }

    let playlist = store.find_playlist(session.playlist_id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("playlist `{}` not found", session.playlist_id))
    })?;
    let total_videos = playlist.videos.len();

    let mut videos = Vec::with_capacity(total_videos);
    for entry in playlist.videos {
        if let Some(video) = resolve_video(state, entry).await {
            videos.push(video);
        }
    }

    let drafts = question_generator::generate(&videos, &mut rng());
    if drafts.is_empty() {
        return Err(ServiceError::NoQuestionsGenerated);
    }

    let now = SystemTime::now();
    let questions: Vec<QuestionEntity> = drafts
        .into_iter()
        .map(|draft| into_question(session_id, draft, now))
        .collect();
    store.replace_questions(session_id, questions.clone()).await?;

    let skipped = total_videos - questions.len();
    info!(%session_id, generated = questions.len(), skipped, "questions generated");
    sse_events::publish(
        state,
        session_id,
        &QuizEvent::QuestionsGenerated {
            total_questions: questions.len(),
            skipped_videos: skipped,
        },
    );

    Ok(GenerateQuestionsResponse {
        generated: questions.len(),
        skipped,
        questions: questions.iter().map(QuestionPreview::from).collect(),
    })
}

/// Complete a playlist entry with provider metadata when its title or duration is unknown.
///
/// Returns `None` when the title cannot be resolved; the video is then skipped.
async fn resolve_video(state: &SharedState, entry: PlaylistVideoEntity) -> Option<VideoInfo> {
    let fallback_duration = state.config().fallback_video_duration_secs;

    if let (Some(title), Some(duration_secs)) = (&entry.title, entry.duration_secs) {
        return Some(VideoInfo {
            video_id: entry.video_id.clone(),
            title: title.clone(),
            duration_secs,
            thumbnail_url: entry.thumbnail_url,
        });
    }

    match state.video_provider().fetch(entry.video_id.clone()).await {
        Ok(metadata) => Some(VideoInfo {
            video_id: entry.video_id,
            title: entry.title.unwrap_or(metadata.title),
            duration_secs: entry
                .duration_secs
                .or(metadata.duration_secs)
                .unwrap_or(fallback_duration),
            thumbnail_url: entry.thumbnail_url.or(metadata.thumbnail_url),
        }),
        Err(err) => match entry.title {
            Some(title) => {
                debug!(video_id = %entry.video_id, error = %err, "duration unresolved; using fallback");
                Some(VideoInfo {
                    video_id: entry.video_id,
                    title,
                    duration_secs: fallback_duration,
                    thumbnail_url: entry.thumbnail_url,
                })
            }
            None => {
                warn!(video_id = %entry.video_id, error = %err, "video metadata unavailable; skipping video");
                None
            }
        },
    }
}

fn into_question(session_id: Uuid, draft: QuestionDraft, now: SystemTime) -> QuestionEntity {
    QuestionEntity {
        id: Uuid::new_v4(),
        session_id,
        video_id: draft.video_id,
        video_title: draft.video_title,
        question_order: draft.question_order,
        correct_answers: draft.correct_answers,
        audio_start_time: draft.audio_start_time,
        video_start_time: draft.video_start_time,
        created_at: now,
    }
}

// ---------------------------------------------------------------------------
// Lifecycle transitions
// ---------------------------------------------------------------------------

/// Plan `event`, persist the resulting session with a version check, then apply the plan.
async fn transition(
    store: &Arc<dyn QuizStore>,
    mut session: SessionEntity,
    event: SessionEvent,
) -> Result<(SessionEntity, SessionPhase), ServiceError> {
    let mut machine = SessionStateMachine::from_session(&session);
    let plan = machine.plan(event)?;

    let now = SystemTime::now();
    match plan.to {
        SessionPhase::Waiting => {}
        SessionPhase::Playing { question_index } => {
            session.current_question_index = question_index;
            session.stage_started_at = Some(now);
            session.started_at.get_or_insert(now);
        }
        SessionPhase::Finished => {
            session.stage_started_at = None;
            session.finished_at = Some(now);
        }
    }
    session.status = plan.to.status();
    session.version = plan.version_next;
    session.updated_at = now;

    if !store
        .update_session(session.clone(), plan.version_expected)
        .await?
    {
        machine.abort();
        return Err(ServiceError::InvalidState(
            "session was modified concurrently".into(),
        ));
    }

    let phase = machine.apply(plan.id)?;
    debug!(session_id = %session.id, from = ?plan.from, to = ?phase, version = session.version, "session transition applied");
    Ok((session, phase))
}

/// Time a question stays current in auto progression mode.
fn auto_advance_delay(session: &SessionEntity) -> Duration {
    let settings = &session.settings;
    Duration::from_secs(
        3 * u64::from(settings.time_per_stage) + u64::from(settings.answer_time_limit),
    )
}

fn arm_auto_advance(state: &SharedState, session: &SessionEntity, phase: SessionPhase) {
    state.cancel_advance(session.id);
    if session.settings.stage_progression != StageProgression::Auto {
        return;
    }
    if let SessionPhase::Playing { question_index } = phase {
        state.schedule_advance(
            session.id,
            ScheduledAdvance {
                expected_index: question_index,
                due: Instant::now() + auto_advance_delay(session),
            },
        );
    }
}

/// Move a waiting session to its first question.
pub async fn start_session(
    state: &SharedState,
    session_id: Uuid,
    requester: &Identity,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_quiz_store().await?;
    let session = load_session(&store, session_id).await?;
    ensure_host(&session, requester)?;
    if session.status != SessionStatus::Waiting {
        return Err(ServiceError::InvalidState(
            "session can only be started while waiting".into(),
        ));
    }

    let questions = store.list_questions(session_id).await?;
    if questions.is_empty() {
        return Err(ServiceError::NoQuestions);
    }
    if store.list_participants(session_id).await?.is_empty() {
        return Err(ServiceError::NoParticipants);
    }

    let (session, phase) = transition(&store, session, SessionEvent::Start).await?;
    arm_auto_advance(state, &session, phase);

    info!(%session_id, questions = questions.len(), "session started");
    let summary = SessionSummary::from(session);
    sse_events::publish(
        state,
        session_id,
        &QuizEvent::SessionStarted {
            session: summary.clone(),
            question: questions.first().map(QuestionPreview::from),
        },
    );
    Ok(summary)
}

/// Move a playing session to its next question, finishing it after the last one.
pub async fn advance_session(
    state: &SharedState,
    session_id: Uuid,
    trigger: AdvanceTrigger,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_quiz_store().await?;
    let session = load_session(&store, session_id).await?;

    match &trigger {
        AdvanceTrigger::Host(requester) => ensure_host(&session, requester)?,
        AdvanceTrigger::Timer { expected_index } => {
            let still_current = session.status == SessionStatus::Playing
                && session.current_question_index == *expected_index;
            if !still_current {
                return Err(ServiceError::InvalidState(
                    "timer no longer matches the current question".into(),
                ));
            }
        }
    }
    if session.status != SessionStatus::Playing {
        return Err(ServiceError::InvalidState(
            "session can only advance while playing".into(),
        ));
    }

    let questions = store.list_questions(session_id).await?;
    let previous = questions
        .get(session.current_question_index)
        .map(RevealedQuestion::from);

    let (session, phase) = transition(
        &store,
        session,
        SessionEvent::Advance {
            question_count: questions.len(),
        },
    )
    .await?;
    arm_auto_advance(state, &session, phase);

    match phase {
        SessionPhase::Playing { question_index } => {
            info!(%session_id, question_index, ?trigger, "question advanced");
            sse_events::publish(
                state,
                session_id,
                &QuizEvent::QuestionAdvanced {
                    question_index,
                    question: questions.get(question_index).map(QuestionPreview::from),
                    previous,
                },
            );
        }
        _ => {
            info!(%session_id, ?trigger, "last question played; session finished");
            publish_finished(state, &store, session_id, FinishReason::Completed, previous).await;
        }
    }

    Ok(session.into())
}

/// Stop a session early.
pub async fn terminate_session(
    state: &SharedState,
    session_id: Uuid,
    requester: &Identity,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_quiz_store().await?;
    let session = load_session(&store, session_id).await?;
    ensure_host(&session, requester)?;

    let previous = if session.status == SessionStatus::Playing {
        store
            .list_questions(session_id)
            .await?
            .get(session.current_question_index)
            .map(RevealedQuestion::from)
    } else {
        None
    };

    let (session, _) = transition(&store, session, SessionEvent::Terminate).await?;
    state.cancel_advance(session_id);

    info!(%session_id, "session terminated by host");
    publish_finished(state, &store, session_id, FinishReason::Terminated, previous).await;
    Ok(session.into())
}

async fn publish_finished(
    state: &SharedState,
    store: &Arc<dyn QuizStore>,
    session_id: Uuid,
    reason: FinishReason,
    previous: Option<RevealedQuestion>,
) {
    let leaderboard = match store.list_participants(session_id).await {
        Ok(participants) => leaderboard(&participants),
        Err(err) => {
            warn!(%session_id, error = %err, "failed to load final standings");
            Vec::new()
        }
    };
    sse_events::publish(
        state,
        session_id,
        &QuizEvent::SessionFinished {
            reason,
            previous,
            leaderboard,
        },
    );
    // Subscribers still drain the buffered final event before their stream closes.
    state.remove_session_sse(session_id);
}

/// Delete a session along with its participants, questions and answers.
pub async fn delete_session(
    state: &SharedState,
    session_id: Uuid,
    requester: &Identity,
) -> Result<(), ServiceError> {
    let store = state.require_quiz_store().await?;
    let session = load_session(&store, session_id).await?;
    ensure_host(&session, requester)?;

    if !store.delete_session(session_id).await? {
        return Err(ServiceError::NotFound(format!(
            "session `{session_id}` not found"
        )));
    }
    state.cancel_advance(session_id);
    state.remove_session_sse(session_id);
    info!(%session_id, "session deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::PlaylistEntity,
        services::{
            progression,
            test_support::{self, HOST, identity},
        },
        state::settings::PartialQuizSettings,
    };

    fn manual() -> PartialQuizSettings {
        PartialQuizSettings {
            stage_progression: Some(StageProgression::Manual),
            ..Default::default()
        }
    }

    async fn playing_session(state: &SharedState, settings: PartialQuizSettings) -> Uuid {
        let session_id = test_support::session(state, settings).await;
        generate_questions(state, session_id, &identity(HOST))
            .await
            .unwrap();
        test_support::join(state, session_id, "player-1").await;
        start_session(state, session_id, &identity(HOST))
            .await
            .unwrap();
        session_id
    }

    #[tokio::test]
    async fn create_applies_defaults_and_allocates_room_code() {
        let state = test_support::state().await;
        let session_id = test_support::session(&state, PartialQuizSettings::default()).await;

        let details = get_details(&state, session_id).await.unwrap();
        let session = details.session;
        assert_eq!(session.status, SessionStatus::Waiting);
        assert_eq!(session.current_question_index, 0);
        assert_eq!(session.settings.max_participants, 10);
        assert_eq!(session.room_code.len(), room_code::ROOM_CODE_LEN);
        assert_eq!(
            room_code::canonicalize(&session.room_code).as_deref(),
            Some(session.room_code.as_str())
        );

        let found = find_by_room_code(&state, &session.room_code.to_lowercase())
            .await
            .unwrap();
        assert_eq!(found.id, session_id);
    }

    #[tokio::test]
    async fn create_rejects_invalid_settings_and_unknown_playlist() {
        let state = test_support::state().await;
        let playlist_id = test_support::playlist(&state).await;

        let invalid = create_session(
            &state,
            &identity(HOST),
            CreateSessionRequest {
                playlist_id,
                settings: PartialQuizSettings {
                    max_participants: Some(0),
                    ..Default::default()
                },
            },
        )
        .await;
        assert!(matches!(invalid, Err(ServiceError::InvalidInput(_))));

        let unbounded_points = create_session(
            &state,
            &identity(HOST),
            CreateSessionRequest {
                playlist_id,
                settings: PartialQuizSettings {
                    points_for_stage1: Some(i32::MAX),
                    ..Default::default()
                },
            },
        )
        .await;
        assert!(matches!(unbounded_points, Err(ServiceError::InvalidInput(_))));

        let unknown = create_session(
            &state,
            &identity(HOST),
            CreateSessionRequest {
                playlist_id: Uuid::new_v4(),
                settings: PartialQuizSettings::default(),
            },
        )
        .await;
        assert!(matches!(unknown, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn generation_is_host_only_and_skips_unanswerable_videos() {
        let state = test_support::state().await;
        let session_id = test_support::session(&state, PartialQuizSettings::default()).await;

        let denied = generate_questions(&state, session_id, &identity("intruder")).await;
        assert!(matches!(denied, Err(ServiceError::PermissionDenied(_))));

        let response = generate_questions(&state, session_id, &identity(HOST))
            .await
            .unwrap();
        assert_eq!(response.generated, 2);
        assert_eq!(response.skipped, 1);
        let orders: Vec<usize> = response.questions.iter().map(|q| q.question_order).collect();
        assert_eq!(orders, vec![0, 2]);

        let store = state.quiz_store().await.unwrap();
        let stored = store.list_questions(session_id).await.unwrap();
        assert!(stored.iter().all(|q| !q.correct_answers.is_empty()));

        // Regenerating replaces the set instead of appending to it.
        generate_questions(&state, session_id, &identity(HOST))
            .await
            .unwrap();
        assert_eq!(store.list_questions(session_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn generation_resolves_missing_titles_through_the_provider() {
        let state = test_support::state().await;
        let store = state.quiz_store().await.unwrap();
        let untitled = |id: &str| PlaylistVideoEntity {
            video_id: id.into(),
            title: None,
            duration_secs: None,
            thumbnail_url: None,
        };
        let playlist = PlaylistEntity {
            id: Uuid::new_v4(),
            name: "untitled".into(),
            owner_id: HOST.into(),
            videos: vec![untitled("resolvedvid"), untitled("unknownvid0")],
            created_at: SystemTime::now(),
        };
        let playlist_id = playlist.id;
        store.save_playlist(playlist).await.unwrap();

        let session = create_session(
            &state,
            &identity(HOST),
            CreateSessionRequest {
                playlist_id,
                settings: PartialQuizSettings::default(),
            },
        )
        .await
        .unwrap();

        let response = generate_questions(&state, session.id, &identity(HOST))
            .await
            .unwrap();
        assert_eq!(response.generated, 1);
        assert_eq!(response.skipped, 1);

        let questions = store.list_questions(session.id).await.unwrap();
        assert_eq!(questions[0].video_id, "resolvedvid");
        assert!(questions[0].audio_start_time <= 170);
    }

    #[tokio::test]
    async fn start_checks_questions_before_participants() {
        let state = test_support::state().await;
        let session_id = test_support::session(&state, PartialQuizSettings::default()).await;
        let host = identity(HOST);

        let denied = start_session(&state, session_id, &identity("player-1")).await;
        assert!(matches!(denied, Err(ServiceError::PermissionDenied(_))));

        let no_questions = start_session(&state, session_id, &host).await;
        assert!(matches!(no_questions, Err(ServiceError::NoQuestions)));

        generate_questions(&state, session_id, &host).await.unwrap();
        let no_participants = start_session(&state, session_id, &host).await;
        assert!(matches!(no_participants, Err(ServiceError::NoParticipants)));

        test_support::join(&state, session_id, "player-1").await;
        let started = start_session(&state, session_id, &host).await.unwrap();
        assert_eq!(started.status, SessionStatus::Playing);
        assert_eq!(started.current_question_index, 0);
        assert!(started.started_at.is_some());

        let again = start_session(&state, session_id, &host).await;
        assert!(matches!(again, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn start_requires_questions_even_with_participants() {
        let state = test_support::state().await;
        let session_id = test_support::session(&state, PartialQuizSettings::default()).await;
        test_support::join(&state, session_id, "player-1").await;
        test_support::join(&state, session_id, "player-2").await;

        let no_questions = start_session(&state, session_id, &identity(HOST)).await;
        assert!(matches!(no_questions, Err(ServiceError::NoQuestions)));
        let details = get_details(&state, session_id).await.unwrap();
        assert_eq!(details.session.status, SessionStatus::Waiting);
    }

    #[tokio::test]
    async fn advancing_past_the_last_question_finishes_the_session() {
        let state = test_support::state().await;
        let session_id = playing_session(&state, manual()).await;
        let host = AdvanceTrigger::Host(identity(HOST));

        let denied =
            advance_session(&state, session_id, AdvanceTrigger::Host(identity("player-1"))).await;
        assert!(matches!(denied, Err(ServiceError::PermissionDenied(_))));

        let second = advance_session(&state, session_id, host.clone())
            .await
            .unwrap();
        assert_eq!(second.status, SessionStatus::Playing);
        assert_eq!(second.current_question_index, 1);

        let finished = advance_session(&state, session_id, host.clone())
            .await
            .unwrap();
        assert_eq!(finished.status, SessionStatus::Finished);
        assert!(finished.finished_at.is_some());

        let after = advance_session(&state, session_id, host).await;
        assert!(matches!(after, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn manual_sessions_never_arm_the_timer() {
        let state = test_support::state().await;
        let session_id = playing_session(&state, manual()).await;
        assert!(state.scheduled_advance(session_id).is_none());
    }

    #[tokio::test]
    async fn auto_sessions_advance_when_the_timer_fires() {
        let state = test_support::state().await;
        let session_id = playing_session(&state, PartialQuizSettings::default()).await;

        let armed = state.scheduled_advance(session_id).unwrap();
        assert_eq!(armed.expected_index, 0);

        // Nothing is due yet.
        assert_eq!(progression::fire_due(&state, Instant::now()).await, 0);

        let advanced = progression::fire_due(&state, armed.due).await;
        assert_eq!(advanced, 1);
        let details = get_details(&state, session_id).await.unwrap();
        assert_eq!(details.session.current_question_index, 1);
        assert_eq!(state.scheduled_advance(session_id).unwrap().expected_index, 1);
    }

    #[tokio::test]
    async fn stale_timer_does_not_advance() {
        let state = test_support::state().await;
        let session_id = playing_session(&state, PartialQuizSettings::default()).await;

        advance_session(&state, session_id, AdvanceTrigger::Host(identity(HOST)))
            .await
            .unwrap();

        let stale =
            advance_session(&state, session_id, AdvanceTrigger::Timer { expected_index: 0 }).await;
        assert!(matches!(stale, Err(ServiceError::InvalidState(_))));
        let details = get_details(&state, session_id).await.unwrap();
        assert_eq!(details.session.current_question_index, 1);
    }

    #[tokio::test]
    async fn terminate_finishes_from_waiting_and_only_once() {
        let state = test_support::state().await;
        let session_id = test_support::session(&state, PartialQuizSettings::default()).await;
        let mut events = state.session_sse(session_id).subscribe();

        let denied = terminate_session(&state, session_id, &identity("player-1")).await;
        assert!(matches!(denied, Err(ServiceError::PermissionDenied(_))));

        let finished = terminate_session(&state, session_id, &identity(HOST))
            .await
            .unwrap();
        assert_eq!(finished.status, SessionStatus::Finished);

        let event = events.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("session_finished"));

        let again = terminate_session(&state, session_id, &identity(HOST)).await;
        assert!(matches!(again, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn finished_session_releases_its_event_hub() {
        let state = test_support::state().await;
        let session_id = playing_session(&state, manual()).await;
        let mut events = state.session_sse(session_id).subscribe();
        assert_eq!(state.open_session_hubs(), 1);

        terminate_session(&state, session_id, &identity(HOST))
            .await
            .unwrap();

        let last = events.recv().await.unwrap();
        assert_eq!(last.event.as_deref(), Some("session_finished"));
        assert!(matches!(
            events.recv().await,
            Err(tokio::sync::broadcast::error::RecvError::Closed)
        ));
        assert_eq!(state.open_session_hubs(), 0);

        let late = crate::services::sse_service::subscribe_session(&state, session_id).await;
        assert!(matches!(late, Err(ServiceError::InvalidState(_))));
        assert_eq!(state.open_session_hubs(), 0);
    }

    #[tokio::test]
    async fn delete_cascades_and_is_host_only() {
        let state = test_support::state().await;
        let session_id = playing_session(&state, PartialQuizSettings::default()).await;
        let store = state.quiz_store().await.unwrap();

        let denied = delete_session(&state, session_id, &identity("player-1")).await;
        assert!(matches!(denied, Err(ServiceError::PermissionDenied(_))));

        delete_session(&state, session_id, &identity(HOST))
            .await
            .unwrap();
        assert!(store.find_session(session_id).await.unwrap().is_none());
        assert!(store.list_participants(session_id).await.unwrap().is_empty());
        assert!(store.list_questions(session_id).await.unwrap().is_empty());
        assert!(state.scheduled_advance(session_id).is_none());

        let missing = get_details(&state, session_id).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn hosted_sessions_are_listed_per_host() {
        let state = test_support::state().await;
        test_support::session(&state, PartialQuizSettings::default()).await;
        test_support::session(&state, PartialQuizSettings::default()).await;

        assert_eq!(list_hosted(&state, &identity(HOST)).await.unwrap().len(), 2);
        assert!(list_hosted(&state, &identity("nobody")).await.unwrap().is_empty());
    }

    #[test]
    fn leaderboard_shares_rank_on_ties() {
        let participant = |name: &str, score| ParticipantEntity {
            id: Uuid::new_v4(),
            session_id: Uuid::nil(),
            identity: name.into(),
            display_name: name.into(),
            score,
            connected: true,
            joined_at: SystemTime::now(),
        };
        let board = leaderboard(&[
            participant("a", 2),
            participant("b", 5),
            participant("c", 2),
            participant("d", -1),
        ]);
        let ranks: Vec<(&str, usize)> = board
            .iter()
            .map(|entry| (entry.display_name.as_str(), entry.rank))
            .collect();
        assert_eq!(ranks, vec![("b", 1), ("a", 2), ("c", 2), ("d", 4)]);
    }
}
