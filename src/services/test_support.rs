//! Fixtures shared by the service tests.

use std::{sync::Arc, time::SystemTime};

use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{
        models::{PlaylistEntity, PlaylistVideoEntity},
        quiz_store::{QuizStore, memory::MemoryQuizStore},
    },
    dto::{participant::JoinSessionRequest, session::CreateSessionRequest},
    services::{
        identity::{HeaderIdentityProvider, Identity},
        participant_service, session_service,
        video_provider::{StaticVideoProvider, VideoMetadata},
    },
    state::{AppState, SharedState, settings::PartialQuizSettings},
};

pub const HOST: &str = "host-1";

pub fn identity(raw: &str) -> Identity {
    Identity::parse(raw).unwrap()
}

/// State backed by an in-memory store and a provider knowing one untitled video.
pub async fn state() -> SharedState {
    let provider = StaticVideoProvider::empty().with_video(
        "resolvedvid",
        VideoMetadata {
            title: "【2023年有馬記念】ドウデュース".into(),
            duration_secs: Some(200),
            thumbnail_url: None,
        },
    );
    let state = AppState::new(
        AppConfig::default(),
        Arc::new(provider),
        Arc::new(HeaderIdentityProvider),
    );
    let store: Arc<dyn QuizStore> = Arc::new(MemoryQuizStore::new());
    state.set_quiz_store(store).await;
    state
}

fn video(id: &str, title: Option<&str>) -> PlaylistVideoEntity {
    PlaylistVideoEntity {
        video_id: id.into(),
        title: title.map(Into::into),
        duration_secs: Some(180),
        thumbnail_url: None,
    }
}

/// Store a playlist with two answerable videos and one without any answer.
pub async fn playlist(state: &SharedState) -> Uuid {
    let playlist = PlaylistEntity {
        id: Uuid::new_v4(),
        name: "G1".into(),
        owner_id: HOST.into(),
        videos: vec![
            video("video000001", Some("【2024年有馬記念】レジェンドの末脚 | JRA公式")),
            video("video000002", Some("今日のまとめ")),
            video("video000003", Some("タイトルホルダー 逃げ切り")),
        ],
        created_at: SystemTime::now(),
    };
    let id = playlist.id;
    let store = state.quiz_store().await.unwrap();
    store.save_playlist(playlist).await.unwrap();
    id
}

/// Waiting session hosted by [`HOST`] with the given settings.
pub async fn session(state: &SharedState, settings: PartialQuizSettings) -> Uuid {
    let playlist_id = playlist(state).await;
    let summary = session_service::create_session(
        state,
        &identity(HOST),
        CreateSessionRequest {
            playlist_id,
            settings,
        },
    )
    .await
    .unwrap();
    summary.id
}

pub async fn join(state: &SharedState, session_id: Uuid, who: &str) -> Uuid {
    participant_service::join_session(
        state,
        session_id,
        &identity(who),
        JoinSessionRequest {
            display_name: who.into(),
        },
    )
    .await
    .unwrap()
    .id
}
