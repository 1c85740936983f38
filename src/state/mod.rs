//! Shared application state and the session lifecycle machine.

/// Quiz settings defaults and partial overrides.
pub mod settings;
mod sse;
/// Session lifecycle transition table.
pub mod state_machine;

use std::{sync::Arc, time::Instant};

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::quiz_store::QuizStore,
    error::ServiceError,
    services::{identity::IdentityProvider, video_provider::VideoInfoProvider},
};

pub use self::sse::SseHub;
pub use self::state_machine::{ApplyError, Plan, PlanError, PlanId};
use self::sse::SseState;

/// Shared handle to [`AppState`] passed to handlers and background tasks.
pub type SharedState = Arc<AppState>;

/// Pending automatic advance of a session in auto progression mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAdvance {
    /// Question index the timer was armed for.
    pub expected_index: usize,
    /// Instant at which the question is moved on.
    pub due: Instant,
}

/// Central application state holding the injected collaborators.
pub struct AppState {
    config: AppConfig,
    quiz_store: RwLock<Option<Arc<dyn QuizStore>>>,
    video_provider: Arc<dyn VideoInfoProvider>,
    identity_provider: Arc<dyn IdentityProvider>,
    sse: SseState,
    progression: DashMap<Uuid, ScheduledAdvance>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(
        config: AppConfig,
        video_provider: Arc<dyn VideoInfoProvider>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            sse: SseState::new(config.sse_channel_capacity),
            config,
            quiz_store: RwLock::new(None),
            video_provider,
            identity_provider,
            progression: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn quiz_store(&self) -> Option<Arc<dyn QuizStore>> {
        let guard = self.quiz_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store or [`ServiceError::Degraded`] while running without one.
    pub async fn require_quiz_store(&self) -> Result<Arc<dyn QuizStore>, ServiceError> {
        self.quiz_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn set_quiz_store(&self, store: Arc<dyn QuizStore>) {
        {
            let mut guard = self.quiz_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Provider used to resolve video metadata.
    pub fn video_provider(&self) -> &Arc<dyn VideoInfoProvider> {
        &self.video_provider
    }

    /// Provider used to resolve the caller of a request.
    pub fn identity_provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity_provider
    }

    /// Broadcast hub of a session, created on first use.
    pub fn session_sse(&self, session_id: Uuid) -> SseHub {
        self.sse.session(session_id)
    }

    /// Number of sessions with an open broadcast hub.
    pub fn open_session_hubs(&self) -> usize {
        self.sse.hub_count()
    }

    /// Drop the hub of a finished or deleted session.
    pub fn remove_session_sse(&self, session_id: Uuid) {
        self.sse.remove(session_id);
    }

    /// Arm (or re-arm) the automatic advance of a session.
    pub fn schedule_advance(&self, session_id: Uuid, advance: ScheduledAdvance) {
        self.progression.insert(session_id, advance);
    }

    /// Disarm the automatic advance of a session.
    pub fn cancel_advance(&self, session_id: Uuid) {
        self.progression.remove(&session_id);
    }

    /// Number of sessions waiting for an automatic advance.
    pub fn pending_advances(&self) -> usize {
        self.progression.len()
    }

    /// Scheduled advance of a session, if any.
    pub fn scheduled_advance(&self, session_id: Uuid) -> Option<ScheduledAdvance> {
        self.progression.get(&session_id).map(|entry| *entry)
    }

    /// Remove and return every advance that is due at `now`.
    pub fn take_due_advances(&self, now: Instant) -> Vec<(Uuid, usize)> {
        let due: Vec<Uuid> = self
            .progression
            .iter()
            .filter(|entry| entry.due <= now)
            .map(|entry| *entry.key())
            .collect();

        due.into_iter()
            .filter_map(|session_id| {
                self.progression
                    .remove_if(&session_id, |_, advance| advance.due <= now)
                    .map(|(id, advance)| (id, advance.expected_index))
            })
            .collect()
    }
}
