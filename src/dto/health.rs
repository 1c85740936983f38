//! Health report of the quiz backend.

use serde::Serialize;
use utoipa::ToSchema;

/// Overall availability: `ok` with a working store, `degraded` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// A store is installed and answered its health check.
    Ok,
    /// No store, or the store is failing; quiz operations answer 503.
    Degraded,
}

/// Payload of `GET /healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall availability.
    pub status: HealthStatus,
    /// Backend behind the quiz store (`memory`, `mongodb`), absent while degraded.
    pub store: Option<String>,
    /// Source of video metadata (`youtube` or `static`).
    pub video_provider: String,
    /// Sessions that currently have an event hub.
    pub open_sessions: usize,
    /// Auto-progression timers waiting to fire.
    pub pending_advances: usize,
}
