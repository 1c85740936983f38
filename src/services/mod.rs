/// Fuzzy comparison of typed answers.
pub mod answer_matcher;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Caller identification.
pub mod identity;
/// Participant join/leave operations.
pub mod participant_service;
/// Playlist registration.
pub mod playlist_service;
/// Timer-driven advance of auto progression sessions.
pub mod progression;
/// Answer extraction and question assembly from video titles.
pub mod question_generator;
/// Room code allocation helpers.
pub mod room_code;
/// Answer scoring.
pub mod scoring_service;
/// Session lifecycle operations.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Storage connection supervisor with degraded mode handling.
pub mod storage_supervisor;
/// Video metadata providers.
pub mod video_provider;

#[cfg(test)]
pub(crate) mod test_support;
