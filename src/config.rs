//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_BACK_CONFIG_PATH";

const DEFAULT_SSE_CAPACITY: usize = 32;
const DEFAULT_ROOM_CODE_ATTEMPTS: u32 = 10;
const DEFAULT_VIDEO_DURATION_SECS: u32 = 300;
const DEFAULT_PROGRESSION_TICK_MS: u64 = 500;
const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Capacity of each per-session broadcast channel.
    pub sse_channel_capacity: usize,
    /// How many random room codes are tried before giving up.
    pub room_code_attempts: u32,
    /// Duration assumed for videos whose length could not be resolved.
    pub fallback_video_duration_secs: u32,
    /// Interval at which the auto-progression watcher looks for due questions.
    pub progression_tick: Duration,
    /// Base URL of the YouTube Data API.
    pub youtube_api_base: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        sse_channel_capacity = app_config.sse_channel_capacity,
                        room_code_attempts = app_config.room_code_attempts,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    sse_channel_capacity: Option<usize>,
    room_code_attempts: Option<u32>,
    fallback_video_duration_secs: Option<u32>,
    progression_tick_ms: Option<u64>,
    youtube_api_base: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            sse_channel_capacity: value
                .sse_channel_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(DEFAULT_SSE_CAPACITY),
            room_code_attempts: value
                .room_code_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(DEFAULT_ROOM_CODE_ATTEMPTS),
            fallback_video_duration_secs: value
                .fallback_video_duration_secs
                .unwrap_or(DEFAULT_VIDEO_DURATION_SECS),
            progression_tick: Duration::from_millis(
                value
                    .progression_tick_ms
                    .filter(|tick| *tick > 0)
                    .unwrap_or(DEFAULT_PROGRESSION_TICK_MS),
            ),
            youtube_api_base: value
                .youtube_api_base
                .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE.to_owned()),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
