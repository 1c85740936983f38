//! Video metadata lookup used to complete playlist entries before question generation.

#[cfg(feature = "youtube")]
mod youtube;

use std::collections::HashMap;

use futures::future::BoxFuture;
use thiserror::Error;

#[cfg(feature = "youtube")]
pub use self::youtube::YoutubeVideoProvider;

/// Metadata returned by a [`VideoInfoProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    /// Title as published.
    pub title: String,
    /// Length in seconds, when the provider knows it.
    pub duration_secs: Option<u32>,
    /// Preview image.
    pub thumbnail_url: Option<String>,
}

/// Fully resolved video fed to the question generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    /// External video identifier.
    pub video_id: String,
    /// Title the answers are extracted from.
    pub title: String,
    /// Length in seconds.
    pub duration_secs: u32,
    /// Preview image.
    pub thumbnail_url: Option<String>,
}

/// Result alias for provider lookups.
pub type VideoProviderResult<T> = Result<T, VideoProviderError>;

/// Failures raised while resolving video metadata.
#[derive(Debug, Error)]
pub enum VideoProviderError {
    /// The provider does not know the video.
    #[error("video `{video_id}` not found")]
    NotFound { video_id: String },
    /// Sending the request failed.
    #[cfg(feature = "youtube")]
    #[error("failed to query metadata for video `{video_id}`")]
    Request {
        video_id: String,
        #[source]
        source: reqwest::Error,
    },
    /// The provider answered with an error status.
    #[error("unexpected status {status} while fetching video `{video_id}`")]
    Status { video_id: String, status: u16 },
    /// The provider answered with a payload we could not understand.
    #[error("malformed metadata for video `{video_id}`: {reason}")]
    Malformed { video_id: String, reason: String },
}

/// External source of video metadata.
pub trait VideoInfoProvider: Send + Sync {
    /// Look up title, duration and thumbnail of `video_id`.
    fn fetch(&self, video_id: String) -> BoxFuture<'static, VideoProviderResult<VideoMetadata>>;

    /// Short name of the metadata source, reported by the health endpoint.
    fn name(&self) -> &'static str;
}

/// Provider answering from a fixed table; used when no API key is configured and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticVideoProvider {
    videos: HashMap<String, VideoMetadata>,
}

impl StaticVideoProvider {
    /// Provider that knows no video at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register metadata for a video.
    pub fn with_video(mut self, video_id: impl Into<String>, metadata: VideoMetadata) -> Self {
        self.videos.insert(video_id.into(), metadata);
        self
    }
}

impl VideoInfoProvider for StaticVideoProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    fn fetch(&self, video_id: String) -> BoxFuture<'static, VideoProviderResult<VideoMetadata>> {
        let found = self.videos.get(&video_id).cloned();
        Box::pin(async move { found.ok_or(VideoProviderError::NotFound { video_id }) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_answers_known_videos_only() {
        let provider = StaticVideoProvider::empty().with_video(
            "abc",
            VideoMetadata {
                title: "【2024年有馬記念】".into(),
                duration_secs: Some(240),
                thumbnail_url: None,
            },
        );

        let found = provider.fetch("abc".into()).await.unwrap();
        assert_eq!(found.duration_secs, Some(240));

        let missing = provider.fetch("zzz".into()).await.unwrap_err();
        assert!(matches!(missing, VideoProviderError::NotFound { video_id } if video_id == "zzz"));
    }
}
