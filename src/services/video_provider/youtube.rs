//! YouTube Data API v3 backed metadata provider.

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{VideoInfoProvider, VideoMetadata, VideoProviderError, VideoProviderResult};

/// Metadata provider calling the `videos` endpoint of the YouTube Data API.
#[derive(Clone)]
pub struct YoutubeVideoProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl YoutubeVideoProvider {
    /// Build a provider for `base_url` authenticating with `api_key`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    async fn fetch_video(&self, video_id: String) -> VideoProviderResult<VideoMetadata> {
        let url = format!("{}/videos", self.base_url);
        debug!(%video_id, "fetching video metadata");

        let response = self
            .client
            .get(url)
            .query(&[
                ("part", "snippet,contentDetails"),
                ("id", video_id.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|source| VideoProviderError::Request {
                video_id: video_id.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(VideoProviderError::Status {
                video_id,
                status: status.as_u16(),
            });
        }

        let body: VideoListResponse =
            response
                .json()
                .await
                .map_err(|source| VideoProviderError::Request {
                    video_id: video_id.clone(),
                    source,
                })?;

        let Some(item) = body.items.into_iter().next() else {
            return Err(VideoProviderError::NotFound { video_id });
        };

        let duration_secs = item
            .content_details
            .and_then(|details| details.duration)
            .and_then(|raw| parse_iso8601_duration(&raw))
            .filter(|secs| *secs > 0);

        Ok(VideoMetadata {
            title: item.snippet.title,
            duration_secs,
            thumbnail_url: item.snippet.thumbnails.and_then(Thumbnails::best),
        })
    }
}

impl VideoInfoProvider for YoutubeVideoProvider {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn fetch(&self, video_id: String) -> BoxFuture<'static, VideoProviderResult<VideoMetadata>> {
        let provider = self.clone();
        Box::pin(async move { provider.fetch_video(video_id).await })
    }
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    snippet: Snippet,
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best(self) -> Option<String> {
        self.medium
            .or(self.high)
            .or(self.default)
            .map(|thumbnail| thumbnail.url)
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

/// Parse an ISO 8601 duration such as `PT1H2M3S` or `P1DT5M` into seconds.
///
/// Year and month designators are rejected since their length is ambiguous.
pub(crate) fn parse_iso8601_duration(raw: &str) -> Option<u32> {
    let rest = raw.strip_prefix('P')?;
    let mut total: u64 = 0;
    let mut number = String::new();
    let mut in_time = false;
    let mut seen_component = false;

    for c in rest.chars() {
        match c {
            '0'..='9' => number.push(c),
            'T' if !in_time && number.is_empty() => in_time = true,
            'W' | 'D' | 'H' | 'M' | 'S' => {
                let value: u64 = number.parse().ok()?;
                number.clear();
                let unit = match (c, in_time) {
                    ('W', false) => 7 * 86_400,
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return None,
                };
                total = total.checked_add(value.checked_mul(unit)?)?;
                seen_component = true;
            }
            _ => return None,
        }
    }

    if !number.is_empty() || !seen_component {
        return None;
    }
    u32::try_from(total).ok()
}
