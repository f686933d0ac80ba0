use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Error, Result};

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const SEARCH_PAGE_SIZE: u32 = 25;
const COMMENT_PAGE_SIZE: u32 = 50;

/// Sentinel returned by `comments` when the platform reports the
/// commentsDisabled reason, so downstream analysis always has input.
pub const COMMENTS_DISABLED_PLACEHOLDER: &str = "(Comments are disabled for this video)";

/// Coarse video-length filter applied server-side by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationBucket {
    Any,
    Short,
    Medium,
    Long,
}

impl DurationBucket {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "any" => Some(DurationBucket::Any),
            "short" => Some(DurationBucket::Short),
            "medium" => Some(DurationBucket::Medium),
            "long" => Some(DurationBucket::Long),
            _ => None,
        }
    }

    /// Value for the videoDuration query parameter. `Any` omits it entirely.
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            DurationBucket::Any => None,
            DurationBucket::Short => Some("short"),
            DurationBucket::Medium => Some("medium"),
            DurationBucket::Long => Some("long"),
        }
    }
}

/// Read-only client for the YouTube Data API v3.
///
/// One shot per call: no retries, no backoff, no caching. A failed call
/// surfaces immediately — this is a user-triggered query tool, not a service.
pub struct YouTubeClient {
    api_key: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl YouTubeClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: YOUTUBE_API_BASE.to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Search for videos matching a keyword. Zero hits is an empty list,
    /// not an error.
    pub fn search(&self, keyword: &str, duration: DurationBucket) -> Result<Vec<SearchHit>> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("q", keyword.to_string()),
            ("type", "video".to_string()),
            ("maxResults", SEARCH_PAGE_SIZE.to_string()),
        ];
        if let Some(d) = duration.query_value() {
            params.push(("videoDuration", d.to_string()));
        }
        let body = self.get("search", &params)?;
        parse_search_body(&body)
    }

    /// Fetch statistics + snippet for a batch of video IDs in one request.
    pub fn video_statistics(&self, video_ids: &[String]) -> Result<Vec<VideoDetail>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = vec![
            ("part", "statistics,snippet".to_string()),
            ("id", video_ids.join(",")),
        ];
        let body = self.get("videos", &params)?;
        parse_video_body(&body)
    }

    /// Fetch subscriber counts for a batch of channel IDs in one request.
    /// Channels absent from the response are absent from the mapping.
    pub fn channel_statistics(&self, channel_ids: &[String]) -> Result<HashMap<String, u64>> {
        if channel_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let params = vec![
            ("part", "statistics".to_string()),
            ("id", channel_ids.join(",")),
        ];
        let body = self.get("channels", &params)?;
        parse_channel_body(&body)
    }

    /// Fetch up to 50 top-level comments ordered by relevance. A video with
    /// comments disabled yields the sentinel placeholder, not an error.
    pub fn comments(&self, video_id: &str) -> Result<Vec<String>> {
        let params = vec![
            ("part", "snippet".to_string()),
            ("videoId", video_id.to_string()),
            ("maxResults", COMMENT_PAGE_SIZE.to_string()),
            ("order", "relevance".to_string()),
        ];
        let body = self.get("commentThreads", &params)?;
        parse_comments_body(&body)
    }

    /// Issue one GET and return the raw body. The platform reports errors as
    /// a JSON envelope (with a non-2xx status), so the body is read
    /// regardless of status and the envelope check happens at parse time.
    fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(Error::MissingCredential(
                "YouTube API key is missing. Set it in config or pass --api-key.".to_string(),
            ));
        }

        let url = format!("{}/{}", self.base_url, endpoint);
        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()?;

        let status = resp.status();
        let body = resp.text()?;
        debug!(endpoint, %status, bytes = body.len(), "youtube response");
        Ok(body)
    }
}

// ── Response decoding ──────────────────────────────────────────────────────

/// Every Data API response is either `{items: [...]}` or `{error: {...}}`.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiResponse<T> {
    error: Option<ApiError>,
    #[serde(default)]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: SearchHitId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHitId {
    pub video_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoDetail {
    pub id: String,
    pub snippet: VideoSnippet,
    pub statistics: VideoStatistics,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    pub published_at: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    pub high: Option<Thumbnail>,
    pub default: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

/// Counters arrive as JSON strings and are legitimately absent when the
/// owner hides them, so they stay lenient: absent or unparsable means 0.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    #[serde(default)]
    view_count: Option<String>,
    #[serde(default)]
    comment_count: Option<String>,
}

impl VideoDetail {
    pub fn view_count(&self) -> u64 {
        parse_count(&self.statistics.view_count)
    }

    pub fn comment_count(&self) -> u64 {
        parse_count(&self.statistics.comment_count)
    }

    /// High-resolution thumbnail if present, else the default one.
    pub fn thumbnail_url(&self) -> &str {
        self.snippet
            .thumbnails
            .high
            .as_ref()
            .or(self.snippet.thumbnails.default.as_ref())
            .map(|t| t.url.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    #[serde(default)]
    statistics: Option<ChannelStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
    #[serde(default)]
    subscriber_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    text_display: String,
}

fn parse_count(raw: &Option<String>) -> u64 {
    raw.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0)
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<ApiResponse<T>> {
    serde_json::from_str(body)
        .map_err(|e| Error::RemoteApi(format!("Unexpected response from YouTube API: {e}")))
}

fn parse_search_body(body: &str) -> Result<Vec<SearchHit>> {
    let resp: ApiResponse<SearchHit> = decode(body)?;
    if let Some(err) = resp.error {
        return Err(Error::RemoteApi(err.message));
    }
    Ok(resp.items)
}

fn parse_video_body(body: &str) -> Result<Vec<VideoDetail>> {
    let resp: ApiResponse<VideoDetail> = decode(body)?;
    if let Some(err) = resp.error {
        return Err(Error::RemoteApi(err.message));
    }
    Ok(resp.items)
}

fn parse_channel_body(body: &str) -> Result<HashMap<String, u64>> {
    let resp: ApiResponse<ChannelItem> = decode(body)?;
    if let Some(err) = resp.error {
        return Err(Error::RemoteApi(err.message));
    }
    let mut mapping = HashMap::new();
    for item in resp.items {
        let subs = item
            .statistics
            .as_ref()
            .map(|s| parse_count(&s.subscriber_count))
            .unwrap_or(0);
        mapping.insert(item.id, subs);
    }
    Ok(mapping)
}

fn parse_comments_body(body: &str) -> Result<Vec<String>> {
    let resp: ApiResponse<CommentThread> = decode(body)?;
    if let Some(err) = resp.error {
        let reason = err.errors.first().and_then(|d| d.reason.as_deref());
        if reason == Some("commentsDisabled") {
            return Ok(vec![COMMENTS_DISABLED_PLACEHOLDER.to_string()]);
        }
        return Err(Error::RemoteApi(err.message));
    }
    Ok(resp
        .items
        .into_iter()
        .map(|t| t.snippet.top_level_comment.snippet.text_display)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_bucket_parses_all_four_names() {
        assert_eq!(DurationBucket::from_str("any"), Some(DurationBucket::Any));
        assert_eq!(DurationBucket::from_str("Short"), Some(DurationBucket::Short));
        assert_eq!(DurationBucket::from_str("MEDIUM"), Some(DurationBucket::Medium));
        assert_eq!(DurationBucket::from_str("long"), Some(DurationBucket::Long));
        assert_eq!(DurationBucket::from_str("hour"), None);
    }

    #[test]
    fn duration_any_omits_query_value() {
        assert_eq!(DurationBucket::Any.query_value(), None);
        assert_eq!(DurationBucket::Short.query_value(), Some("short"));
    }

    #[test]
    fn search_body_decodes_hits() {
        let body = r#"{"items": [
            {"id": {"kind": "youtube#video", "videoId": "abc123"}, "snippet": {"title": "t"}},
            {"id": {"videoId": "def456"}}
        ]}"#;
        let hits = parse_search_body(body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id.video_id, "abc123");
        assert_eq!(hits[1].id.video_id, "def456");
    }

    #[test]
    fn search_body_zero_items_is_empty_not_error() {
        assert!(parse_search_body(r#"{"items": []}"#).unwrap().is_empty());
        // items key absent entirely
        assert!(parse_search_body(r#"{"kind": "youtube#searchListResponse"}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn search_body_error_envelope_surfaces_message() {
        let body = r#"{"error": {"code": 403, "message": "The request is missing a valid API key.",
            "errors": [{"reason": "keyInvalid"}]}}"#;
        let err = parse_search_body(body).unwrap_err();
        match err {
            Error::RemoteApi(msg) => {
                assert_eq!(msg, "The request is missing a valid API key.")
            }
            other => panic!("expected RemoteApi, got {other:?}"),
        }
    }

    #[test]
    fn video_body_decodes_string_counters() {
        let body = r#"{"items": [{
            "id": "abc123",
            "snippet": {
                "title": "테크 리뷰 영상",
                "description": "d",
                "channelId": "UC1",
                "channelTitle": "Chan",
                "publishedAt": "2025-11-02T09:00:00Z",
                "thumbnails": {"default": {"url": "https://i.ytimg.com/d.jpg"},
                               "high": {"url": "https://i.ytimg.com/h.jpg"}}
            },
            "statistics": {"viewCount": "100000", "likeCount": "5"}
        }]}"#;
        let videos = parse_video_body(body).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].view_count(), 100_000);
        // commentCount absent → 0, not an error
        assert_eq!(videos[0].comment_count(), 0);
        assert_eq!(videos[0].thumbnail_url(), "https://i.ytimg.com/h.jpg");
    }

    #[test]
    fn video_thumbnail_falls_back_to_default() {
        let body = r#"{"items": [{
            "id": "abc123",
            "snippet": {
                "title": "t", "channelId": "UC1", "channelTitle": "c",
                "publishedAt": "2025-11-02T09:00:00Z",
                "thumbnails": {"default": {"url": "https://i.ytimg.com/d.jpg"}}
            },
            "statistics": {}
        }]}"#;
        let videos = parse_video_body(body).unwrap();
        assert_eq!(videos[0].thumbnail_url(), "https://i.ytimg.com/d.jpg");
    }

    #[test]
    fn channel_body_builds_subscriber_mapping() {
        let body = r#"{"items": [
            {"id": "UC1", "statistics": {"subscriberCount": "10000"}},
            {"id": "UC2", "statistics": {"hiddenSubscriberCount": true}}
        ]}"#;
        let mapping = parse_channel_body(body).unwrap();
        assert_eq!(mapping.get("UC1"), Some(&10_000));
        // hidden counter decodes as 0; the ranking floor handles it
        assert_eq!(mapping.get("UC2"), Some(&0));
        assert_eq!(mapping.get("UC3"), None);
    }

    #[test]
    fn comments_body_extracts_display_text() {
        let body = r#"{"items": [
            {"snippet": {"topLevelComment": {"snippet": {"textDisplay": "최고예요"}}}},
            {"snippet": {"topLevelComment": {"snippet": {"textDisplay": "Great video"}}}}
        ]}"#;
        let comments = parse_comments_body(body).unwrap();
        assert_eq!(comments, vec!["최고예요", "Great video"]);
    }

    #[test]
    fn comments_disabled_yields_sentinel_not_error() {
        let body = r#"{"error": {"code": 403,
            "message": "The video identified by the videoId parameter has disabled comments.",
            "errors": [{"reason": "commentsDisabled"}]}}"#;
        let comments = parse_comments_body(body).unwrap();
        assert_eq!(comments, vec![COMMENTS_DISABLED_PLACEHOLDER]);
    }

    #[test]
    fn comments_other_error_propagates() {
        let body = r#"{"error": {"message": "Quota exceeded", "errors": [{"reason": "quotaExceeded"}]}}"#;
        let err = parse_comments_body(body).unwrap_err();
        assert!(matches!(err, Error::RemoteApi(msg) if msg == "Quota exceeded"));
    }

    #[test]
    fn non_json_body_is_a_remote_api_error() {
        assert!(matches!(
            parse_search_body("<html>Bad Gateway</html>"),
            Err(Error::RemoteApi(_))
        ));
    }
}
