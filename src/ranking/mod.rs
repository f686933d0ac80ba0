use serde::Serialize;
use std::collections::HashMap;

use crate::youtube::VideoDetail;

/// A video merged with its channel's subscriber count and the derived
/// efficiency ratio. Immutable once built; superseded by the next search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    pub published_at: String,
    pub view_count: u64,
    pub comment_count: u64,
    pub subscriber_count: u64,
    pub efficiency_ratio: f64,
}

impl VideoRecord {
    /// Merge a video detail with its channel's subscriber count. The ratio is
    /// always recomputed here from its source counts, never carried over.
    fn merge(detail: &VideoDetail, subscribers: u64) -> Self {
        let subscribers = subscribers.max(1);
        let views = detail.view_count();
        VideoRecord {
            id: detail.id.clone(),
            title: detail.snippet.title.clone(),
            thumbnail: detail.thumbnail_url().to_string(),
            description: detail.snippet.description.clone(),
            channel_id: detail.snippet.channel_id.clone(),
            channel_title: detail.snippet.channel_title.clone(),
            published_at: detail.snippet.published_at.clone(),
            view_count: views,
            comment_count: detail.comment_count(),
            subscriber_count: subscribers,
            efficiency_ratio: views as f64 / subscribers as f64,
        }
    }
}

/// Merge video details with the channel subscriber mapping, drop records
/// below the efficiency threshold, and sort descending by ratio.
///
/// Channels absent from the mapping (and hidden counts decoded as 0) get a
/// subscriber floor of 1, so the ratio degrades to the raw view count rather
/// than dividing by zero. The sort is stable: equal ratios keep the
/// platform's relevance order.
pub fn rank(
    details: &[VideoDetail],
    subscribers: &HashMap<String, u64>,
    min_efficiency: f64,
) -> Vec<VideoRecord> {
    let mut records: Vec<VideoRecord> = details
        .iter()
        .map(|d| {
            let subs = subscribers.get(&d.snippet.channel_id).copied().unwrap_or(0);
            VideoRecord::merge(d, subs)
        })
        .filter(|r| r.efficiency_ratio >= min_efficiency)
        .collect();

    records.sort_by(|a, b| b.efficiency_ratio.total_cmp(&a.efficiency_ratio));
    records
}
