use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::episode::Episode;
use super::title::Title;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Personalized,
    Trending,
    Popular,
    Fresh,
}

/// An upcoming episode attached to a card's prefetch plan, overlaid with the
/// requesting user's existing progress when available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefetchEpisode {
    pub episode_id: Uuid,
    pub season_number: i32,
    pub episode_number: i32,
    pub prefetch_url: Option<String>,
    pub stream_url: Option<String>,
    pub current_position: Option<f64>,
    pub percentage_watched: Option<f64>,
    pub is_completed: Option<bool>,
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrefetchPlan {
    pub episodes: Vec<PrefetchEpisode>,
    pub estimated_bytes: f64,
}

/// One feed item: a Title summary, its first episode, algorithm metadata,
/// and an optional prefetch plan. This is where `_feedSource`,
/// `_algorithmScore`, and `_prefetch` live — never on the Title itself, per
/// the spec's design note that algorithm metadata must not leak onto the
/// persisted entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub title: Title,
    pub first_episode: Option<Episode>,
    #[serde(rename = "_feedSource")]
    pub feed_source: FeedSource,
    #[serde(rename = "_algorithmScore")]
    pub algorithm_score: f64,
    #[serde(rename = "_prefetch", skip_serializing_if = "Option::is_none")]
    pub prefetch: Option<PrefetchPlan>,
}
