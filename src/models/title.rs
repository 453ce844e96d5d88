use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TitleType {
    Movie,
    Series,
    WebSeries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TitleStatus {
    Draft,
    Published,
    Archived,
    Private,
}

/// Engagement/ranking counters maintained on a Title.
///
/// `trendingScore` is read but never written here — per the spec's Open
/// Questions, its update path is external (an offline job or another
/// service); the Core only consumes it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::FromRow)]
pub struct TitleAnalytics {
    pub total_views: i64,
    pub total_likes: i64,
    pub total_shares: i64,
    pub average_rating: f64,
    pub total_ratings: i64,
    pub popularity_score: f64,
    pub trending_score: f64,
    pub completion_rate: f64,
}

impl Default for TitleAnalytics {
    fn default() -> Self {
        Self {
            total_views: 0,
            total_likes: 0,
            total_shares: 0,
            average_rating: 0.0,
            total_ratings: 0,
            popularity_score: 0.0,
            trending_score: 0.0,
            completion_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleFeedMeta {
    pub is_in_random_feed: bool,
    pub feed_priority: i16,
    pub feed_weight: f64,
    pub is_featured: bool,
    pub is_editors_pick: bool,
    pub geographic_restrictions: Vec<String>,
}

impl Default for TitleFeedMeta {
    fn default() -> Self {
        Self {
            is_in_random_feed: true,
            feed_priority: 5,
            feed_weight: 1.0,
            is_featured: false,
            is_editors_pick: false,
            geographic_restrictions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Title {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub genres: Vec<String>,
    pub languages: Vec<String>,
    pub kind: TitleType,
    pub category: String,
    pub age_rating: String,
    pub published_at: Option<DateTime<Utc>>,
    pub status: TitleStatus,

    pub total_views: i64,
    pub total_likes: i64,
    pub total_shares: i64,
    pub average_rating: f64,
    pub total_ratings: i64,
    pub popularity_score: f64,
    pub trending_score: f64,
    pub completion_rate: f64,

    pub is_in_random_feed: bool,
    pub feed_priority: i16,
    pub feed_weight: f64,
    pub is_featured: bool,
    pub is_editors_pick: bool,
    pub geographic_restrictions: Vec<String>,

    pub episode_ids: Vec<Uuid>,
}

impl Title {
    pub fn analytics(&self) -> TitleAnalytics {
        TitleAnalytics {
            total_views: self.total_views,
            total_likes: self.total_likes,
            total_shares: self.total_shares,
            average_rating: self.average_rating,
            total_ratings: self.total_ratings,
            popularity_score: self.popularity_score,
            trending_score: self.trending_score,
            completion_rate: self.completion_rate,
        }
    }

    pub fn feed_meta(&self) -> TitleFeedMeta {
        TitleFeedMeta {
            is_in_random_feed: self.is_in_random_feed,
            feed_priority: self.feed_priority,
            feed_weight: self.feed_weight,
            is_featured: self.is_featured,
            is_editors_pick: self.is_editors_pick,
            geographic_restrictions: self.geographic_restrictions.clone(),
        }
    }

    /// Days since publish, clamped to 0 when `published_at` is null — per
    /// the spec's resolution of the "popularityScore depends on
    /// publishedAt" open question: recency contributions clamp to 0 rather
    /// than panicking or producing a negative/garbage value.
    pub fn days_since_published(&self, now: DateTime<Utc>) -> Option<i64> {
        self.published_at.map(|p| (now - p).num_days().max(0))
    }

    pub fn matches_genres(&self, preferred: &[String]) -> bool {
        !preferred.is_empty() && self.genres.iter().any(|g| preferred.contains(g))
    }

    pub fn matches_languages(&self, preferred: &[String]) -> bool {
        !preferred.is_empty() && self.languages.iter().any(|l| preferred.contains(l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title_with(genres: Vec<&str>, published_at: Option<DateTime<Utc>>) -> Title {
        Title {
            id: Uuid::new_v4(),
            title: "Title".into(),
            description: String::new(),
            genres: genres.into_iter().map(String::from).collect(),
            languages: vec!["en".into()],
            kind: TitleType::Movie,
            category: String::new(),
            age_rating: String::new(),
            published_at,
            status: TitleStatus::Published,
            total_views: 0,
            total_likes: 0,
            total_shares: 0,
            average_rating: 0.0,
            total_ratings: 0,
            popularity_score: 0.0,
            trending_score: 0.0,
            completion_rate: 0.0,
            is_in_random_feed: true,
            feed_priority: 5,
            feed_weight: 1.0,
            is_featured: false,
            is_editors_pick: false,
            geographic_restrictions: Vec::new(),
            episode_ids: Vec::new(),
        }
    }

    #[test]
    fn days_since_published_is_none_without_a_publish_date() {
        let title = title_with(vec!["drama"], None);
        assert_eq!(title.days_since_published(Utc::now()), None);
    }

    #[test]
    fn days_since_published_clamps_future_dates_to_zero() {
        let title = title_with(vec!["drama"], Some(Utc::now() + chrono::Duration::days(1)));
        assert_eq!(title.days_since_published(Utc::now()), Some(0));
    }

    #[test]
    fn matches_genres_requires_nonempty_preference() {
        let title = title_with(vec!["drama"], None);
        assert!(!title.matches_genres(&[]));
        assert!(title.matches_genres(&["drama".to_string()]));
        assert!(!title.matches_genres(&["comedy".to_string()]));
    }
}
