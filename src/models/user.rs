use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DataUsage {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub preferred_genres: Vec<String>,
    pub preferred_languages: Vec<String>,
    pub auto_play: bool,
    pub data_usage: DataUsage,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            preferred_genres: Vec::new(),
            preferred_languages: Vec::new(),
            auto_play: true,
            data_usage: DataUsage::Medium,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FavoriteGenre {
    pub genre: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAnalytics {
    pub total_watch_time: i64,
    pub videos_watched: i64,
    pub average_session_duration: f64,
    pub favorite_genres: Vec<FavoriteGenre>,
}

impl Default for UserAnalytics {
    fn default() -> Self {
        Self {
            total_watch_time: 0,
            videos_watched: 0,
            average_session_duration: 0.0,
            favorite_genres: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserEngagement {
    pub likes: i64,
    pub shares: i64,
    pub swipe_right: i64,
    pub swipe_left: i64,
    pub average_video_completion: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub preferred_genres: Vec<String>,
    pub preferred_languages: Vec<String>,
    pub auto_play: bool,
    pub data_usage: DataUsage,

    pub total_watch_time: i64,
    pub videos_watched: i64,
    pub average_session_duration: f64,

    pub likes: i64,
    pub shares: i64,
    pub swipe_right: i64,
    pub swipe_left: i64,
    pub average_video_completion: f64,
}

impl User {
    pub fn preferences(&self) -> UserPreferences {
        UserPreferences {
            preferred_genres: self.preferred_genres.clone(),
            preferred_languages: self.preferred_languages.clone(),
            auto_play: self.auto_play,
            data_usage: self.data_usage,
        }
    }
}
