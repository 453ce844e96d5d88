use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityVariant {
    pub resolution: String,
    pub url: String,
    pub file_size: i64,
    pub bitrate: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingOptions {
    pub preload_enabled: bool,
    pub preload_duration: i32,
    pub chunk_size: i32,
    pub adaptive_bitrate: bool,
}

impl Default for StreamingOptions {
    fn default() -> Self {
        Self {
            preload_enabled: true,
            preload_duration: 10,
            chunk_size: 1_048_576,
            adaptive_bitrate: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Episode {
    pub id: Uuid,
    pub title_id: Uuid,
    pub season_number: i32,
    pub episode_number: i32,
    pub title: String,
    pub duration: i32,
    pub thumbnail_url: String,
    pub quality_variants: sqlx::types::Json<Vec<QualityVariant>>,
    pub status: EpisodeStatus,
    pub streaming_options: sqlx::types::Json<StreamingOptions>,

    pub total_views: i64,
    pub total_watch_time: i64,
    pub completion_rate: f64,
    pub like_count: i64,
}

impl Episode {
    pub fn ordinal(&self) -> (i32, i32) {
        (self.season_number, self.episode_number)
    }

    pub fn is_published(&self) -> bool {
        self.status == EpisodeStatus::Published
    }

    /// Lowest-resolution URL for prefetch warming — prefers the configured
    /// prefetch quality, else the lowest present variant, else falls back to
    /// nothing (callers treat an absent prefetch URL as "skip this episode").
    pub fn prefetch_url(&self, preferred: &str) -> Option<String> {
        let variants = &self.quality_variants.0;
        if let Some(v) = variants.iter().find(|v| v.resolution == preferred) {
            return Some(v.url.clone());
        }
        variants
            .iter()
            .min_by_key(|v| resolution_rank(&v.resolution))
            .map(|v| v.url.clone())
    }

    /// Stream URL used once a user commits to playback: prefers the
    /// configured stream quality, else the first available variant.
    pub fn stream_url(&self, preferred: &str) -> Option<String> {
        let variants = &self.quality_variants.0;
        if let Some(v) = variants.iter().find(|v| v.resolution == preferred) {
            return Some(v.url.clone());
        }
        variants.first().map(|v| v.url.clone())
    }
}

fn resolution_rank(res: &str) -> u32 {
    match res {
        "240p" => 0,
        "360p" => 1,
        "480p" => 2,
        "720p" => 3,
        "1080p" => 4,
        "4k" => 5,
        _ => 99,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(res: &str) -> QualityVariant {
        QualityVariant {
            resolution: res.to_string(),
            url: format!("https://cdn.example/{res}.mp4"),
            file_size: 1,
            bitrate: 1,
        }
    }

    fn episode_with(variants: Vec<QualityVariant>) -> Episode {
        Episode {
            id: Uuid::new_v4(),
            title_id: Uuid::new_v4(),
            season_number: 1,
            episode_number: 1,
            title: "Pilot".into(),
            duration: 600,
            thumbnail_url: String::new(),
            quality_variants: sqlx::types::Json(variants),
            status: EpisodeStatus::Published,
            streaming_options: sqlx::types::Json(StreamingOptions::default()),
            total_views: 0,
            total_watch_time: 0,
            completion_rate: 0.0,
            like_count: 0,
        }
    }

    #[test]
    fn prefetch_prefers_480p() {
        let ep = episode_with(vec![variant("1080p"), variant("480p"), variant("720p")]);
        assert_eq!(ep.prefetch_url("480p").unwrap(), "https://cdn.example/480p.mp4");
    }

    #[test]
    fn prefetch_falls_back_to_lowest_present() {
        let ep = episode_with(vec![variant("1080p"), variant("720p")]);
        assert_eq!(ep.prefetch_url("480p").unwrap(), "https://cdn.example/720p.mp4");
    }

    #[test]
    fn stream_prefers_720p_else_first() {
        let ep = episode_with(vec![variant("1080p"), variant("480p")]);
        assert_eq!(ep.stream_url("720p").unwrap(), "https://cdn.example/1080p.mp4");
    }
}
