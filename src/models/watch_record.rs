use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WatchStatus {
    Watching,
    Completed,
    Dropped,
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub started_at: DateTime<Utc>,
    pub last_watched_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_sessions: i64,
    pub average_session_length: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WatchEngagement {
    pub session_duration: i64,
    pub pause_count: i64,
    pub seek_count: i64,
    pub buffering_time: i64,
}

/// One progress record per `(userId, episodeId)`. See invariants in the
/// spec's data-model section: `percentageWatched` is always derived from
/// `currentPosition`, completion is a one-way latch, and `currentPosition`
/// never decreases.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WatchRecord {
    pub user_id: Uuid,
    pub title_id: Uuid,
    pub episode_id: Uuid,
    pub season_number: i32,
    pub episode_number: i32,

    pub current_position: f64,
    pub total_duration: f64,
    pub percentage_watched: f64,
    pub is_completed: bool,
    pub status: WatchStatus,
    pub watched_via: String,
    pub rating: Option<i16>,
    pub liked: bool,
    pub shared: bool,

    pub started_at: DateTime<Utc>,
    pub last_watched_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_sessions: i64,
    pub average_session_length: f64,

    pub session_duration: i64,
    pub pause_count: i64,
    pub seek_count: i64,
    pub buffering_time: i64,
}

impl WatchRecord {
    pub fn session_info(&self) -> SessionInfo {
        SessionInfo {
            started_at: self.started_at,
            last_watched_at: self.last_watched_at,
            completed_at: self.completed_at,
            total_sessions: self.total_sessions,
            average_session_length: self.average_session_length,
        }
    }

    pub fn engagement(&self) -> WatchEngagement {
        WatchEngagement {
            session_duration: self.session_duration,
            pause_count: self.pause_count,
            seek_count: self.seek_count,
            buffering_time: self.buffering_time,
        }
    }

    /// `percentageWatched = 100 * currentPosition / totalDuration`, clamped
    /// to `[0, 100]`.
    pub fn percentage_for(position: f64, duration: f64) -> f64 {
        if duration <= 0.0 {
            return 0.0;
        }
        (100.0 * position / duration).clamp(0.0, 100.0)
    }

    pub fn is_in_continue_watching_band(&self, low_pct: f64, high_pct: f64) -> bool {
        matches!(self.status, WatchStatus::Watching | WatchStatus::Paused)
            && self.percentage_watched > low_pct
            && self.percentage_watched < high_pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(status: WatchStatus, percentage_watched: f64) -> WatchRecord {
        let now = Utc::now();
        WatchRecord {
            user_id: Uuid::new_v4(),
            title_id: Uuid::new_v4(),
            episode_id: Uuid::new_v4(),
            season_number: 1,
            episode_number: 1,
            current_position: 0.0,
            total_duration: 100.0,
            percentage_watched,
            is_completed: false,
            status,
            watched_via: String::new(),
            rating: None,
            liked: false,
            shared: false,
            started_at: now,
            last_watched_at: now,
            completed_at: None,
            total_sessions: 1,
            average_session_length: 0.0,
            session_duration: 0,
            pause_count: 0,
            seek_count: 0,
            buffering_time: 0,
        }
    }

    #[test]
    fn percentage_for_clamps_to_100() {
        assert_eq!(WatchRecord::percentage_for(150.0, 100.0), 100.0);
    }

    #[test]
    fn percentage_for_zero_duration_is_zero_not_nan() {
        assert_eq!(WatchRecord::percentage_for(10.0, 0.0), 0.0);
    }

    #[test]
    fn continue_watching_band_excludes_completed_status() {
        let record = record_with(WatchStatus::Completed, 50.0);
        assert!(!record.is_in_continue_watching_band(5.0, 80.0));
    }

    #[test]
    fn continue_watching_band_excludes_boundary_values() {
        let low = record_with(WatchStatus::Watching, 5.0);
        let high = record_with(WatchStatus::Watching, 80.0);
        assert!(!low.is_in_continue_watching_band(5.0, 80.0), "band is exclusive at the low end");
        assert!(!high.is_in_continue_watching_band(5.0, 80.0), "band is exclusive at the high end");
    }

    #[test]
    fn continue_watching_band_includes_paused_mid_range() {
        let record = record_with(WatchStatus::Paused, 42.0);
        assert!(record.is_in_continue_watching_band(5.0, 80.0));
    }
}
