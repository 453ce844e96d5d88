//! Progress & Watchlist Store (C4): business rules layered on top of
//! `db::watch_repo`. Owns the 80% completion latch, the continue-watching
//! window, rating aggregation, and like-toggle semantics.

use chrono::Utc;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::db::{EpisodeRepo, TitleRepo, UserRepo, WatchRepo};
use crate::error::{AppError, Result};
use crate::models::{WatchRecord, WatchStatus};

/// Fraction-of-completed-views `completionRate`, per §9 (not the source's
/// moving-average bug). Zero views is zero rate, never a division panic.
fn fraction_completed(total: i64, completed: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        completed as f64 / total as f64
    }
}

pub struct ProgressStore<'a> {
    watch: &'a WatchRepo,
    episodes: &'a EpisodeRepo,
    titles: &'a TitleRepo,
    core: &'a CoreConfig,
}

#[derive(Debug, Clone, Default)]
pub struct SessionDelta {
    pub session_duration: i64,
    pub pause_count: i64,
    pub seek_count: i64,
    pub buffering_time: i64,
}

impl<'a> ProgressStore<'a> {
    pub fn new(
        watch: &'a WatchRepo,
        episodes: &'a EpisodeRepo,
        titles: &'a TitleRepo,
        core: &'a CoreConfig,
    ) -> Self {
        Self {
            watch,
            episodes,
            titles,
            core,
        }
    }

    /// Creates the WatchRecord on first touch, otherwise applies
    /// `newPosition = max(oldPosition, position)` under the row's lock and
    /// latches completion exactly once when crossing the configured
    /// threshold. Session accounting is a running average, per the spec's
    /// `sessionInfo` fields.
    pub async fn upsert_progress(
        &self,
        user_id: Uuid,
        episode_id: Uuid,
        position: f64,
        watched_via: &str,
        delta: SessionDelta,
    ) -> Result<WatchRecord> {
        let episode = self
            .episodes
            .get_by_id(episode_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("episode {episode_id} not found")))?;

        let mut tx = self.watch.begin().await?;
        let existing = self.watch.lock_row(&mut tx, user_id, episode_id).await?;
        let now = Utc::now();
        // A brand-new record always changes the view count; an existing one
        // only changes the completed-view count the moment it newly latches.
        // Both are the only cases where the completion-rate fraction moves.
        let mut recompute_completion_rate = existing.is_none();

        let record = match existing {
            None => {
                let (season_number, episode_number) = episode.ordinal();
                let total_duration = episode.duration as f64;
                let percentage = WatchRecord::percentage_for(position, total_duration);
                let is_completed = percentage >= self.core.completion_threshold;
                let record = WatchRecord {
                    user_id,
                    title_id: episode.title_id,
                    episode_id,
                    season_number,
                    episode_number,
                    current_position: position.max(0.0),
                    total_duration,
                    percentage_watched: percentage,
                    is_completed,
                    status: if is_completed {
                        WatchStatus::Completed
                    } else {
                        WatchStatus::Watching
                    },
                    watched_via: watched_via.to_string(),
                    rating: None,
                    liked: false,
                    shared: false,
                    started_at: now,
                    last_watched_at: now,
                    completed_at: if is_completed { Some(now) } else { None },
                    total_sessions: 1,
                    average_session_length: delta.session_duration as f64,
                    session_duration: delta.session_duration,
                    pause_count: delta.pause_count,
                    seek_count: delta.seek_count,
                    buffering_time: delta.buffering_time,
                };
                self.watch.insert(&mut tx, &record).await?;
                record
            }
            Some(mut existing) => {
                let new_position = existing.current_position.max(position);
                let percentage = WatchRecord::percentage_for(new_position, existing.total_duration);
                let newly_completed = percentage >= self.core.completion_threshold;
                let is_completed = existing.is_completed || newly_completed;
                recompute_completion_rate = !existing.is_completed && newly_completed;
                let status = if is_completed {
                    WatchStatus::Completed
                } else {
                    WatchStatus::Watching
                };
                let total_sessions = existing.total_sessions + 1;
                let average_session_length = (existing.average_session_length
                    * existing.total_sessions as f64
                    + delta.session_duration as f64)
                    / total_sessions as f64;

                self.watch
                    .update_progress(
                        &mut tx,
                        user_id,
                        episode_id,
                        new_position,
                        percentage,
                        is_completed,
                        status,
                        now,
                        if is_completed { Some(now) } else { None },
                        total_sessions,
                        average_session_length,
                    )
                    .await?;

                existing.current_position = new_position;
                existing.percentage_watched = percentage;
                existing.is_completed = is_completed;
                existing.status = status;
                existing.last_watched_at = now;
                if existing.completed_at.is_none() && is_completed {
                    existing.completed_at = Some(now);
                }
                existing.total_sessions = total_sessions;
                existing.average_session_length = average_session_length;
                existing
            }
        };

        tx.commit().await?;

        if recompute_completion_rate {
            let (episode_total, episode_completed) =
                self.watch.completion_stats_for_episode(episode_id).await?;
            let episode_rate = fraction_completed(episode_total, episode_completed);
            self.episodes
                .apply_completion_rate(episode_id, episode_rate)
                .await?;

            let (title_total, title_completed) =
                self.watch.completion_stats_for_title(record.title_id).await?;
            let title_rate = fraction_completed(title_total, title_completed);
            self.titles
                .apply_completion_rate(record.title_id, title_rate)
                .await?;
        }

        if delta.session_duration != 0 || delta.pause_count != 0 || delta.seek_count != 0 || delta.buffering_time != 0
        {
            self.watch
                .add_engagement(
                    user_id,
                    episode_id,
                    0,
                    delta.pause_count,
                    delta.seek_count,
                    delta.buffering_time,
                )
                .await?;
        }

        Ok(record)
    }

    pub async fn add_engagement(
        &self,
        user_id: Uuid,
        episode_id: Uuid,
        delta: SessionDelta,
    ) -> Result<()> {
        self.watch
            .add_engagement(
                user_id,
                episode_id,
                delta.session_duration,
                delta.pause_count,
                delta.seek_count,
                delta.buffering_time,
            )
            .await
    }

    /// `avg <- (avg*N - r0 + r)/N` when replacing, `(avg*N + r)/(N+1), N+1`
    /// otherwise. Locks the Title row for the duration of the read-modify-
    /// write so concurrent raters never interleave (§5).
    pub async fn set_rating(&self, user_id: Uuid, title_id: Uuid, rating: i16) -> Result<()> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::Validation("rating must be between 1 and 5".into()));
        }

        let records = self.watch.get_for_title(user_id, title_id).await?;
        let existing_rating = records.iter().find_map(|r| r.rating);
        let episode_id = records
            .first()
            .map(|r| r.episode_id)
            .ok_or_else(|| AppError::Conflict(format!("user {user_id} has not watched title {title_id}")))?;

        let mut tx = self.watch.begin().await?;
        let (avg, total) = self.titles.lock_for_rating(&mut tx, title_id).await?;

        let (new_avg, new_total) = match existing_rating {
            Some(r0) if total > 0 => ((avg * total as f64 - r0 as f64 + rating as f64) / total as f64, total),
            _ => ((avg * total as f64 + rating as f64) / (total as f64 + 1.0), total + 1),
        };

        self.titles
            .apply_rating_delta(&mut tx, title_id, new_avg, new_total)
            .await?;
        tx.commit().await?;

        self.watch.set_rating(user_id, episode_id, rating).await?;
        Ok(())
    }

    /// Flips the like flag and adjusts the Episode's like counter by ±1,
    /// never underflowing below zero. Reads and writes the flag under the
    /// row's lock so two concurrent toggles can't both observe the same
    /// pre-flip value and double-apply the counter delta.
    pub async fn toggle_like(&self, user_id: Uuid, episode_id: Uuid) -> Result<bool> {
        let mut tx = self.watch.begin().await?;
        let record = self
            .watch
            .lock_row(&mut tx, user_id, episode_id)
            .await?
            .ok_or_else(|| AppError::Conflict(format!("user {user_id} has not watched episode {episode_id}")))?;

        let liked = !record.liked;
        self.watch.set_liked(&mut tx, user_id, episode_id, liked).await?;
        tx.commit().await?;

        self.episodes
            .increment_like_count(episode_id, if liked { 1 } else { -1 })
            .await?;
        Ok(liked)
    }

    pub async fn mark_shared(&self, user_id: Uuid, episode_id: Uuid) -> Result<()> {
        self.watch.set_shared(user_id, episode_id).await
    }

    pub async fn get_continue_watching(&self, user_id: Uuid, limit: i64) -> Result<Vec<WatchRecord>> {
        let candidates = self.watch.continue_watching(user_id, limit * 4).await?;
        let filtered: Vec<WatchRecord> = candidates
            .into_iter()
            .filter(|r| r.is_in_continue_watching_band(self.core.continue_watching_low, self.core.continue_watching_high))
            .take(limit as usize)
            .collect();
        Ok(filtered)
    }

    pub async fn get_progress_on_title(&self, user_id: Uuid, title_id: Uuid) -> Result<Vec<WatchRecord>> {
        self.watch.get_for_title(user_id, title_id).await
    }

    pub async fn watched_title_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        self.watch.watched_title_ids(user_id).await
    }

    pub async fn clear_history(
        &self,
        user_id: Uuid,
        title_id: Option<Uuid>,
        older_than_days: Option<i64>,
    ) -> Result<u64> {
        self.watch.clear_history(user_id, title_id, older_than_days).await
    }
}
