use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{WatchRecord, WatchStatus};

pub struct WatchRepo {
    pool: PgPool,
}

impl WatchRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Locks the `(user_id, episode_id)` row for the duration of the caller's
    /// transaction, serializing concurrent writers per the spec's
    /// concurrency model (§5). Returns `None` the first time a user touches
    /// an episode, in which case the caller inserts a fresh row.
    pub async fn lock_row(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        episode_id: Uuid,
    ) -> Result<Option<WatchRecord>> {
        let row = sqlx::query_as::<_, WatchRecord>(
            "SELECT * FROM watch_records WHERE user_id = $1 AND episode_id = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(episode_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }

    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: &WatchRecord,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO watch_records (
                user_id, title_id, episode_id, season_number, episode_number,
                current_position, total_duration, percentage_watched, is_completed,
                status, watched_via, rating, liked, shared,
                started_at, last_watched_at, completed_at, total_sessions, average_session_length,
                session_duration, pause_count, seek_count, buffering_time
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,$23)",
        )
        .bind(record.user_id)
        .bind(record.title_id)
        .bind(record.episode_id)
        .bind(record.season_number)
        .bind(record.episode_number)
        .bind(record.current_position)
        .bind(record.total_duration)
        .bind(record.percentage_watched)
        .bind(record.is_completed)
        .bind(record.status)
        .bind(&record.watched_via)
        .bind(record.rating)
        .bind(record.liked)
        .bind(record.shared)
        .bind(record.started_at)
        .bind(record.last_watched_at)
        .bind(record.completed_at)
        .bind(record.total_sessions)
        .bind(record.average_session_length)
        .bind(record.session_duration)
        .bind(record.pause_count)
        .bind(record.seek_count)
        .bind(record.buffering_time)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Writes back progress fields. `current_position` is expected to
    /// already be the `max(existing, incoming)` computed by the caller under
    /// the row lock acquired via `lock_row` — this is the one-way-monotonic
    /// invariant from the spec's data model.
    pub async fn update_progress(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        episode_id: Uuid,
        current_position: f64,
        percentage_watched: f64,
        is_completed: bool,
        status: WatchStatus,
        last_watched_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        total_sessions: i64,
        average_session_length: f64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE watch_records SET
                current_position = $1, percentage_watched = $2, is_completed = $3,
                status = $4, last_watched_at = $5, completed_at = COALESCE(completed_at, $6),
                total_sessions = $7, average_session_length = $8
             WHERE user_id = $9 AND episode_id = $10",
        )
        .bind(current_position)
        .bind(percentage_watched)
        .bind(is_completed)
        .bind(status)
        .bind(last_watched_at)
        .bind(completed_at)
        .bind(total_sessions)
        .bind(average_session_length)
        .bind(user_id)
        .bind(episode_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn add_engagement(
        &self,
        user_id: Uuid,
        episode_id: Uuid,
        session_duration_delta: i64,
        pause_count_delta: i64,
        seek_count_delta: i64,
        buffering_time_delta: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE watch_records SET
                session_duration = session_duration + $1,
                pause_count = pause_count + $2,
                seek_count = seek_count + $3,
                buffering_time = buffering_time + $4
             WHERE user_id = $5 AND episode_id = $6",
        )
        .bind(session_duration_delta)
        .bind(pause_count_delta)
        .bind(seek_count_delta)
        .bind(buffering_time_delta)
        .bind(user_id)
        .bind(episode_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Writes the flipped `liked` flag on the same transaction that holds the
    /// row's `FOR UPDATE` lock from `lock_row`, so a concurrent toggle can't
    /// read the pre-flip value and race the episode like-counter update
    /// (see `ProgressStore::toggle_like`).
    pub async fn set_liked(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        episode_id: Uuid,
        liked: bool,
    ) -> Result<()> {
        sqlx::query("UPDATE watch_records SET liked = $1 WHERE user_id = $2 AND episode_id = $3")
            .bind(liked)
            .bind(user_id)
            .bind(episode_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn set_shared(&self, user_id: Uuid, episode_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE watch_records SET shared = TRUE WHERE user_id = $1 AND episode_id = $2")
            .bind(user_id)
            .bind(episode_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_rating(&self, user_id: Uuid, episode_id: Uuid, rating: i16) -> Result<()> {
        sqlx::query("UPDATE watch_records SET rating = $1 WHERE user_id = $2 AND episode_id = $3")
            .bind(rating)
            .bind(user_id)
            .bind(episode_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(&self, user_id: Uuid, episode_id: Uuid) -> Result<Option<WatchRecord>> {
        let row = sqlx::query_as::<_, WatchRecord>(
            "SELECT * FROM watch_records WHERE user_id = $1 AND episode_id = $2",
        )
        .bind(user_id)
        .bind(episode_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_for_title(&self, user_id: Uuid, title_id: Uuid) -> Result<Vec<WatchRecord>> {
        let rows = sqlx::query_as::<_, WatchRecord>(
            "SELECT * FROM watch_records WHERE user_id = $1 AND title_id = $2 \
             ORDER BY season_number ASC, episode_number ASC",
        )
        .bind(user_id)
        .bind(title_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Paginated watchlist listing for `GET /api/watchlist/:userId`,
    /// optionally filtered by status.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<WatchStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<WatchRecord>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, WatchRecord>(
                    "SELECT * FROM watch_records WHERE user_id = $1 AND status = $2 \
                     ORDER BY last_watched_at DESC LIMIT $3 OFFSET $4",
                )
                .bind(user_id)
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, WatchRecord>(
                    "SELECT * FROM watch_records WHERE user_id = $1 \
                     ORDER BY last_watched_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(user_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    /// `(total views, completed views)` across every WatchRecord for a
    /// single episode — the fraction feeds `Episode.completion_rate`
    /// (§9 fraction-of-completed-views semantics).
    pub async fn completion_stats_for_episode(&self, episode_id: Uuid) -> Result<(i64, i64)> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_completed) \
             FROM watch_records WHERE episode_id = $1",
        )
        .bind(episode_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Same as `completion_stats_for_episode` but aggregated across every
    /// episode of a title, for `Title.completion_rate`.
    pub async fn completion_stats_for_title(&self, title_id: Uuid) -> Result<(i64, i64)> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_completed) \
             FROM watch_records WHERE title_id = $1",
        )
        .bind(title_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn watched_title_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT DISTINCT title_id FROM watch_records WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Progress rows eligible for "continue watching": `status` in
    /// `{watching, paused}`, ordered most-recently-watched first. The
    /// percentage band filter (§4.4) is applied by the caller since it reads
    /// from configuration, not a fixed SQL constant.
    pub async fn continue_watching(&self, user_id: Uuid, limit: i64) -> Result<Vec<WatchRecord>> {
        let rows = sqlx::query_as::<_, WatchRecord>(
            "SELECT * FROM watch_records WHERE user_id = $1 \
             AND status IN ('watching', 'paused') \
             ORDER BY last_watched_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Bulk delete for `clearHistory(userId, {titleId?, olderThanDays?})`
    /// (§4.4). Both filters are optional and combine with AND; omitting
    /// both clears the user's entire history.
    pub async fn clear_history(
        &self,
        user_id: Uuid,
        title_id: Option<Uuid>,
        older_than_days: Option<i64>,
    ) -> Result<u64> {
        let mut qb = sqlx::QueryBuilder::new("DELETE FROM watch_records WHERE user_id = ");
        qb.push_bind(user_id);
        if let Some(title_id) = title_id {
            qb.push(" AND title_id = ");
            qb.push_bind(title_id);
        }
        if let Some(days) = older_than_days {
            qb.push(" AND last_watched_at < NOW() - (");
            qb.push_bind(days);
            qb.push(" || ' days')::interval ");
        }
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
