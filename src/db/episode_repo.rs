use std::collections::HashMap;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Episode, EpisodeStatus};

pub struct EpisodeRepo {
    pool: sqlx::PgPool,
}

impl EpisodeRepo {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Episode>> {
        let episode = sqlx::query_as::<_, Episode>("SELECT * FROM episodes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(episode)
    }

    /// First published episode (by `season_number, episode_number`) for each
    /// title in `title_ids`, batched into one query to avoid the N+1 the
    /// spec warns against when attaching a `firstEpisode` to every card.
    pub async fn first_published_per_title(
        &self,
        title_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Episode>> {
        if title_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, Episode>(
            "SELECT DISTINCT ON (title_id) * FROM episodes \
             WHERE title_id = ANY($1) AND status = $2 \
             ORDER BY title_id, season_number ASC, episode_number ASC",
        )
        .bind(title_ids)
        .bind(EpisodeStatus::Published)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|e| (e.title_id, e)).collect())
    }

    /// Up to `limit` published episodes of `title_id` strictly after
    /// `(season_number, episode_number)`, used by the prefetch planner to
    /// line up the next few episodes of the card the user is on (§4.5).
    pub async fn next_episodes(
        &self,
        title_id: Uuid,
        after_season: i32,
        after_episode: i32,
        limit: i64,
    ) -> Result<Vec<Episode>> {
        let rows = sqlx::query_as::<_, Episode>(
            "SELECT * FROM episodes WHERE title_id = $1 AND status = $2 \
             AND (season_number, episode_number) > ($3, $4) \
             ORDER BY season_number ASC, episode_number ASC LIMIT $5",
        )
        .bind(title_id)
        .bind(EpisodeStatus::Published)
        .bind(after_season)
        .bind(after_episode)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Published episodes of `title_id`, optionally narrowed to a single
    /// season, paginated via `(page, limit)` for
    /// `GET /api/content/:titleId/episodes`.
    pub async fn list_for_title(
        &self,
        title_id: Uuid,
        season_number: Option<i32>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Episode>> {
        let mut qb = QueryBuilder::new("SELECT * FROM episodes WHERE title_id = ");
        qb.push_bind(title_id);
        qb.push(" AND status = ");
        qb.push_bind(EpisodeStatus::Published);
        if let Some(season_number) = season_number {
            qb.push(" AND season_number = ");
            qb.push_bind(season_number);
        }
        qb.push(" ORDER BY season_number ASC, episode_number ASC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind((page - 1).max(0) * limit);
        let rows = qb.build_query_as::<Episode>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn record_view(&self, episode_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE episodes SET total_views = total_views + 1 WHERE id = $1")
            .bind(episode_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn apply_completion_rate(&self, episode_id: Uuid, rate: f64) -> Result<()> {
        sqlx::query("UPDATE episodes SET completion_rate = $1 WHERE id = $2")
            .bind(rate)
            .bind(episode_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn increment_like_count(&self, episode_id: Uuid, delta: i64) -> Result<()> {
        sqlx::query(
            "UPDATE episodes SET like_count = GREATEST(0, like_count + $1) WHERE id = $2",
        )
        .bind(delta)
        .bind(episode_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
