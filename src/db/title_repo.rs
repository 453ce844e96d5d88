use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Title, TitleStatus};

/// The minimal filter shared by every candidate pool (§4.2): published,
/// in-random-feed, optionally excluding titles the user has already
/// watched. Individual pools layer their own ordering/window on top.
#[derive(Debug, Clone, Default)]
pub struct BasePredicate {
    pub exclude_title_ids: Vec<Uuid>,
    pub preferred_genres: Vec<String>,
    pub preferred_languages: Vec<String>,
}

pub struct TitleRepo {
    pool: PgPool,
}

impl TitleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn base_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, predicate: &'a BasePredicate) {
        qb.push(" status = ");
        qb.push_bind(TitleStatus::Published);
        qb.push(" AND is_in_random_feed = TRUE ");
        if !predicate.exclude_title_ids.is_empty() {
            qb.push(" AND id <> ALL(");
            qb.push_bind(&predicate.exclude_title_ids);
            qb.push(") ");
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Title>> {
        let title = sqlx::query_as::<_, Title>("SELECT * FROM titles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(title)
    }

    pub async fn get_many_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Title>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, Title>("SELECT * FROM titles WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|t| (t.id, t)).collect())
    }

    /// Personalized pool: base predicate plus genre/language overlap with
    /// the user's preferences (omitted entirely when preferences are
    /// empty), ordered by `feed_priority DESC, popularity_score DESC`.
    pub async fn personalized(&self, predicate: &BasePredicate, limit: i64) -> Result<Vec<Title>> {
        let mut qb = QueryBuilder::new("SELECT * FROM titles WHERE ");
        Self::base_filters(&mut qb, predicate);
        if !predicate.preferred_genres.is_empty() {
            qb.push(" AND genres && ");
            qb.push_bind(&predicate.preferred_genres);
        }
        if !predicate.preferred_languages.is_empty() {
            qb.push(" AND languages && ");
            qb.push_bind(&predicate.preferred_languages);
        }
        qb.push(" ORDER BY feed_priority DESC, popularity_score DESC, id ASC LIMIT ");
        qb.push_bind(limit);
        let rows = qb.build_query_as::<Title>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Trending pool: base predicate plus `published_at >= now - window`,
    /// ordered by `trending_score DESC`.
    pub async fn trending(
        &self,
        predicate: &BasePredicate,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Title>> {
        let mut qb = QueryBuilder::new("SELECT * FROM titles WHERE ");
        Self::base_filters(&mut qb, predicate);
        qb.push(" AND published_at >= ");
        qb.push_bind(since);
        qb.push(" ORDER BY trending_score DESC, id ASC LIMIT ");
        qb.push_bind(limit);
        let rows = qb.build_query_as::<Title>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Popular pool: base predicate only, ordered by `popularity_score DESC`.
    pub async fn popular(&self, predicate: &BasePredicate, limit: i64) -> Result<Vec<Title>> {
        let mut qb = QueryBuilder::new("SELECT * FROM titles WHERE ");
        Self::base_filters(&mut qb, predicate);
        qb.push(" ORDER BY popularity_score DESC, id ASC LIMIT ");
        qb.push_bind(limit);
        let rows = qb.build_query_as::<Title>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Fresh pool: base predicate plus `published_at >= now - window`,
    /// ordered by `published_at DESC`.
    pub async fn fresh(
        &self,
        predicate: &BasePredicate,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Title>> {
        let mut qb = QueryBuilder::new("SELECT * FROM titles WHERE ");
        Self::base_filters(&mut qb, predicate);
        qb.push(" AND published_at >= ");
        qb.push_bind(since);
        qb.push(" ORDER BY published_at DESC, id ASC LIMIT ");
        qb.push_bind(limit);
        let rows = qb.build_query_as::<Title>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn trending_unfiltered(&self, limit: i64) -> Result<Vec<Title>> {
        let rows = sqlx::query_as::<_, Title>(
            "SELECT * FROM titles WHERE status = $1 AND is_in_random_feed = TRUE \
             ORDER BY trending_score DESC, id ASC LIMIT $2",
        )
        .bind(TitleStatus::Published)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn featured(&self, limit: i64) -> Result<Vec<Title>> {
        let rows = sqlx::query_as::<_, Title>(
            "SELECT * FROM titles WHERE status = $1 AND is_featured = TRUE \
             ORDER BY feed_priority DESC, popularity_score DESC LIMIT $2",
        )
        .bind(TitleStatus::Published)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn editors_picks(&self, limit: i64) -> Result<Vec<Title>> {
        let rows = sqlx::query_as::<_, Title>(
            "SELECT * FROM titles WHERE status = $1 AND is_editors_pick = TRUE \
             ORDER BY popularity_score DESC LIMIT $2",
        )
        .bind(TitleStatus::Published)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn popular_by_genre(&self, genre: &str, limit: i64) -> Result<Vec<Title>> {
        let rows = sqlx::query_as::<_, Title>(
            "SELECT * FROM titles WHERE status = $1 AND is_in_random_feed = TRUE \
             AND $2 = ANY(genres) ORDER BY popularity_score DESC LIMIT $3",
        )
        .bind(TitleStatus::Published)
        .bind(genre)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Similar titles: same category OR any shared genre, excluding the
    /// source title, ordered by `popularity_score DESC` (§4.6 `getSimilar`).
    pub async fn similar(&self, source: &Title, limit: i64) -> Result<Vec<Title>> {
        let rows = sqlx::query_as::<_, Title>(
            "SELECT * FROM titles WHERE status = $1 AND id <> $2 \
             AND (category = $3 OR genres && $4) \
             ORDER BY popularity_score DESC LIMIT $5",
        )
        .bind(TitleStatus::Published)
        .bind(source.id)
        .bind(&source.category)
        .bind(&source.genres)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Case-insensitive substring search over title/description, `|q| >= 2`
    /// enforced by the caller. Results ordered by `popularity_score DESC`.
    pub async fn search(
        &self,
        query: &str,
        genre: Option<&str>,
        language: Option<&str>,
        kind: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Title>> {
        let pattern = format!("%{}%", query.to_lowercase());
        let mut qb = QueryBuilder::new(
            "SELECT * FROM titles WHERE status = ",
        );
        qb.push_bind(TitleStatus::Published);
        qb.push(" AND (LOWER(title) LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR LOWER(description) LIKE ");
        qb.push_bind(pattern);
        qb.push(") ");
        if let Some(genre) = genre {
            qb.push(" AND ");
            qb.push_bind(genre);
            qb.push(" = ANY(genres) ");
        }
        if let Some(language) = language {
            qb.push(" AND ");
            qb.push_bind(language);
            qb.push(" = ANY(languages) ");
        }
        if let Some(kind) = kind {
            qb.push(" AND kind = ");
            qb.push_bind(kind);
            qb.push(" ");
        }
        qb.push(" ORDER BY popularity_score DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);
        let rows = qb.build_query_as::<Title>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Writes the recomputed `averageRating`/`totalRatings` on the same
    /// transaction that holds the row's `FOR UPDATE` lock from
    /// `lock_for_rating`, so the read-modify-write is atomic end to end —
    /// a second pooled connection never blocks waiting on a lock only
    /// `tx.commit()` would release (see `ProgressStore::set_rating`).
    pub async fn apply_rating_delta(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        title_id: Uuid,
        new_average: f64,
        new_total_ratings: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE titles SET average_rating = $1, total_ratings = $2 WHERE id = $3",
        )
        .bind(new_average)
        .bind(new_total_ratings)
        .bind(title_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn lock_for_rating(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        title_id: Uuid,
    ) -> Result<(f64, i64)> {
        let row: (f64, i64) = sqlx::query_as(
            "SELECT average_rating, total_ratings FROM titles WHERE id = $1 FOR UPDATE",
        )
        .bind(title_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    /// Recomputes and stores a Title's `completionRate` as the fraction of
    /// its WatchRecords that are completed (§9: fraction-of-completed-views
    /// semantics, not the source's moving-average bug).
    pub async fn apply_completion_rate(&self, title_id: Uuid, rate: f64) -> Result<()> {
        sqlx::query("UPDATE titles SET completion_rate = $1 WHERE id = $2")
            .bind(rate)
            .bind(title_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
