//! Feed Orchestrator (C6): the public entry point tying cache, candidate
//! pools, ranking, progress, and prefetch together.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analytics::Analytics;
use crate::cache::Cache;
use crate::config::CoreConfig;
use crate::db::{EpisodeRepo, TitleRepo, UserRepo, WatchRepo};
use crate::error::{AppError, Result};
use crate::middleware::{CircuitBreaker, CircuitBreakerConfig};
use crate::models::{Card, Title, WatchRecord};
use crate::services::candidates::CandidatePools;
use crate::services::prefetch::PrefetchPlanner;
use crate::services::progress::{ProgressStore, SessionDelta};
use crate::services::ranking::Ranker;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedQuery {
    pub user_id: Option<Uuid>,
    pub limit: usize,
    pub offset: usize,
    pub override_genre: Option<String>,
    pub override_language: Option<String>,
    pub exclude_watched: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub cards: Vec<Card>,
}

/// Owns one instance of each repository/service collaborator. Constructed
/// once at startup and shared behind an `Arc` across request handlers —
/// the "singleton services map to constructor-injected dependencies"
/// design note.
pub struct Orchestrator {
    titles: TitleRepo,
    episodes: EpisodeRepo,
    users: UserRepo,
    watch: WatchRepo,
    cache: Cache,
    core: CoreConfig,
    analytics: Analytics,
    /// Guards the candidate-pool fan-out: a database that is timing out
    /// repeatedly trips the breaker so subsequent feed requests fail fast
    /// with `Dependency` instead of each queuing behind the same slow pool.
    pool_breaker: CircuitBreaker,
}

/// Deadline applied to the four-pool fan-out (§5 "every external call
/// carries a deadline propagated from the request"). Expiry surfaces as
/// `AppError::Timeout`, never a half-built page.
const CANDIDATE_POOL_DEADLINE: std::time::Duration = std::time::Duration::from_secs(3);

impl Orchestrator {
    pub fn new(
        titles: TitleRepo,
        episodes: EpisodeRepo,
        users: UserRepo,
        watch: WatchRepo,
        cache: Cache,
        core: CoreConfig,
        analytics: Analytics,
    ) -> Self {
        Self {
            titles,
            episodes,
            users,
            watch,
            cache,
            core,
            analytics,
            pool_breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
        }
    }

    fn feed_cache_key(&self, query: &FeedQuery) -> String {
        format!(
            "feed:{}:{}:{}:{}:{}:{}",
            query.user_id.map(|u| u.to_string()).unwrap_or_else(|| "anon".into()),
            query.limit,
            query.offset,
            query.override_genre.as_deref().unwrap_or(""),
            query.override_language.as_deref().unwrap_or(""),
            query.exclude_watched,
        )
    }

    pub async fn get_feed(&self, mut query: FeedQuery) -> Result<FeedPage> {
        query.limit = query.limit.clamp(1, self.core.max_feed_page_size);

        let cache_key = self.feed_cache_key(&query);
        if let Some(cached) = self.cache.get::<FeedPage>(&cache_key).await {
            return Ok(cached);
        }

        let user = match query.user_id {
            Some(id) => self.users.get_by_id(id).await?,
            None => None,
        };
        let preferences = UserRepo::effective_preferences(
            user.as_ref(),
            query.override_genre.as_deref(),
            query.override_language.as_deref(),
        );

        let exclude_ids = if query.exclude_watched {
            match query.user_id {
                Some(user_id) => self.watch.watched_title_ids(user_id).await?,
                None => Vec::new(),
            }
        } else {
            Vec::new()
        };

        let pools = CandidatePools::new(&self.titles, &self.core);
        let pooled = self
            .pool_breaker
            .call(|| async {
                tokio::time::timeout(
                    CANDIDATE_POOL_DEADLINE,
                    pools.fetch_all(&preferences, &exclude_ids, query.limit + query.offset),
                )
                .await
                .map_err(|_| AppError::Timeout)?
            })
            .await?;

        let ranker = Ranker::new(&self.episodes, &self.core);
        let mut cards = ranker
            .rank(pooled, &preferences, query.offset, query.limit)
            .await?;

        let planner = PrefetchPlanner::new(&self.episodes, &self.watch, &self.cache, &self.core);
        planner.attach_plans(&mut cards, query.user_id).await;

        let page = FeedPage { cards };

        let ttl = if query.user_id.is_some() {
            self.core.feed_cache_ttl_authenticated_secs
        } else {
            self.core.feed_cache_ttl_anonymous_secs
        };
        let mut tags = vec!["feed".to_string()];
        if let Some(user_id) = query.user_id {
            tags.push(format!("user:{user_id}"));
        }
        self.cache.set_with_tags(&cache_key, &page, ttl, &tags).await;

        self.analytics.track_content_view(query.user_id, Uuid::nil());

        Ok(page)
    }

    pub async fn get_trending(&self, limit: i64) -> Result<Vec<Title>> {
        let key = format!("trending:{limit}");
        if let Some(cached) = self.cache.get::<Vec<Title>>(&key).await {
            return Ok(cached);
        }
        let titles = self.titles.trending_unfiltered(limit).await?;
        self.cache
            .set_with_tags(&key, &titles, self.core.cache_ttl_medium_secs, &["feed".to_string()])
            .await;
        Ok(titles)
    }

    pub async fn get_featured(&self, limit: i64) -> Result<Vec<Title>> {
        self.titles.featured(limit).await
    }

    pub async fn get_editors_picks(&self, limit: i64) -> Result<Vec<Title>> {
        self.titles.editors_picks(limit).await
    }

    pub async fn get_popular_by_genre(&self, genre: &str, limit: i64) -> Result<Vec<Title>> {
        let key = format!("popular:{genre}:{limit}");
        if let Some(cached) = self.cache.get::<Vec<Title>>(&key).await {
            return Ok(cached);
        }
        let titles = self.titles.popular_by_genre(genre, limit).await?;
        self.cache
            .set_with_tags(&key, &titles, self.core.cache_ttl_medium_secs, &["feed".to_string()])
            .await;
        Ok(titles)
    }

    pub async fn get_continue_watching(&self, user_id: Uuid, limit: i64) -> Result<Vec<WatchRecord>> {
        let progress = ProgressStore::new(&self.watch, &self.episodes, &self.titles, &self.core);
        progress.get_continue_watching(user_id, limit).await
    }

    pub async fn get_similar(&self, title_id: Uuid, limit: i64) -> Result<Vec<Title>> {
        let source = self
            .titles
            .get_by_id(title_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("title {title_id} not found")))?;
        self.titles.similar(&source, limit).await
    }

    /// `|q| >= 2` is enforced here rather than at the HTTP boundary so every
    /// caller of the orchestrator gets the same guarantee.
    pub async fn search(
        &self,
        query: &str,
        genre: Option<&str>,
        language: Option<&str>,
        kind: Option<&str>,
        page: i64,
        limit: i64,
        user_id: Option<Uuid>,
    ) -> Result<Vec<Title>> {
        if query.chars().count() < 2 {
            return Err(AppError::Validation("search query must be at least 2 characters".into()));
        }
        let limit = limit.clamp(1, self.core.max_search_page_size as i64);
        let offset = page.max(0) * limit;

        let cache_key = format!(
            "search:{query}:{}:{}:{}:{page}:{limit}",
            genre.unwrap_or(""),
            language.unwrap_or(""),
            kind.unwrap_or("")
        );
        if let Some(cached) = self.cache.get::<Vec<Title>>(&cache_key).await {
            return Ok(cached);
        }

        let titles = self
            .titles
            .search(query, genre, language, kind, offset, limit)
            .await?;
        self.cache
            .set(&cache_key, &titles, self.core.search_cache_ttl_secs)
            .await;
        self.analytics.track_search(user_id, query);
        Ok(titles)
    }

    pub async fn start_watching(
        &self,
        user_id: Uuid,
        episode_id: Uuid,
        watched_via: &str,
    ) -> Result<WatchRecord> {
        let progress = ProgressStore::new(&self.watch, &self.episodes, &self.titles, &self.core);
        let record = progress
            .upsert_progress(user_id, episode_id, 0.0, watched_via, SessionDelta::default())
            .await?;
        self.cache.invalidate_by_tags(&[format!("user:{user_id}")]).await;
        Ok(record)
    }

    pub async fn update_progress(
        &self,
        user_id: Uuid,
        episode_id: Uuid,
        position: f64,
        delta: SessionDelta,
    ) -> Result<WatchRecord> {
        let progress = ProgressStore::new(&self.watch, &self.episodes, &self.titles, &self.core);
        let record = progress
            .upsert_progress(user_id, episode_id, position, "progress_update", delta)
            .await?;
        self.cache.invalidate_by_tags(&[format!("user:{user_id}")]).await;
        Ok(record)
    }

    pub async fn mark_completed(
        &self,
        user_id: Uuid,
        episode_id: Uuid,
        final_position: f64,
    ) -> Result<WatchRecord> {
        let progress = ProgressStore::new(&self.watch, &self.episodes, &self.titles, &self.core);
        let record = progress
            .upsert_progress(
                user_id,
                episode_id,
                final_position,
                "complete",
                SessionDelta::default(),
            )
            .await?;
        self.cache.invalidate_by_tags(&[format!("user:{user_id}")]).await;
        Ok(record)
    }

    pub async fn toggle_like(&self, user_id: Uuid, episode_id: Uuid, title_id: Uuid) -> Result<bool> {
        let progress = ProgressStore::new(&self.watch, &self.episodes, &self.titles, &self.core);
        let liked = progress.toggle_like(user_id, episode_id).await?;
        self.cache
            .invalidate_by_tags(&[format!("title:{title_id}")])
            .await;
        Ok(liked)
    }

    pub async fn share(&self, user_id: Uuid, episode_id: Uuid, title_id: Uuid) -> Result<()> {
        let progress = ProgressStore::new(&self.watch, &self.episodes, &self.titles, &self.core);
        progress.mark_shared(user_id, episode_id).await?;
        self.cache
            .invalidate_by_tags(&[format!("title:{title_id}")])
            .await;
        Ok(())
    }

    pub async fn rate(&self, user_id: Uuid, title_id: Uuid, rating: i16) -> Result<()> {
        let progress = ProgressStore::new(&self.watch, &self.episodes, &self.titles, &self.core);
        progress.set_rating(user_id, title_id, rating).await?;
        self.cache
            .invalidate_by_tags(&[format!("user:{user_id}"), format!("title:{title_id}")])
            .await;
        Ok(())
    }

    pub async fn clear_history(
        &self,
        user_id: Uuid,
        title_id: Option<Uuid>,
        older_than_days: Option<i64>,
    ) -> Result<u64> {
        let progress = ProgressStore::new(&self.watch, &self.episodes, &self.titles, &self.core);
        let affected = progress
            .clear_history(user_id, title_id, older_than_days)
            .await?;
        self.cache.invalidate_by_tags(&[format!("user:{user_id}")]).await;
        Ok(affected)
    }

    pub async fn get_title(&self, title_id: Uuid) -> Result<Title> {
        self.titles
            .get_by_id(title_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("title {title_id} not found")))
    }

    pub async fn get_episode(&self, episode_id: Uuid) -> Result<crate::models::Episode> {
        self.episodes
            .get_by_id(episode_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("episode {episode_id} not found")))
    }

    pub async fn list_episodes(
        &self,
        title_id: Uuid,
        season_number: Option<i32>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<crate::models::Episode>> {
        self.episodes
            .list_for_title(title_id, season_number, page, limit)
            .await
    }

    pub async fn get_progress_on_title(&self, user_id: Uuid, title_id: Uuid) -> Result<Vec<WatchRecord>> {
        let progress = ProgressStore::new(&self.watch, &self.episodes, &self.titles, &self.core);
        progress.get_progress_on_title(user_id, title_id).await
    }

    pub async fn get_watchlist(
        &self,
        user_id: Uuid,
        status: Option<crate::models::WatchStatus>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<WatchRecord>> {
        let limit = limit.clamp(1, self.core.max_feed_page_size as i64);
        let offset = page.max(0) * limit;
        self.watch.list_for_user(user_id, status, offset, limit).await
    }

    pub fn core_config(&self) -> &CoreConfig {
        &self.core
    }

    pub async fn health_check(&self) -> bool {
        self.cache.ping().await
    }
}
