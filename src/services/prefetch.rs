//! Prefetch Planner (C5): attaches a `_prefetch` block to the lead Cards of
//! a feed page so clients can warm local buffers before the user commits to
//! playback.

use uuid::Uuid;

use crate::cache::Cache;
use crate::config::CoreConfig;
use crate::db::{EpisodeRepo, WatchRepo};
use crate::error::Result;
use crate::metrics::PREFETCH_ESTIMATED_BYTES;
use crate::models::{Card, Episode, PrefetchEpisode, PrefetchPlan};

fn byte_multiplier(resolution: &str) -> f64 {
    match resolution {
        "480p" => 0.5,
        "720p" => 1.2,
        "1080p" => 2.5,
        "4k" => 6.0,
        _ => 1.2,
    }
}

pub struct PrefetchPlanner<'a> {
    episodes: &'a EpisodeRepo,
    watch: &'a WatchRepo,
    cache: &'a Cache,
    core: &'a CoreConfig,
}

impl<'a> PrefetchPlanner<'a> {
    pub fn new(episodes: &'a EpisodeRepo, watch: &'a WatchRepo, cache: &'a Cache, core: &'a CoreConfig) -> Self {
        Self {
            episodes,
            watch,
            cache,
            core,
        }
    }

    /// Attaches prefetch plans to the first `k` Cards in place. A plan
    /// failure for one Card attaches an empty block rather than aborting
    /// the page, per the partial-failure policy in the spec's error design.
    pub async fn attach_plans(&self, cards: &mut [Card], user_id: Option<Uuid>) {
        let k = self.core.prefetch_default_cards.min(cards.len());
        for card in cards.iter_mut().take(k) {
            let plan = self
                .plan_for_title(card.title.id, card.first_episode.as_ref(), user_id)
                .await
                .unwrap_or_default();
            card.prefetch = Some(plan);

            if let Some(user_id) = user_id {
                let user_key = format!("prefetch:{user_id}:{}", card.title.id);
                self.cache
                    .set_with_tags(
                        &user_key,
                        card.prefetch.as_ref().unwrap(),
                        self.core.prefetch_user_cache_ttl_secs,
                        &[format!("user:{user_id}"), format!("title:{}", card.title.id)],
                    )
                    .await;
            }
            let title_key = format!("prefetch:episode:{}", card.title.id);
            self.cache
                .set_with_tags(
                    &title_key,
                    card.prefetch.as_ref().unwrap(),
                    self.core.prefetch_title_cache_ttl_secs,
                    &[format!("title:{}", card.title.id)],
                )
                .await;
        }
    }

    /// Recomputes and caches a title-scoped prefetch plan ahead of any
    /// request reaching it, keyed the same way `attach_plans` keys the
    /// title-level entry. Used by the prefetch cache-warmer job (§9
    /// "supplemented ambient features") for trending titles so the first
    /// card of a hot title's feed entry doesn't pay a cold-cache lookup.
    pub async fn warm_title(&self, title_id: Uuid, first_episode: &Episode) -> Result<()> {
        let plan = self.plan_for_title(title_id, Some(first_episode), None).await?;
        let title_key = format!("prefetch:episode:{title_id}");
        self.cache
            .set_with_tags(
                &title_key,
                &plan,
                self.core.prefetch_title_cache_ttl_secs,
                &[format!("title:{title_id}")],
            )
            .await;
        Ok(())
    }

    async fn plan_for_title(
        &self,
        title_id: Uuid,
        first_episode: Option<&Episode>,
        user_id: Option<Uuid>,
    ) -> Result<PrefetchPlan> {
        let Some(first_episode) = first_episode else {
            return Ok(PrefetchPlan::default());
        };
        let (season, number) = first_episode.ordinal();
        let upcoming = self
            .episodes
            .next_episodes(title_id, season, number, self.core.prefetch_episodes_per_card as i64)
            .await?;
        self.build_plan(upcoming, user_id).await
    }

    /// Smart-mode variant: `k` scales with the user's recent binge pace
    /// rather than the fixed default.
    pub async fn plan_smart(
        &self,
        title_id: Uuid,
        current_season: i32,
        current_episode: i32,
        user_id: Uuid,
    ) -> Result<PrefetchPlan> {
        let k = self.smart_k(user_id).await;
        let upcoming = self
            .episodes
            .next_episodes(title_id, current_season, current_episode, k as i64)
            .await?;
        self.build_plan(upcoming, Some(user_id)).await
    }

    async fn smart_k(&self, user_id: Uuid) -> usize {
        let recent = self.watch.continue_watching(user_id, 50).await.unwrap_or_default();
        if recent.is_empty() {
            return 3;
        }
        let sessions: i64 = recent.iter().map(|r| r.total_sessions).sum();
        let avg_per_session = recent.len() as f64 / sessions.max(1) as f64;
        if avg_per_session < 2.0 {
            2
        } else if avg_per_session > 5.0 {
            7
        } else {
            3
        }
    }

    async fn build_plan(&self, upcoming: Vec<Episode>, user_id: Option<Uuid>) -> Result<PrefetchPlan> {
        let total = upcoming.len();
        let mut episodes = Vec::with_capacity(total);
        let mut estimated_bytes = 0.0;

        for (i, episode) in upcoming.into_iter().enumerate() {
            let prefetch_url = episode.prefetch_url(&self.core.prefetch_quality);
            let stream_url = episode.stream_url(&self.core.stream_quality);

            let duration_minutes = episode.duration as f64 / 60.0;
            estimated_bytes += duration_minutes * byte_multiplier(&self.core.prefetch_quality);

            let (current_position, percentage_watched, is_completed) = if let Some(user_id) = user_id {
                match self.watch.get(user_id, episode.id).await? {
                    Some(record) => (
                        Some(record.current_position),
                        Some(record.percentage_watched),
                        Some(record.is_completed),
                    ),
                    None => (None, None, None),
                }
            } else {
                (None, None, None)
            };

            episodes.push(PrefetchEpisode {
                episode_id: episode.id,
                season_number: episode.season_number,
                episode_number: episode.episode_number,
                prefetch_url,
                stream_url,
                current_position,
                percentage_watched,
                is_completed,
                priority: (total - i) as i32,
            });
        }

        PREFETCH_ESTIMATED_BYTES
            .with_label_values(&[&self.core.prefetch_quality])
            .observe(estimated_bytes);

        Ok(PrefetchPlan {
            episodes,
            estimated_bytes,
        })
    }
}
