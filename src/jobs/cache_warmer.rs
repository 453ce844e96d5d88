//! Prefetch Cache Warmer Background Job
//!
//! Proactively recomputes and caches per-title prefetch plans for trending
//! titles so the first card of a hot title's feed entry doesn't pay a cold
//! cache lookup (§9 supplemented ambient features). Runs on a fixed
//! interval and warms a bounded number of titles per cycle to avoid
//! hammering Postgres during a cycle.

use std::time::{Duration, Instant};

use tokio::time::sleep;

use crate::cache::Cache;
use crate::config::CoreConfig;
use crate::db::{EpisodeRepo, TitleRepo, WatchRepo};
use crate::services::prefetch::PrefetchPlanner;

const WARM_INTERVAL: Duration = Duration::from_secs(5 * 60);
const MAX_TITLES_PER_CYCLE: i64 = 200;

#[derive(Clone)]
pub struct CacheWarmerConfig {
    pub enabled: bool,
    pub warm_interval: Duration,
    pub max_titles_per_cycle: i64,
}

impl Default for CacheWarmerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            warm_interval: WARM_INTERVAL,
            max_titles_per_cycle: MAX_TITLES_PER_CYCLE,
        }
    }
}

pub async fn start_cache_warmer(
    titles: TitleRepo,
    episodes: EpisodeRepo,
    watch: WatchRepo,
    cache: Cache,
    core: CoreConfig,
    config: CacheWarmerConfig,
) {
    if !config.enabled {
        tracing::info!("prefetch cache warmer disabled by configuration");
        return;
    }

    tracing::info!(
        interval_secs = config.warm_interval.as_secs(),
        max_titles = config.max_titles_per_cycle,
        "starting prefetch cache warmer background job"
    );

    sleep(Duration::from_secs(30)).await;

    loop {
        let cycle_start = Instant::now();
        match run_warm_cycle(&titles, &episodes, &watch, &cache, &core, &config).await {
            Ok(warmed) => {
                tracing::info!(
                    titles_warmed = warmed,
                    duration_ms = cycle_start.elapsed().as_millis(),
                    "prefetch warm cycle completed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    duration_ms = cycle_start.elapsed().as_millis(),
                    "prefetch warm cycle failed"
                );
            }
        }
        sleep(config.warm_interval).await;
    }
}

async fn run_warm_cycle(
    titles: &TitleRepo,
    episodes: &EpisodeRepo,
    watch: &WatchRepo,
    cache: &Cache,
    core: &CoreConfig,
    config: &CacheWarmerConfig,
) -> crate::error::Result<usize> {
    let trending = titles.trending_unfiltered(config.max_titles_per_cycle).await?;
    if trending.is_empty() {
        tracing::debug!("no trending titles found for prefetch warming");
        return Ok(0);
    }

    let title_ids: Vec<_> = trending.iter().map(|t| t.id).collect();
    let first_episodes = episodes.first_published_per_title(&title_ids).await?;
    let planner = PrefetchPlanner::new(episodes, watch, cache, core);

    let mut warmed = 0;
    for title in &trending {
        let Some(first_episode) = first_episodes.get(&title.id) else {
            continue;
        };
        if let Err(e) = planner.warm_title(title.id, first_episode).await {
            tracing::debug!(title_id = %title.id, error = %e, "failed to warm prefetch plan for title");
            continue;
        }
        warmed += 1;
    }

    Ok(warmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_floor() {
        let config = CacheWarmerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.warm_interval, Duration::from_secs(300));
        assert_eq!(config.max_titles_per_cycle, 200);
    }
}
