//! Ranking & Diversification (C3): merges the four candidate pools into one
//! ordered, deduplicated, paginated feed page with first episodes attached.

use std::collections::HashSet;

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::db::EpisodeRepo;
use crate::error::Result;
use crate::models::{Card, PrefetchPlan, Title, UserPreferences};
use crate::services::candidates::PooledTitle;

struct Scored {
    title: Title,
    source: crate::models::FeedSource,
    score: f64,
}

/// `score(T)` per the weighted formula: popularity/trending base, feed
/// priority/weight boosts, preference-match boosts, recency boosts,
/// completion rate, plus a uniform jitter term. Jitter is drawn fresh per
/// call so identical inputs still produce varying orderings once shuffled.
fn score(title: &Title, preferences: &UserPreferences, core: &CoreConfig, now: chrono::DateTime<Utc>) -> f64 {
    let mut s = core.weight_popularity * title.popularity_score
        + core.weight_trending * title.trending_score
        + core.weight_feed_priority * title.feed_priority as f64
        + core.weight_feed_weight * title.feed_weight;

    if title.matches_genres(&preferences.preferred_genres) {
        s += core.weight_genre_match;
    }
    if title.matches_languages(&preferences.preferred_languages) {
        s += core.weight_language_match;
    }

    match title.days_since_published(now) {
        Some(days) if days < 7 => s += core.weight_recency_recent,
        Some(days) if days < 30 => s += core.weight_recency_stale,
        _ => {}
    }

    s += core.weight_completion_rate * title.completion_rate;
    s += rand::thread_rng().gen_range(0.0..core.jitter_max);
    s
}

/// Fisher-Yates shuffle, applied after the descending score sort so
/// adjacent titles of similar score reorder between requests while the
/// overall quality tiering established by the sort survives.
fn fisher_yates<T>(items: &mut [T]) {
    let mut rng = rand::thread_rng();
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

pub struct Ranker<'a> {
    episodes: &'a EpisodeRepo,
    core: &'a CoreConfig,
}

impl<'a> Ranker<'a> {
    pub fn new(episodes: &'a EpisodeRepo, core: &'a CoreConfig) -> Self {
        Self { episodes, core }
    }

    pub async fn rank(
        &self,
        pooled: Vec<PooledTitle>,
        preferences: &UserPreferences,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Card>> {
        let now = Utc::now();

        // Step 1: dedup by Title id, first occurrence wins (pool
        // concatenation order is Personalized -> Trending -> Popular ->
        // Fresh, so earlier entries carry the "preferred" source tag).
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut scored = Vec::with_capacity(pooled.len());
        for PooledTitle { title, source } in pooled {
            if !seen.insert(title.id) {
                continue;
            }
            let s = score(&title, preferences, self.core, now);
            scored.push(Scored { title, source, score: s });
        }

        // Step 3a: sort descending by score.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        // Step 3b: shuffle after the sort to break repetition within a tier.
        fisher_yates(&mut scored);

        // Step 4: paginate.
        let page: Vec<Scored> = scored.into_iter().skip(offset).take(limit).collect();

        // Step 5: batch-attach first episode. A title with no resolvable
        // first episode drops its Card entirely rather than failing the
        // whole page (§7 partial-failure policy).
        let title_ids: Vec<Uuid> = page.iter().map(|s| s.title.id).collect();
        let mut first_episodes = self.episodes.first_published_per_title(&title_ids).await?;

        let cards = page
            .into_iter()
            .filter_map(|s| {
                let first_episode = first_episodes.remove(&s.title.id)?;
                Some(Card {
                    first_episode: Some(first_episode),
                    algorithm_score: s.score,
                    feed_source: s.source,
                    title: s.title,
                    prefetch: None::<PrefetchPlan>,
                })
            })
            .collect();
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fisher_yates_produces_varying_orders_across_calls() {
        let base: Vec<i32> = (0..20).collect();
        let mut saw_different_order = false;
        let first = {
            let mut v = base.clone();
            fisher_yates(&mut v);
            v
        };
        for _ in 0..20 {
            let mut v = base.clone();
            fisher_yates(&mut v);
            if v != first {
                saw_different_order = true;
                break;
            }
        }
        assert!(saw_different_order, "shuffle should not be deterministic across calls");
    }

    #[test]
    fn fisher_yates_preserves_the_element_set() {
        let mut v: Vec<i32> = (0..10).collect();
        let original: HashSet<i32> = v.iter().copied().collect();
        fisher_yates(&mut v);
        let shuffled: HashSet<i32> = v.iter().copied().collect();
        assert_eq!(original, shuffled);
    }

    fn bare_title(genres: Vec<&str>) -> Title {
        Title {
            id: Uuid::new_v4(),
            title: "Title".into(),
            description: String::new(),
            genres: genres.into_iter().map(String::from).collect(),
            languages: Vec::new(),
            kind: crate::models::TitleType::Movie,
            category: String::new(),
            age_rating: String::new(),
            published_at: None,
            status: crate::models::TitleStatus::Published,
            total_views: 0,
            total_likes: 0,
            total_shares: 0,
            average_rating: 0.0,
            total_ratings: 0,
            popularity_score: 1.0,
            trending_score: 0.0,
            completion_rate: 0.0,
            is_in_random_feed: true,
            feed_priority: 5,
            feed_weight: 1.0,
            is_featured: false,
            is_editors_pick: false,
            geographic_restrictions: Vec::new(),
            episode_ids: Vec::new(),
        }
    }

    #[test]
    fn score_rewards_genre_match_over_no_match() {
        let core = CoreConfig::default();
        let now = Utc::now();
        let matching = bare_title(vec!["drama"]);
        let non_matching = bare_title(vec!["comedy"]);
        let preferences = UserPreferences {
            preferred_genres: vec!["drama".to_string()],
            ..Default::default()
        };

        // Jitter makes a single draw noisy; compare floors after removing it.
        let matched_floor = score(&matching, &preferences, &core, now) - core.jitter_max;
        let unmatched_ceiling = score(&non_matching, &preferences, &core, now);
        assert!(
            matched_floor > unmatched_ceiling,
            "genre-matching title should outscore a non-matching one even after jitter"
        );
    }
}
