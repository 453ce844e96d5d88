//! Candidate Pools (C2): four independently-ordered title pools, fanned out
//! concurrently and bounded by the base predicate every pool shares.

use chrono::Utc;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::db::{BasePredicate, TitleRepo};
use crate::error::Result;
use crate::metrics::CANDIDATE_POOL_DURATION;
use crate::models::{FeedSource, Title, UserPreferences};

/// A Title tagged with the pool that produced it. Kept separate from
/// `Card` — the feed source only becomes part of a Card after ranking picks
/// a winner for each deduplicated Title.
#[derive(Debug, Clone)]
pub struct PooledTitle {
    pub title: Title,
    pub source: FeedSource,
}

pub struct CandidatePools<'a> {
    repo: &'a TitleRepo,
    core: &'a CoreConfig,
}

impl<'a> CandidatePools<'a> {
    pub fn new(repo: &'a TitleRepo, core: &'a CoreConfig) -> Self {
        Self { repo, core }
    }

    fn split(&self, page_len: usize) -> (i64, i64, i64, i64) {
        let l = page_len as f64;
        let personalized = (l * self.core.pool_ratio_personalized).ceil() as i64;
        let trending = (l * self.core.pool_ratio_trending).ceil() as i64;
        let popular = (l * self.core.pool_ratio_popular).ceil() as i64;
        let fresh = (l * self.core.pool_ratio_fresh).ceil() as i64;
        (personalized.max(1), trending.max(1), popular.max(1), fresh.max(1))
    }

    /// Runs the four pools concurrently and tags every Title with its
    /// source. A genuine store error on any pool fails the whole fetch —
    /// the caller's deadline (`tokio::time::timeout` around this call) is
    /// the only mechanism that turns a slow pool into a partial result.
    pub async fn fetch_all(
        &self,
        preferences: &UserPreferences,
        exclude_title_ids: &[Uuid],
        page_len: usize,
    ) -> Result<Vec<PooledTitle>> {
        let (n_personalized, n_trending, n_popular, n_fresh) = self.split(page_len);
        let now = Utc::now();
        let trending_since = now - chrono::Duration::days(self.core.trending_window_days);
        let fresh_since = now - chrono::Duration::days(self.core.fresh_window_days);

        let predicate = BasePredicate {
            exclude_title_ids: exclude_title_ids.to_vec(),
            preferred_genres: preferences.preferred_genres.clone(),
            preferred_languages: preferences.preferred_languages.clone(),
        };
        let predicate_no_prefs = BasePredicate {
            exclude_title_ids: exclude_title_ids.to_vec(),
            preferred_genres: Vec::new(),
            preferred_languages: Vec::new(),
        };

        let fan_out_timer = CANDIDATE_POOL_DURATION.with_label_values(&["all"]).start_timer();
        let (personalized, trending, popular, fresh) = tokio::join!(
            self.repo.personalized(&predicate, n_personalized),
            self.repo
                .trending(&predicate_no_prefs, trending_since, n_trending),
            self.repo.popular(&predicate_no_prefs, n_popular),
            self.repo.fresh(&predicate_no_prefs, fresh_since, n_fresh),
        );
        fan_out_timer.observe_duration();

        let mut out = Vec::new();
        extend_tagged(&mut out, personalized?, FeedSource::Personalized);
        extend_tagged(&mut out, trending?, FeedSource::Trending);
        extend_tagged(&mut out, popular?, FeedSource::Popular);
        extend_tagged(&mut out, fresh?, FeedSource::Fresh);
        Ok(out)
    }
}

fn extend_tagged(out: &mut Vec<PooledTitle>, titles: Vec<Title>, source: FeedSource) {
    out.extend(titles.into_iter().map(|title| PooledTitle { title, source }));
}
