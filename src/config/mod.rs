//! Process-wide configuration, loaded once at startup.
//!
//! Singleton services (cache, storage, feed orchestration) take a `Config`
//! snapshot by constructor injection rather than reading the environment at
//! call time — see the design note on singleton services in the spec.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub core: CoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub cache_warmer_enabled: bool,
}

/// Constants the Core itself consumes, per the spec's configuration section.
/// These are deliberately *not* Rust constants — every field is
/// environment-overridable so cache/prefetch/scoring tuning can change
/// without a rebuild, per the "scoring weights are configuration, not
/// constants" design note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub cache_ttl_short_secs: u64,
    pub cache_ttl_medium_secs: u64,
    pub cache_ttl_long_secs: u64,
    pub cache_ttl_very_long_secs: u64,

    pub feed_cache_ttl_authenticated_secs: u64,
    pub feed_cache_ttl_anonymous_secs: u64,
    pub search_cache_ttl_secs: u64,

    /// Percentage-watched threshold (0..100 scale) at which a WatchRecord
    /// latches to completed.
    pub completion_threshold: f64,
    /// Continue-watching band, exclusive, on the same 0..100 scale as
    /// `percentageWatched`.
    pub continue_watching_low: f64,
    pub continue_watching_high: f64,

    pub prefetch_default_cards: usize,
    pub prefetch_episodes_per_card: usize,
    pub prefetch_quality: String,
    pub stream_quality: String,
    pub prefetch_title_cache_ttl_secs: u64,
    pub prefetch_user_cache_ttl_secs: u64,

    pub max_feed_page_size: usize,
    pub max_search_page_size: usize,

    pub pool_ratio_personalized: f64,
    pub pool_ratio_trending: f64,
    pub pool_ratio_popular: f64,
    pub pool_ratio_fresh: f64,

    pub trending_window_days: i64,
    pub fresh_window_days: i64,

    pub weight_popularity: f64,
    pub weight_trending: f64,
    pub weight_feed_priority: f64,
    pub weight_feed_weight: f64,
    pub weight_genre_match: f64,
    pub weight_language_match: f64,
    pub weight_recency_recent: f64,
    pub weight_recency_stale: f64,
    pub weight_completion_rate: f64,
    pub jitter_max: f64,

    pub cache_namespace: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            cache_ttl_short_secs: 300,
            cache_ttl_medium_secs: 1800,
            cache_ttl_long_secs: 3600,
            cache_ttl_very_long_secs: 7200,
            feed_cache_ttl_authenticated_secs: 900,
            feed_cache_ttl_anonymous_secs: 1800,
            search_cache_ttl_secs: 1800,
            completion_threshold: 80.0,
            continue_watching_low: 5.0,
            continue_watching_high: 80.0,
            prefetch_default_cards: 7,
            prefetch_episodes_per_card: 5,
            prefetch_quality: "480p".to_string(),
            stream_quality: "720p".to_string(),
            prefetch_title_cache_ttl_secs: 1200,
            prefetch_user_cache_ttl_secs: 600,
            max_feed_page_size: 100,
            max_search_page_size: 100,
            pool_ratio_personalized: 0.4,
            pool_ratio_trending: 0.3,
            pool_ratio_popular: 0.2,
            pool_ratio_fresh: 0.1,
            trending_window_days: 7,
            fresh_window_days: 30,
            weight_popularity: 0.3,
            weight_trending: 0.2,
            weight_feed_priority: 10.0,
            weight_feed_weight: 5.0,
            weight_genre_match: 20.0,
            weight_language_match: 15.0,
            weight_recency_recent: 10.0,
            weight_recency_stale: 5.0,
            weight_completion_rate: 0.1,
            jitter_max: 10.0,
            cache_namespace: "feedcore".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: std::env::var("APP_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
                log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")?,
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
            },
            redis: RedisConfig {
                url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
                cache_warmer_enabled: std::env::var("CACHE_WARMER_ENABLED")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .unwrap_or(true),
            },
            core: CoreConfig::from_env(),
        })
    }
}

impl CoreConfig {
    fn from_env() -> Self {
        let defaults = CoreConfig::default();
        CoreConfig {
            cache_ttl_short_secs: env_or("CACHE_TTL_SHORT_SECS", defaults.cache_ttl_short_secs),
            cache_ttl_medium_secs: env_or("CACHE_TTL_MEDIUM_SECS", defaults.cache_ttl_medium_secs),
            cache_ttl_long_secs: env_or("CACHE_TTL_LONG_SECS", defaults.cache_ttl_long_secs),
            cache_ttl_very_long_secs: env_or(
                "CACHE_TTL_VERY_LONG_SECS",
                defaults.cache_ttl_very_long_secs,
            ),
            feed_cache_ttl_authenticated_secs: env_or(
                "FEED_CACHE_TTL_AUTH_SECS",
                defaults.feed_cache_ttl_authenticated_secs,
            ),
            feed_cache_ttl_anonymous_secs: env_or(
                "FEED_CACHE_TTL_ANON_SECS",
                defaults.feed_cache_ttl_anonymous_secs,
            ),
            search_cache_ttl_secs: env_or("SEARCH_CACHE_TTL_SECS", defaults.search_cache_ttl_secs),
            completion_threshold: env_or("COMPLETION_THRESHOLD", defaults.completion_threshold),
            continue_watching_low: env_or("CONTINUE_WATCHING_LOW", defaults.continue_watching_low),
            continue_watching_high: env_or(
                "CONTINUE_WATCHING_HIGH",
                defaults.continue_watching_high,
            ),
            prefetch_default_cards: env_or(
                "PREFETCH_DEFAULT_CARDS",
                defaults.prefetch_default_cards,
            ),
            prefetch_episodes_per_card: env_or(
                "PREFETCH_EPISODES_PER_CARD",
                defaults.prefetch_episodes_per_card,
            ),
            prefetch_quality: std::env::var("PREFETCH_QUALITY")
                .unwrap_or(defaults.prefetch_quality),
            stream_quality: std::env::var("STREAM_QUALITY").unwrap_or(defaults.stream_quality),
            prefetch_title_cache_ttl_secs: env_or(
                "PREFETCH_TITLE_CACHE_TTL_SECS",
                defaults.prefetch_title_cache_ttl_secs,
            ),
            prefetch_user_cache_ttl_secs: env_or(
                "PREFETCH_USER_CACHE_TTL_SECS",
                defaults.prefetch_user_cache_ttl_secs,
            ),
            max_feed_page_size: env_or("MAX_FEED_PAGE_SIZE", defaults.max_feed_page_size),
            max_search_page_size: env_or("MAX_SEARCH_PAGE_SIZE", defaults.max_search_page_size),
            pool_ratio_personalized: defaults.pool_ratio_personalized,
            pool_ratio_trending: defaults.pool_ratio_trending,
            pool_ratio_popular: defaults.pool_ratio_popular,
            pool_ratio_fresh: defaults.pool_ratio_fresh,
            trending_window_days: env_or("TRENDING_WINDOW_DAYS", defaults.trending_window_days),
            fresh_window_days: env_or("FRESH_WINDOW_DAYS", defaults.fresh_window_days),
            weight_popularity: defaults.weight_popularity,
            weight_trending: defaults.weight_trending,
            weight_feed_priority: defaults.weight_feed_priority,
            weight_feed_weight: defaults.weight_feed_weight,
            weight_genre_match: defaults.weight_genre_match,
            weight_language_match: defaults.weight_language_match,
            weight_recency_recent: defaults.weight_recency_recent,
            weight_recency_stale: defaults.weight_recency_stale,
            weight_completion_rate: defaults.weight_completion_rate,
            jitter_max: defaults.jitter_max,
            cache_namespace: std::env::var("CACHE_NAMESPACE").unwrap_or(defaults.cache_namespace),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
