//! Explicit record types for every entity in the data model.
//!
//! The source system's distinction between in-memory objects and document
//! store records collapses here into one Rust type per entity, persisted via
//! `sqlx` against Postgres tables of the same name (pluralized, snake_case).

mod card;
mod episode;
mod title;
mod user;
mod watch_record;

pub use card::{Card, FeedSource, PrefetchEpisode, PrefetchPlan};
pub use episode::{Episode, EpisodeStatus, QualityVariant, StreamingOptions};
pub use title::{Title, TitleAnalytics, TitleFeedMeta, TitleStatus, TitleType};
pub use user::{DataUsage, User, UserAnalytics, UserEngagement, UserPreferences};
pub use watch_record::{SessionInfo, WatchEngagement, WatchRecord, WatchStatus};
