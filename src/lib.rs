pub mod analytics;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod services;

pub use analytics::Analytics;
pub use cache::{Cache, CacheConfig};
pub use config::Config;
pub use error::{AppError, Result};
