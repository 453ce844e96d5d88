//! Background jobs spawned once at startup alongside the HTTP server.

pub mod cache_warmer;
pub mod redis_keepalive;

pub use cache_warmer::{start_cache_warmer, CacheWarmerConfig};
pub use redis_keepalive::{start_redis_keepalive, RedisKeepaliveConfig};
