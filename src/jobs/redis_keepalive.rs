//! Redis Connection Health Check Background Job
//!
//! Periodically pings the cache's Redis backing store to keep connections
//! alive and surface a stale connection before an actual request hits it.
//! Connections can go idle long enough to trip a "broken pipe" on the next
//! real operation; this job exists purely to avoid that on the request path.

use std::time::Duration;
use tokio::time::sleep;

use crate::cache::Cache;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct RedisKeepaliveConfig {
    pub enabled: bool,
    pub check_interval: Duration,
}

impl Default for RedisKeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval: HEALTH_CHECK_INTERVAL,
        }
    }
}

/// Pings the cache on a fixed interval and logs consecutive failures with
/// escalating severity so an operator can tell a blip from an outage.
pub async fn start_redis_keepalive(cache: Cache, config: RedisKeepaliveConfig) {
    if !config.enabled {
        tracing::info!("Redis keepalive job disabled by configuration");
        return;
    }

    tracing::info!(
        interval_secs = config.check_interval.as_secs(),
        "starting Redis keepalive background job"
    );

    sleep(Duration::from_secs(10)).await;

    let mut consecutive_failures = 0u32;
    const MAX_CONSECUTIVE_FAILURES: u32 = 5;

    loop {
        if cache.ping().await {
            if consecutive_failures > 0 {
                tracing::info!(
                    previous_failures = consecutive_failures,
                    "Redis connection recovered"
                );
            }
            consecutive_failures = 0;
            tracing::debug!("Redis keepalive: OK");
        } else {
            consecutive_failures += 1;
            if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                tracing::error!(
                    consecutive_failures,
                    "Redis keepalive: CRITICAL - multiple consecutive failures"
                );
            } else {
                tracing::warn!(consecutive_failures, "Redis keepalive: ping failed");
            }
        }

        sleep(config.check_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_floor() {
        let config = RedisKeepaliveConfig::default();
        assert!(config.enabled);
        assert_eq!(config.check_interval, Duration::from_secs(60));
    }
}
