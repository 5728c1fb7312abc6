//! Governance Gatekeeper (C1): robots.txt compliance and a distributed
//! per-domain rate limiter. No outbound HTTP or browser fetch anywhere in
//! this system bypasses this gate (NewsAgent §4.1 invariant i).
//!
//! The rate limiter is a distributed compare-and-set, not an in-process
//! token bucket: the only primitive that is safe across multiple worker
//! processes sharing one domain is a store supporting atomic
//! create-if-absent-with-TTL (NewsAgent §9). That store is Redis here.

use std::time::Duration;

use redis::AsyncCommands;
use texting_robots::Robot;
use tracing::{debug, warn};
use url::Url;

use crate::errors::GovernanceError;
use crate::store::Store;

const ROBOTS_CACHE_TTL_SECS: i64 = 86_400;
const DELAY_CACHE_TTL_SECS: i64 = 300;

pub struct GovernanceGatekeeper {
    redis: redis::aio::ConnectionManager,
    store: Store,
    user_agent: String,
    default_delay_seconds: i64,
}

impl GovernanceGatekeeper {
    pub async fn connect(
        redis_url: &str,
        store: Store,
        user_agent: String,
        default_delay_seconds: i64,
    ) -> Result<Self, GovernanceError> {
        let client = redis::Client::open(redis_url)?;
        let redis = client.get_connection_manager().await?;
        Ok(Self {
            redis,
            store,
            user_agent,
            default_delay_seconds,
        })
    }

    fn domain(url: &str) -> Result<String, GovernanceError> {
        let parsed = Url::parse(url).map_err(|_| GovernanceError::BadUrl(url.to_string()))?;
        parsed
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| GovernanceError::BadUrl(url.to_string()))
    }

    /// Resolves robots.txt compliance for `url`, consulting a 24h-TTL
    /// cached boolean decision keyed by domain. On fetch or parse failure,
    /// default-allow (NewsAgent §4.1).
    pub async fn can_fetch(&mut self, url: &str) -> Result<bool, GovernanceError> {
        let domain = Self::domain(url)?;
        let robots_key = format!("robots_cache:{domain}");

        let cached: Option<String> = self.redis.get(&robots_key).await?;
        if let Some(v) = cached {
            return Ok(v == "1");
        }

        let parsed = Url::parse(url).map_err(|_| GovernanceError::BadUrl(url.to_string()))?;
        let robots_url = format!("{}://{}/robots.txt", parsed.scheme(), domain);

        let is_allowed = match fetch_and_evaluate(&robots_url, &self.user_agent, url).await {
            Ok(allowed) => allowed,
            Err(e) => {
                debug!("robots.txt fetch failed for {domain}, defaulting to allow: {e}");
                true
            }
        };

        let _: () = self
            .redis
            .set_ex(&robots_key, if is_allowed { "1" } else { "0" }, ROBOTS_CACHE_TTL_SECS as u64)
            .await?;

        Ok(is_allowed)
    }

    async fn dynamic_delay(&mut self, domain: &str) -> i64 {
        let cache_key = format!("config:delay:{domain}");

        if let Ok(Some(cached)) = self.redis.get::<_, Option<String>>(&cache_key).await {
            if let Ok(parsed) = cached.parse::<i64>() {
                return parsed;
            }
        }

        let delay = match self.store.delay_seconds_for_domain(domain).await {
            Ok(Some(d)) => d,
            Ok(None) => self.default_delay_seconds,
            Err(e) => {
                warn!("error fetching delay config for {domain}: {e}");
                self.default_delay_seconds
            }
        };

        let _: Result<(), _> = self
            .redis
            .set_ex(&cache_key, delay, DELAY_CACHE_TTL_SECS as u64)
            .await;

        delay
    }

    /// Blocks until a rate-limit slot for `url`'s domain is free, then
    /// atomically reserves the next one. Implemented as a compare-and-set
    /// lock with a TTL equal to the resolved per-domain delay; losers poll
    /// the lock's remaining TTL rather than busy-waiting (NewsAgent §4.1).
    pub async fn wait_for_slot(&mut self, url: &str) {
        let domain = match Self::domain(url) {
            Ok(d) => d,
            Err(_) => return,
        };
        let delay_seconds = self.dynamic_delay(&domain).await;
        let lock_key = format!("rate_limit:{domain}");
        let ttl_ms = (delay_seconds.max(0) as u64) * 1000;

        loop {
            let acquired: bool = redis::cmd("SET")
                .arg(&lock_key)
                .arg("locked")
                .arg("NX")
                .arg("PX")
                .arg(ttl_ms)
                .query_async::<Option<String>>(&mut self.redis)
                .await
                .map(|v| v.is_some())
                .unwrap_or(false);

            if acquired {
                debug!("rate limit acquired for {domain} (delay {delay_seconds}s)");
                return;
            }

            let pttl: i64 = self.redis.pttl(&lock_key).await.unwrap_or(-1);
            if pttl > 0 {
                tokio::time::sleep(Duration::from_millis(pttl as u64) + Duration::from_millis(100))
                    .await;
            } else {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

async fn fetch_and_evaluate(
    robots_url: &str,
    user_agent: &str,
    url: &str,
) -> anyhow::Result<bool> {
    let body = reqwest::get(robots_url).await?.text().await?;
    let robot = Robot::new(user_agent, body.as_bytes())
        .map_err(|e| anyhow::anyhow!("failed to parse robots.txt: {e}"))?;
    Ok(robot.allowed(url))
}
