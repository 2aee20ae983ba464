//! Per-client fixed-window rate limiting across several tiers.
//!
//! Each key owns one window per configured tier. Windows start on first use
//! of the key (not on the wall-clock minute/hour), and a window covers
//! `[started_at, started_at + tier.window)`. An expired window is reset lazily
//! the next time the key is seen, or dropped entirely by `purge_expired`.

pub mod tier;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

pub use tier::{parse_tiers, RateLimitTier};

/// Identity a caller is rate limited under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix safe to put in logs without echoing the full credential.
    pub fn log_prefix(&self) -> String {
        self.0.chars().take(10).collect()
    }
}

/// What the transport knows about whoever sent the request.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    /// Credential that already passed authentication.
    pub credential: Option<String>,
    pub addr: Option<IpAddr>,
}

/// Derives the rate-limit key, preferring the authenticated credential over
/// the network address.
pub fn derive_key(caller: &Caller) -> RateLimitKey {
    match (&caller.credential, caller.addr) {
        (Some(credential), _) => RateLimitKey(format!("api_key:{credential}")),
        (None, Some(addr)) => RateLimitKey(format!("ip:{addr}")),
        (None, None) => RateLimitKey("ip:unknown".to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rate limit exceeded, retry after {retry_after:?}")]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct RateLimitWindow {
    count: u32,
    started_at: Instant,
}

impl RateLimitWindow {
    fn fresh(now: Instant) -> Self {
        Self {
            count: 0,
            started_at: now,
        }
    }

    fn resets_at(&self, tier: &RateLimitTier) -> Instant {
        self.started_at + tier.window
    }

    fn is_expired(&self, tier: &RateLimitTier, now: Instant) -> bool {
        now >= self.resets_at(tier)
    }
}

/// Process-wide rate-limit state. Created once at startup and shared through
/// `AppState` as an `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    tiers: Vec<RateLimitTier>,
    /// One entry per key; the vector is indexed like `tiers`.
    windows: DashMap<String, Vec<RateLimitWindow>>,
}

impl RateLimiter {
    pub fn new(tiers: Vec<RateLimitTier>) -> Self {
        Self {
            tiers,
            windows: DashMap::new(),
        }
    }

    pub fn tiers(&self) -> &[RateLimitTier] {
        &self.tiers
    }

    /// Counts one request against every tier of `key`.
    ///
    /// All tiers are incremented under the key's entry lock, so concurrent
    /// requests from the same key see a consistent count. Increments are kept
    /// even when the request is rejected.
    pub fn check_and_increment(&self, key: &RateLimitKey) -> Result<(), RateLimitExceeded> {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(key.as_str().to_owned())
            .or_insert_with(|| vec![RateLimitWindow::fresh(now); self.tiers.len()]);

        let mut retry_after: Option<Duration> = None;

        for (tier, window) in self.tiers.iter().zip(entry.iter_mut()) {
            if window.is_expired(tier, now) {
                *window = RateLimitWindow::fresh(now);
            }
            window.count = window.count.saturating_add(1);

            if window.count > tier.limit {
                let remaining = window.resets_at(tier).saturating_duration_since(now);
                retry_after = Some(retry_after.map_or(remaining, |r| r.max(remaining)));
                debug!(
                    "Tier {} exhausted for {} ({} requests)",
                    tier,
                    key.log_prefix(),
                    window.count
                );
            }
        }

        match retry_after {
            Some(retry_after) => Err(RateLimitExceeded { retry_after }),
            None => Ok(()),
        }
    }

    /// Drops keys whose windows have all expired. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, windows| {
            self.tiers
                .iter()
                .zip(windows.iter())
                .any(|(tier, window)| !window.is_expired(tier, now))
        });
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Spawns a task that purges expired windows every `every`.
    /// The caller owns the handle and aborts it at shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = limiter.purge_expired();
                if purged > 0 {
                    debug!(
                        "Purged {purged} expired rate-limit keys, {} still tracked",
                        limiter.tracked_keys()
                    );
                }
            }
        })
    }
}
