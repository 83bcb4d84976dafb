//! Per-host request spacing.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Spaces out requests to the same host by at least `min_delay`.
///
/// Each caller reserves the next free slot for its host before sleeping, so
/// a burst of concurrent metadata fetches is spread out instead of all
/// waking at once.
pub struct RateLimiter {
    min_delay: Duration,
    next_slot: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            next_slot: DashMap::new(),
        }
    }

    /// Wait until this caller's slot for `host` comes up.
    pub async fn wait(&self, host: &str) {
        if self.min_delay.is_zero() {
            return;
        }

        let now = Instant::now();
        let slot = {
            let mut next = self.next_slot.entry(host.to_string()).or_insert(now);
            let slot = (*next).max(now);
            *next = slot + self.min_delay;
            slot
        };

        if slot > now {
            tracing::trace!(host, delay_ms = (slot - now).as_millis() as u64, "rate limited");
            sleep_until(slot).await;
        }
    }

    /// Number of hosts seen so far.
    pub fn tracked_hosts(&self) -> usize {
        self.next_slot.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_delay_does_not_track() {
        let limiter = RateLimiter::default();
        limiter.wait("world.openfoodfacts.org").await;
        assert_eq!(limiter.tracked_hosts(), 0);
    }

    #[tokio::test]
    async fn test_same_host_is_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(30));
        let start = std::time::Instant::now();
        limiter.wait("a.example").await;
        limiter.wait("a.example").await;
        limiter.wait("a.example").await;
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_hosts_are_independent() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        let start = std::time::Instant::now();
        limiter.wait("a.example").await;
        limiter.wait("b.example").await;
        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(limiter.tracked_hosts(), 2);
    }
}
