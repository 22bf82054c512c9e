//! Bounded availability polling with configurable backoff and jitter.
//!
//! [`wait_until`] is the one waiting primitive used by every service call
//! site: it re-checks a probe on a poll schedule until the probe succeeds or
//! a monotonic deadline passes.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Growth of the interval between availability probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base (constant)
    #[default]
    Constant,
    /// delay = base * (attempt + 1)
    Linear,
    /// delay = base * 2^attempt
    Exponential,
}

/// Randomization applied on top of the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

fn default_interval_ms() -> u64 {
    200
}

fn default_max_interval_ms() -> u64 {
    1000
}

/// Poll schedule for availability checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Base delay between probes in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Cap on a single delay in milliseconds.
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    /// Backoff strategy.
    #[serde(default)]
    pub backoff: BackoffStrategy,
    /// Jitter strategy.
    #[serde(default)]
    pub jitter: JitterStrategy,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            backoff: BackoffStrategy::Constant,
            jitter: JitterStrategy::None,
        }
    }
}

impl PollConfig {
    /// Creates a new poll config with the default 200 ms constant interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base interval.
    #[must_use]
    pub fn with_interval_ms(mut self, interval: u64) -> Self {
        self.interval_ms = interval;
        self
    }

    /// Sets the interval cap.
    #[must_use]
    pub fn with_max_interval_ms(mut self, interval: u64) -> Self {
        self.max_interval_ms = interval;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Delay to sleep after the `attempt`-th failed probe (0-indexed).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.interval_ms;
        let max = self.max_interval_ms.max(base);

        let delay = match self.backoff {
            BackoffStrategy::Constant => base,
            BackoffStrategy::Linear => base.saturating_mul(u64::from(attempt) + 1),
            BackoffStrategy::Exponential => base.saturating_mul(2u64.saturating_pow(attempt)),
        }
        .min(max);

        let jittered = match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };

        Duration::from_millis(jittered)
    }
}

/// Polls `probe` until it returns true or `timeout` elapses.
///
/// The first probe runs immediately. Between probes the task sleeps for the
/// scheduled delay, clamped so it never sleeps past the deadline. Returns
/// `true` iff a probe succeeded strictly before the deadline.
///
/// A timeout too large to add to the current instant has no deadline; the
/// probe is retried until it succeeds.
pub async fn wait_until<F, Fut>(mut probe: F, timeout: Duration, poll: &PollConfig) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now().checked_add(timeout);
    let mut attempt: u32 = 0;

    loop {
        if probe().await {
            return timeout.is_zero() || deadline.map_or(true, |d| Instant::now() < d);
        }

        // Zero-length sleeps would spin.
        let mut delay = poll.delay_for(attempt).max(Duration::from_millis(1));
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            delay = delay.min(deadline - now);
        }
        tracing::debug!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Waiting before next availability probe"
        );
        tokio::time::sleep(delay).await;
        attempt = attempt.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_defaults() {
        let config = PollConfig::default();
        assert_eq!(config.interval_ms, 200);
        assert_eq!(config.backoff, BackoffStrategy::Constant);
        assert_eq!(config.jitter, JitterStrategy::None);
        assert_eq!(config.delay_for(0), Duration::from_millis(200));
        assert_eq!(config.delay_for(7), Duration::from_millis(200));
    }

    #[test]
    fn test_linear_and_exponential() {
        let linear = PollConfig::new()
            .with_interval_ms(100)
            .with_max_interval_ms(10_000)
            .with_backoff(BackoffStrategy::Linear);
        assert_eq!(linear.delay_for(2), Duration::from_millis(300));

        let exp = PollConfig::new()
            .with_interval_ms(100)
            .with_max_interval_ms(10_000)
            .with_backoff(BackoffStrategy::Exponential);
        assert_eq!(exp.delay_for(0), Duration::from_millis(100));
        assert_eq!(exp.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_capped() {
        let config = PollConfig::new()
            .with_interval_ms(1000)
            .with_max_interval_ms(5000)
            .with_backoff(BackoffStrategy::Exponential);
        assert_eq!(config.delay_for(10), Duration::from_millis(5000));
    }

    #[test]
    fn test_full_jitter_bounded() {
        let config = PollConfig::new()
            .with_interval_ms(100)
            .with_jitter(JitterStrategy::Full);
        for _ in 0..20 {
            assert!(config.delay_for(0) <= Duration::from_millis(100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediately_available() {
        let ready = wait_until(|| async { true }, Duration::from_secs(1), &PollConfig::new()).await;
        assert!(ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_available_times_out() {
        let probes = AtomicU32::new(0);
        let start = Instant::now();

        let ready = wait_until(
            || {
                probes.fetch_add(1, Ordering::SeqCst);
                async { false }
            },
            Duration::from_secs(1),
            &PollConfig::new(),
        )
        .await;

        assert!(!ready);
        assert!(start.elapsed() >= Duration::from_secs(1));
        // probes at 0, 200, 400, 600, 800, 1000 ms
        assert_eq!(probes.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_available_before_deadline() {
        let probes = AtomicU32::new(0);

        let ready = wait_until(
            || {
                let n = probes.fetch_add(1, Ordering::SeqCst);
                async move { n >= 3 }
            },
            Duration::from_secs(1),
            &PollConfig::new(),
        )
        .await;

        assert!(ready);
        assert_eq!(probes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_available_at_deadline_is_timeout() {
        let probes = AtomicU32::new(0);

        // The sixth probe lands at exactly 1000 ms.
        let ready = wait_until(
            || {
                let n = probes.fetch_add(1, Ordering::SeqCst);
                async move { n >= 5 }
            },
            Duration::from_secs(1),
            &PollConfig::new(),
        )
        .await;

        assert!(!ready);
        assert_eq!(probes.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_timeout_does_not_panic() {
        let ready = wait_until(|| async { true }, Duration::MAX, &PollConfig::new()).await;
        assert!(ready);

        let probes = AtomicU32::new(0);
        let ready = wait_until(
            || {
                let n = probes.fetch_add(1, Ordering::SeqCst);
                async move { n >= 2 }
            },
            Duration::MAX,
            &PollConfig::new(),
        )
        .await;

        assert!(ready);
        assert_eq!(probes.load(Ordering::SeqCst), 3);
    }
}
