//! Scoped request throttling.
//!
//! A [`ScopedRateThrottle`] limits one named action (e.g. `review-create`) to
//! `N` requests per period per client, using a sliding window of request
//! timestamps kept by a [`ThrottleBackend`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// `N` requests per `period`, parsed from strings like `2/min` or `100/day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    pub num_requests: usize,
    pub period: Duration,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RateParseError {
    #[error("rate must look like `<count>/<period>`, got `{0}`")]
    Format(String),

    #[error("invalid request count `{0}`")]
    Count(String),

    #[error("unknown period `{0}` (expected s, m, h or d)")]
    Period(String),
}

impl core::str::FromStr for Rate {
    type Err = RateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, period) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| RateParseError::Format(s.to_string()))?;

        let num_requests = count
            .trim()
            .parse::<usize>()
            .map_err(|_| RateParseError::Count(count.to_string()))?;

        // Only the first letter matters: `m`, `min` and `minute` are the same.
        let seconds = match period.trim().chars().next() {
            Some('s') => 1,
            Some('m') => 60,
            Some('h') => 60 * 60,
            Some('d') => 24 * 60 * 60,
            _ => return Err(RateParseError::Period(period.to_string())),
        };

        Ok(Self {
            num_requests,
            period: Duration::from_secs(seconds),
        })
    }
}

impl core::fmt::Display for Rate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}s", self.num_requests, self.period.as_secs())
    }
}

/// Outcome of a throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allow,
    /// Rejected; the oldest recorded request leaves the window after `retry_after`.
    Deny { retry_after: Duration },
}

impl ThrottleDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Storage for request histories.
#[async_trait]
pub trait ThrottleBackend: Send + Sync {
    /// Record a request for `key` at `now` unless the window is already full.
    async fn hit(&self, key: &str, rate: Rate, now: Instant) -> ThrottleDecision;
}

/// Minimum spacing between sweeps of expired keys.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Request times for one key, newest first, with the window they were recorded under.
#[derive(Debug)]
struct KeyHistory {
    period: Duration,
    hits: VecDeque<Instant>,
}

impl KeyHistory {
    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.hits.back() {
            if now.duration_since(*oldest) >= self.period {
                self.hits.pop_back();
            } else {
                break;
            }
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.hits
            .front()
            .is_none_or(|newest| now.duration_since(*newest) >= self.period)
    }
}

#[derive(Debug, Default)]
struct HistoryState {
    keys: HashMap<String, KeyHistory>,
    last_sweep: Option<Instant>,
}

impl HistoryState {
    /// Drop every key whose whole window has elapsed, at most once per [`SWEEP_INTERVAL`].
    fn sweep(&mut self, now: Instant) {
        let due = self
            .last_sweep
            .is_none_or(|last| now.duration_since(last) >= SWEEP_INTERVAL);
        if due {
            self.keys.retain(|_, history| !history.is_expired(now));
            self.last_sweep = Some(now);
        }
    }
}

/// Process-local sliding-window history.
#[derive(Debug, Default)]
pub struct InMemoryThrottleBackend {
    state: Mutex<HistoryState>,
}

impl InMemoryThrottleBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.state.lock().await.keys.len()
    }
}

#[async_trait]
impl ThrottleBackend for InMemoryThrottleBackend {
    async fn hit(&self, key: &str, rate: Rate, now: Instant) -> ThrottleDecision {
        let mut state = self.state.lock().await;
        state.sweep(now);

        let history = state.keys.entry(key.to_string()).or_insert_with(|| KeyHistory {
            period: rate.period,
            hits: VecDeque::new(),
        });
        history.period = rate.period;
        history.prune(now);

        if history.hits.len() >= rate.num_requests {
            let retry_after = history
                .hits
                .back()
                .map(|oldest| rate.period.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(rate.period);
            if history.hits.is_empty() {
                state.keys.remove(key);
            }
            return ThrottleDecision::Deny { retry_after };
        }

        history.hits.push_front(now);
        ThrottleDecision::Allow
    }
}

/// Rate limit bound to one named scope.
#[derive(Clone)]
pub struct ScopedRateThrottle {
    scope: String,
    rate: Rate,
    backend: Arc<dyn ThrottleBackend>,
}

impl ScopedRateThrottle {
    pub fn new(scope: impl Into<String>, rate: Rate, backend: Arc<dyn ThrottleBackend>) -> Self {
        Self {
            scope: scope.into(),
            rate,
            backend,
        }
    }

    /// Throttle with its own in-memory history.
    pub fn in_memory(scope: impl Into<String>, rate: Rate) -> Self {
        Self::new(scope, rate, Arc::new(InMemoryThrottleBackend::new()))
    }

    /// Count a request from `ident` (user id or client address) against the scope.
    pub async fn check(&self, ident: &str) -> ThrottleDecision {
        let key = format!("throttle_{}_{}", self.scope, ident);
        let decision = self.backend.hit(&key, self.rate, Instant::now()).await;
        if let ThrottleDecision::Deny { retry_after } = decision {
            tracing::warn!(
                scope = %self.scope,
                ident,
                retry_after_secs = retry_after.as_secs(),
                "request throttled"
            );
        }
        decision
    }
}

impl core::fmt::Debug for ScopedRateThrottle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScopedRateThrottle")
            .field("scope", &self.scope)
            .field("rate", &self.rate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(s: &str) -> Rate {
        s.parse().unwrap()
    }

    #[test]
    fn parses_rates_by_first_letter_of_period() {
        assert_eq!(rate("2/min"), Rate { num_requests: 2, period: Duration::from_secs(60) });
        assert_eq!(rate("5/s").period, Duration::from_secs(1));
        assert_eq!(rate("10/hour").period, Duration::from_secs(3600));
        assert_eq!(rate(" 100 / day ").num_requests, 100);
    }

    #[test]
    fn rejects_malformed_rates() {
        assert!(matches!("2".parse::<Rate>(), Err(RateParseError::Format(_))));
        assert!(matches!("x/min".parse::<Rate>(), Err(RateParseError::Count(_))));
        assert!(matches!("2/week".parse::<Rate>(), Err(RateParseError::Period(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn third_request_within_a_minute_is_denied() {
        let throttle = ScopedRateThrottle::in_memory("review-create", rate("2/min"));

        assert!(throttle.check("alice").await.is_allowed());
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(throttle.check("alice").await.is_allowed());

        match throttle.check("alice").await {
            ThrottleDecision::Deny { retry_after } => assert_eq!(retry_after, Duration::from_secs(50)),
            other => panic!("expected deny, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides_as_old_requests_expire() {
        let throttle = ScopedRateThrottle::in_memory("review-create", rate("2/min"));

        throttle.check("alice").await;
        tokio::time::advance(Duration::from_secs(30)).await;
        throttle.check("alice").await;

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(
            throttle.check("alice").await,
            ThrottleDecision::Deny { retry_after: Duration::from_secs(10) }
        );

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(throttle.check("alice").await.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn clients_and_scopes_are_counted_separately() {
        let backend: Arc<dyn ThrottleBackend> = Arc::new(InMemoryThrottleBackend::new());
        let reviews = ScopedRateThrottle::new("review-create", rate("1/min"), backend.clone());
        let other = ScopedRateThrottle::new("other", rate("1/min"), backend);

        assert!(reviews.check("alice").await.is_allowed());
        assert!(reviews.check("bob").await.is_allowed());
        assert!(other.check("alice").await.is_allowed());
        assert!(!reviews.check("alice").await.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_rate_denies_everything() {
        let throttle = ScopedRateThrottle::in_memory("review-create", rate("0/min"));
        assert!(!throttle.check("alice").await.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_client_histories_are_evicted() {
        let backend = InMemoryThrottleBackend::new();
        let limit = rate("2/min");

        for user in 0..1000 {
            let key = format!("throttle_review-create_user{user}");
            assert!(backend.hit(&key, limit, Instant::now()).await.is_allowed());
        }
        assert_eq!(backend.tracked_keys().await, 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(backend.hit("throttle_review-create_late", limit, Instant::now()).await.is_allowed());
        assert_eq!(backend.tracked_keys().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn live_histories_survive_a_sweep() {
        let backend = InMemoryThrottleBackend::new();
        let short = rate("1/min");
        let long = rate("1/hour");

        assert!(backend.hit("short", short, Instant::now()).await.is_allowed());
        assert!(backend.hit("long", long, Instant::now()).await.is_allowed());

        tokio::time::advance(Duration::from_secs(120)).await;
        assert!(backend.hit("other", short, Instant::now()).await.is_allowed());
        assert_eq!(backend.tracked_keys().await, 2);
        assert!(!backend.hit("long", long, Instant::now()).await.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn denied_client_without_history_is_not_tracked() {
        let backend = InMemoryThrottleBackend::new();
        assert!(!backend.hit("alice", rate("0/min"), Instant::now()).await.is_allowed());
        assert_eq!(backend.tracked_keys().await, 0);
    }
}
