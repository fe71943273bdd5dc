//! In-memory rate limiting for AI lead analysis.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<Uuid, VecDeque<Instant>>`.
//! Two limits enforced:
//! - Per-user: 5 analysis requests/min
//! - Global: 20 gateway calls/min
//!
//! Both windows are configurable through `RATE_LIMIT_*` env vars. The
//! limiter is process-local; running several replicas multiplies the budget.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use uuid::Uuid;

const DEFAULT_PER_USER_LIMIT: usize = 5;
const DEFAULT_PER_USER_WINDOW_SECS: u64 = 60;

const DEFAULT_GLOBAL_LIMIT: usize = 20;
const DEFAULT_GLOBAL_WINDOW_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_user_limit: usize,
    pub per_user_window: Duration,
    pub global_limit: usize,
    pub global_window: Duration,
}

impl RateLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let per_user_window_secs = env_parse("RATE_LIMIT_PER_USER_WINDOW_SECS", DEFAULT_PER_USER_WINDOW_SECS);
        let global_window_secs = env_parse("RATE_LIMIT_GLOBAL_WINDOW_SECS", DEFAULT_GLOBAL_WINDOW_SECS);

        Self {
            per_user_limit: env_parse("RATE_LIMIT_PER_USER", DEFAULT_PER_USER_LIMIT),
            per_user_window: Duration::from_secs(per_user_window_secs),
            global_limit: env_parse("RATE_LIMIT_GLOBAL", DEFAULT_GLOBAL_LIMIT),
            global_window: Duration::from_secs(global_window_secs),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_user_limit: DEFAULT_PER_USER_LIMIT,
            per_user_window: Duration::from_secs(DEFAULT_PER_USER_WINDOW_SECS),
            global_limit: DEFAULT_GLOBAL_LIMIT,
            global_window: Duration::from_secs(DEFAULT_GLOBAL_WINDOW_SECS),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum RateLimitError {
    #[error("per-user rate limit exceeded (max {limit} requests/{window_secs}s)")]
    PerUserExceeded { limit: usize, window_secs: u64 },
    #[error("global rate limit exceeded (max {limit} requests/{window_secs}s)")]
    GlobalExceeded { limit: usize, window_secs: u64 },
}

impl crate::frame::ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        "E_RATE_LIMITED"
    }

    fn retryable(&self) -> bool {
        true
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: std::sync::Arc<Mutex<RateLimiterInner>>,
    config: RateLimitConfig,
}

struct RateLimiterInner {
    /// Per-user request timestamps.
    user_requests: HashMap<Uuid, VecDeque<Instant>>,
    /// Global request timestamps.
    global_requests: VecDeque<Instant>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::from_env())
    }

    #[must_use]
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            inner: std::sync::Arc::new(Mutex::new(RateLimiterInner {
                user_requests: HashMap::new(),
                global_requests: VecDeque::new(),
            })),
            config,
        }
    }

    /// Check both per-user and global rate limits, then record the request.
    ///
    /// # Errors
    ///
    /// Returns which window is exhausted. Nothing is recorded on rejection.
    pub fn check_and_record(&self, user_id: Uuid) -> Result<(), RateLimitError> {
        self.check_and_record_at(user_id, Instant::now())
    }

    fn check_and_record_at(&self, user_id: Uuid, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let cfg = self.config;

        prune_window(&mut inner.global_requests, now, cfg.global_window);
        if inner.global_requests.len() >= cfg.global_limit {
            return Err(RateLimitError::GlobalExceeded {
                limit: cfg.global_limit,
                window_secs: cfg.global_window.as_secs(),
            });
        }

        let user_deque = inner.user_requests.entry(user_id).or_default();
        prune_window(user_deque, now, cfg.per_user_window);
        if user_deque.len() >= cfg.per_user_limit {
            return Err(RateLimitError::PerUserExceeded {
                limit: cfg.per_user_limit,
                window_secs: cfg.per_user_window.as_secs(),
            });
        }

        user_deque.push_back(now);
        inner.global_requests.push_back(now);

        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
