//! Fixed-window rate limiting for expensive endpoints.
//!
//! State is process-local and resets on restart; limits are not shared across
//! horizontally-scaled instances. The map is guarded by a mutex so that
//! concurrent requests cannot both observe `count == max_requests` and both be
//! admitted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Source of the current time in unix milliseconds. Injectable so tests can
/// drive the window boundary directly.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A `{window, max_requests}` pair for one endpoint class.
#[derive(Clone, Copy, Debug)]
pub struct Policy {
    pub window: Duration,
    pub max_requests: u32,
}

/// Per-endpoint policies. Stricter for uploads and authentication, looser
/// for reads.
pub mod policies {
    #![allow(dead_code)] // The table is configuration; not every class is consulted yet

    use super::Policy;
    use std::time::Duration;

    pub const UPLOAD: Policy = Policy {
        window: Duration::from_secs(60),
        max_requests: 5,
    };

    pub const CREATE: Policy = Policy {
        window: Duration::from_secs(60),
        max_requests: 20,
    };

    pub const READ: Policy = Policy {
        window: Duration::from_secs(60),
        max_requests: 100,
    };

    pub const AUTH: Policy = Policy {
        window: Duration::from_secs(15 * 60),
        max_requests: 5,
    };
}

/// Outcome of a rate-limit check. `reset_at_ms` is always populated so
/// callers can surface a retry hint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: u64,
}

struct Entry {
    count: u32,
    reset_at_ms: u64,
}

pub struct RateLimiter {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Count a request against `identifier` under `policy`.
    ///
    /// A fresh or expired window resets to `count = 1`; otherwise the count
    /// is incremented and the request is denied once it exceeds
    /// `max_requests`.
    pub fn check(&self, identifier: &str, policy: Policy) -> Decision {
        let now = self.clock.now_ms();
        let window_ms = policy.window.as_millis() as u64;
        let mut entries = self.entries.lock();

        let entry = entries.entry(identifier.to_string()).or_insert(Entry {
            count: 0,
            reset_at_ms: now + window_ms,
        });

        if now > entry.reset_at_ms || entry.count == 0 {
            entry.count = 1;
            entry.reset_at_ms = now + window_ms;
            return Decision {
                allowed: true,
                remaining: policy.max_requests.saturating_sub(1),
                reset_at_ms: entry.reset_at_ms,
            };
        }

        entry.count += 1;

        if entry.count > policy.max_requests {
            Decision {
                allowed: false,
                remaining: 0,
                reset_at_ms: entry.reset_at_ms,
            }
        } else {
            Decision {
                allowed: true,
                remaining: policy.max_requests - entry.count,
                reset_at_ms: entry.reset_at_ms,
            }
        }
    }

    /// Drop entries whose window has already passed. Bounds memory growth
    /// from one-off identifiers.
    pub fn sweep(&self) {
        let now = self.clock.now_ms();
        self.entries.lock().retain(|_, entry| now <= entry.reset_at_ms);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `sweep` on a fixed interval, independent of request traffic.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            limiter.sweep();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock(Mutex<u64>);

    impl ManualClock {
        fn new(start: u64) -> Arc<Self> {
            Arc::new(Self(Mutex::new(start)))
        }

        fn advance(&self, ms: u64) {
            *self.0.lock() += ms;
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            *self.0.lock()
        }
    }

    const POLICY: Policy = Policy {
        window: Duration::from_millis(1000),
        max_requests: 5,
    };

    #[test]
    fn test_window_counts_down_then_denies() {
        let clock = ManualClock::new(10_000);
        let limiter = RateLimiter::with_clock(clock.clone());

        for expected_remaining in [4, 3, 2, 1, 0] {
            let decision = limiter.check("client-a", POLICY);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert_eq!(decision.reset_at_ms, 11_000);
        }

        let denied = limiter.check("client-a", POLICY);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reset_at_ms, 11_000);
    }

    #[test]
    fn test_window_resets_after_elapse() {
        let clock = ManualClock::new(10_000);
        let limiter = RateLimiter::with_clock(clock.clone());

        for _ in 0..6 {
            limiter.check("client-a", POLICY);
        }
        assert!(!limiter.check("client-a", POLICY).allowed);

        clock.advance(1001);
        let decision = limiter.check("client-a", POLICY);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);
        assert_eq!(decision.reset_at_ms, 11_001 + 1000);
    }

    #[test]
    fn test_identifiers_are_independent() {
        let clock = ManualClock::new(0);
        let limiter = RateLimiter::with_clock(clock);

        for _ in 0..5 {
            limiter.check("client-a", POLICY);
        }
        assert!(!limiter.check("client-a", POLICY).allowed);
        assert!(limiter.check("client-b", POLICY).allowed);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let clock = ManualClock::new(0);
        let limiter = RateLimiter::with_clock(clock.clone());

        limiter.check("old", POLICY);
        clock.advance(500);
        limiter.check("fresh", POLICY);

        clock.advance(600); // "old" reset at 1000, "fresh" at 1500
        limiter.sweep();
        assert_eq!(limiter.len(), 1);

        clock.advance(1000);
        limiter.sweep();
        assert_eq!(limiter.len(), 0);
    }
}
