//! Per-connection rate limiting for WebSocket frames.
//!
//! Every connection gets its own [`ConnectionLimits`]; a flood from one
//! client never slows the round for anyone else.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rate limiter using a sliding window algorithm
#[derive(Debug)]
pub struct RateLimiter {
    /// Timestamps of recent requests
    timestamps: VecDeque<Instant>,
    /// Maximum number of requests allowed in the window
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Example
    ///
    /// ```
    /// use bingo_server::api::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// // Allow 10 requests per second
    /// let limiter = RateLimiter::new(10, Duration::from_secs(1));
    /// ```
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
        }
    }

    /// Burst protection: 10 messages per second
    pub fn burst() -> Self {
        Self::new(10, Duration::from_secs(1))
    }

    /// Sustained usage: 100 messages per minute
    pub fn sustained() -> Self {
        Self::new(100, Duration::from_secs(60))
    }

    /// Record a request if it fits in the window.
    ///
    /// Returns `false` when the limit is exceeded; rejected requests are not
    /// recorded.
    ///
    /// ```
    /// # use bingo_server::api::rate_limiter::RateLimiter;
    /// # use std::time::Duration;
    /// let mut limiter = RateLimiter::new(2, Duration::from_secs(1));
    /// assert!(limiter.check());
    /// assert!(limiter.check());
    /// assert!(!limiter.check());
    /// ```
    pub fn check(&mut self) -> bool {
        self.check_at(Instant::now())
    }

    fn check_at(&mut self, now: Instant) -> bool {
        while let Some(ts) = self.timestamps.front() {
            if now.duration_since(*ts) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }

        if self.timestamps.len() >= self.max_requests {
            return false;
        }

        self.timestamps.push_back(now);
        true
    }

    /// Requests still allowed in the current window
    pub fn remaining(&self) -> usize {
        self.max_requests.saturating_sub(self.timestamps.len())
    }
}

/// Which window a rejected frame exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitExceeded {
    Burst,
    Sustained,
}

impl LimitExceeded {
    /// Metric label
    pub fn label(self) -> &'static str {
        match self {
            LimitExceeded::Burst => "burst",
            LimitExceeded::Sustained => "sustained",
        }
    }

    /// Reason sent back to the client in a `blocked` event
    pub fn reason(self) -> &'static str {
        match self {
            LimitExceeded::Burst => "Rate limit exceeded. Please slow down.",
            LimitExceeded::Sustained => "Too many messages. Please wait before sending more.",
        }
    }
}

/// Burst and sustained limits for one connection
#[derive(Debug)]
pub struct ConnectionLimits {
    burst: RateLimiter,
    sustained: RateLimiter,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            burst: RateLimiter::burst(),
            sustained: RateLimiter::sustained(),
        }
    }
}

impl ConnectionLimits {
    pub fn new(burst: RateLimiter, sustained: RateLimiter) -> Self {
        Self { burst, sustained }
    }

    /// Admit one frame, or report the first window it would exceed
    pub fn admit(&mut self) -> Result<(), LimitExceeded> {
        if !self.burst.check() {
            return Err(LimitExceeded::Burst);
        }
        if !self.sustained.check() {
            return Err(LimitExceeded::Sustained);
        }
        Ok(())
    }
}
