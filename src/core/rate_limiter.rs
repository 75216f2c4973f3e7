// src/core/rate_limiter.rs
//! Sliding-window admission control shared by every outbound API call.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Result, ScoutError};

/// Time source for the limiter. Injected so tests can move time by hand.
#[rocket::async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[rocket::async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

/// Clock that only moves when told to. `sleep` advances it instantly.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[rocket::async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + *elapsed
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

pub struct RateLimiter {
    max_calls: u32,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_calls", &self.max_calls)
            .field("window", &self.window)
            .finish()
    }
}

impl RateLimiter {
    pub fn new(max_calls: u32, window_seconds: u64) -> Result<Self> {
        Self::with_clock(max_calls, window_seconds, Arc::new(SystemClock))
    }

    pub fn with_clock(max_calls: u32, window_seconds: u64, clock: Arc<dyn Clock>) -> Result<Self> {
        if max_calls == 0 || window_seconds == 0 {
            return Err(ScoutError::InvalidRateLimit {
                max_calls,
                window_seconds,
            });
        }

        Ok(Self {
            max_calls,
            window: Duration::from_secs(window_seconds),
            calls: Mutex::new(VecDeque::with_capacity(max_calls as usize)),
            clock,
        })
    }

    /// Records a call and returns `Ok` if the quota allows it now, otherwise
    /// returns how long until the oldest call in the window expires.
    pub fn try_acquire(&self) -> std::result::Result<(), Duration> {
        let now = self.clock.now();
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        self.evict(&mut calls, now);

        if calls.len() < self.max_calls as usize {
            calls.push_back(now);
            return Ok(());
        }

        // Non-empty: len >= max_calls >= 1
        let oldest = calls.front().copied().unwrap_or(now);
        Err(self.window.saturating_sub(now.duration_since(oldest)))
    }

    /// Non-blocking check; records the call when it returns `true`.
    pub fn allow(&self) -> bool {
        self.try_acquire().is_ok()
    }

    /// Waits until the call fits in the window, then records it.
    pub async fn acquire(&self) {
        loop {
            match self.try_acquire() {
                Ok(()) => return,
                Err(wait) => {
                    debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
                    self.clock.sleep(wait).await;
                }
            }
        }
    }

    /// Number of accepted calls still inside the trailing window.
    pub fn in_window(&self) -> usize {
        let now = self.clock.now();
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        self.evict(&mut calls, now);
        calls.len()
    }

    fn evict(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = calls.front() {
            if now.duration_since(*oldest) >= self.window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }
}
