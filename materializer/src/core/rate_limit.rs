//! Backoff state machine for backend throttling.
//!
//! The governor never sleeps. It anchors a countdown on a [`Clock`] reading and
//! derives the remaining seconds from later readings, so a manual clock drives
//! it deterministically in tests.

use std::cell::Cell;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time since construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Observable governor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RateLimitState {
    Idle,
    Limited { remaining_secs: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Countdown {
    retry_after_secs: u64,
    started_at: Duration,
}

/// Per-session `Idle -> Limited(n) -> Idle` state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitGovernor {
    default_retry_after_secs: u64,
    countdown: Option<Countdown>,
}

impl RateLimitGovernor {
    pub fn new(default_retry_after_secs: u64) -> Self {
        Self {
            default_retry_after_secs,
            countdown: None,
        }
    }

    /// Enter `Limited` after a throttling signal. A missing or zero
    /// `retry_after_secs` falls back to the configured default.
    pub fn limit(&mut self, retry_after_secs: Option<u64>, now: Duration) -> u64 {
        let secs = retry_after_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(self.default_retry_after_secs);
        self.countdown = Some(Countdown {
            retry_after_secs: secs,
            started_at: now,
        });
        secs
    }

    /// Report the state at `now`, dropping the countdown once it reaches zero.
    pub fn poll(&mut self, now: Duration) -> RateLimitState {
        let state = self.state_at(now);
        if state == RateLimitState::Idle {
            self.countdown = None;
        }
        state
    }

    /// Report the state at `now` without releasing an expired countdown.
    pub fn state_at(&self, now: Duration) -> RateLimitState {
        let Some(countdown) = self.countdown else {
            return RateLimitState::Idle;
        };
        let elapsed = now.saturating_sub(countdown.started_at).as_secs();
        match countdown.retry_after_secs.saturating_sub(elapsed) {
            0 => RateLimitState::Idle,
            remaining_secs => RateLimitState::Limited { remaining_secs },
        }
    }

    /// Cancel any running countdown.
    pub fn reset(&mut self) {
        self.countdown = None;
    }

    pub fn has_countdown(&self) -> bool {
        self.countdown.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_decrements_each_second_then_returns_to_idle() {
        let clock = ManualClock::new();
        let mut governor = RateLimitGovernor::new(60);
        governor.limit(Some(5), clock.now());

        let mut observed = Vec::new();
        for _ in 0..5 {
            match governor.poll(clock.now()) {
                RateLimitState::Limited { remaining_secs } => observed.push(remaining_secs),
                RateLimitState::Idle => panic!("expected limited"),
            }
            clock.advance(Duration::from_secs(1));
        }

        assert_eq!(observed, vec![5, 4, 3, 2, 1]);
        assert_eq!(governor.poll(clock.now()), RateLimitState::Idle);
        assert!(!governor.has_countdown());
    }

    #[test]
    fn partial_seconds_do_not_advance_the_countdown() {
        let clock = ManualClock::new();
        let mut governor = RateLimitGovernor::new(60);
        governor.limit(Some(2), clock.now());
        clock.advance(Duration::from_millis(999));
        assert_eq!(
            governor.poll(clock.now()),
            RateLimitState::Limited { remaining_secs: 2 }
        );
    }

    #[test]
    fn missing_retry_after_uses_default() {
        let mut governor = RateLimitGovernor::new(60);
        assert_eq!(governor.limit(None, Duration::ZERO), 60);
        assert_eq!(governor.limit(Some(0), Duration::ZERO), 60);
        assert_eq!(
            governor.state_at(Duration::from_secs(59)),
            RateLimitState::Limited { remaining_secs: 1 }
        );
    }

    #[test]
    fn reset_cancels_running_countdown() {
        let mut governor = RateLimitGovernor::new(60);
        governor.limit(Some(30), Duration::ZERO);
        governor.reset();
        assert!(!governor.has_countdown());
        assert_eq!(governor.state_at(Duration::ZERO), RateLimitState::Idle);
    }

    #[test]
    fn state_serializes_for_presentation() {
        let value = serde_json::to_value(RateLimitState::Limited { remaining_secs: 7 })
            .expect("serialize");
        assert_eq!(value["state"], "limited");
        assert_eq!(value["remaining_secs"], 7);
    }
}
