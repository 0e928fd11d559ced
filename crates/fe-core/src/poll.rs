//! Bounded polling against an external producer.
//!
//! Every wait on the engine (readiness sentinel, finish signal, directory
//! removal, artifact arrival) goes through [`poll_until`] so the timeout policy
//! is uniform and tests can drive time with a [`ManualClock`].

use std::cell::Cell;
use std::time::{Duration, Instant};

use crate::error::FeError;

/// Default sleep between checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Time source used by polling loops.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock whose `sleep` advances time instantly. Used by tests.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Cell<Duration>,
    sleeps: Cell<u32>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Cell::new(Duration::ZERO),
            sleeps: Cell::new(0),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
    }

    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }

    /// Number of times `sleep` was called.
    pub fn sleeps(&self) -> u32 {
        self.sleeps.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.advance(duration);
    }
}

/// When a polling loop gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollLimit {
    /// Poll until the check succeeds or fails on its own.
    Unbounded,
    /// Evaluate the check at most this many times.
    Attempts(u32),
    /// Stop once this much time has passed since the first check.
    Elapsed(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub limit: PollLimit,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::unbounded(DEFAULT_POLL_INTERVAL)
    }
}

impl PollPolicy {
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            limit: PollLimit::Unbounded,
        }
    }

    pub fn attempts(attempts: u32, interval: Duration) -> Self {
        Self {
            interval,
            limit: PollLimit::Attempts(attempts),
        }
    }

    pub fn budget(budget: Duration, interval: Duration) -> Self {
        Self {
            interval,
            limit: PollLimit::Elapsed(budget),
        }
    }

    /// `Elapsed` when a timeout is configured, `Unbounded` otherwise.
    pub fn with_optional_timeout(interval: Duration, timeout: Option<Duration>) -> Self {
        match timeout {
            Some(budget) => Self::budget(budget, interval),
            None => Self::unbounded(interval),
        }
    }
}

/// Repeatedly evaluate `check` until it yields a value.
///
/// The check returns `Ok(None)` to keep waiting, `Ok(Some(v))` to finish and
/// `Err(e)` to abort immediately. Exhausting the policy's limit produces
/// [`FeError::TimedOut`] converted into the caller's error type.
pub fn poll_until<T, E, F>(
    clock: &dyn Clock,
    policy: &PollPolicy,
    what: &str,
    mut check: F,
) -> Result<T, E>
where
    F: FnMut() -> Result<Option<T>, E>,
    E: From<FeError>,
{
    let started = clock.now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = check()? {
            return Ok(value);
        }

        let waited = clock.now().saturating_duration_since(started);
        let exhausted = match policy.limit {
            PollLimit::Unbounded => false,
            PollLimit::Attempts(max) => attempts >= max,
            PollLimit::Elapsed(budget) => waited >= budget,
        };
        if exhausted {
            tracing::debug!(what, attempts, ?waited, "poll limit reached");
            return Err(FeError::TimedOut {
                what: what.to_string(),
                attempts,
                waited,
            }
            .into());
        }

        clock.sleep(policy.interval);
    }
}

/// Failure of [`retry`] after the policy's limit was reached.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub waited: Duration,
    pub last_error: E,
}

/// Run `op` until it succeeds, sleeping between failures.
///
/// Unlike [`poll_until`] every failure is retried; the last one is handed
/// back when the limit is reached. An `Unbounded` policy retries forever.
pub fn retry<T, E, F>(
    clock: &dyn Clock,
    policy: &PollPolicy,
    what: &str,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let started = clock.now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let last_error = match op() {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let waited = clock.now().saturating_duration_since(started);
        let exhausted = match policy.limit {
            PollLimit::Unbounded => false,
            PollLimit::Attempts(max) => attempts >= max,
            PollLimit::Elapsed(budget) => waited >= budget,
        };
        if exhausted {
            tracing::debug!(what, attempts, ?waited, error = %last_error, "retry limit reached");
            return Err(RetryExhausted {
                attempts,
                waited,
                last_error,
            });
        }

        tracing::trace!(what, attempts, error = %last_error, "retrying");
        clock.sleep(policy.interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(50);

    #[test]
    fn returns_first_ready_value() {
        let clock = ManualClock::new();
        let mut calls = 0;
        let value: Result<u32, FeError> =
            poll_until(&clock, &PollPolicy::unbounded(TICK), "value", || {
                calls += 1;
                Ok((calls == 3).then_some(7))
            });
        assert_eq!(value.unwrap(), 7);
        assert_eq!(clock.sleeps(), 2);
        assert_eq!(clock.elapsed(), TICK * 2);
    }

    #[test]
    fn attempt_limit_counts_checks() {
        let clock = ManualClock::new();
        let mut calls = 0;
        let result: Result<(), FeError> =
            poll_until(&clock, &PollPolicy::attempts(100, TICK), "directory", || {
                calls += 1;
                Ok(None)
            });
        assert_eq!(calls, 100);
        match result {
            Err(FeError::TimedOut { what, attempts, .. }) => {
                assert_eq!(what, "directory");
                assert_eq!(attempts, 100);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn elapsed_budget_uses_clock() {
        let clock = ManualClock::new();
        let policy = PollPolicy::budget(Duration::from_secs(2), Duration::from_millis(250));
        let result: Result<(), FeError> = poll_until(&clock, &policy, "reset", || Ok(None));
        assert!(matches!(result, Err(FeError::TimedOut { attempts: 9, .. })));
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn check_error_aborts_without_sleeping() {
        let clock = ManualClock::new();
        let result: Result<(), FeError> =
            poll_until(&clock, &PollPolicy::default(), "engine", || {
                Err(FeError::InvalidArg { what: "boom" })
            });
        assert!(matches!(result, Err(FeError::InvalidArg { .. })));
        assert_eq!(clock.sleeps(), 0);
    }

    #[test]
    fn retry_returns_last_error_when_exhausted() {
        let clock = ManualClock::new();
        let mut calls = 0;
        let result: Result<(), _> = retry(&clock, &PollPolicy::attempts(5, TICK), "delete", || {
            calls += 1;
            Err(format!("locked #{calls}"))
        });
        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 5);
        assert_eq!(exhausted.last_error, "locked #5");
        assert_eq!(clock.sleeps(), 4);
    }

    #[test]
    fn retry_stops_on_success() {
        let clock = ManualClock::new();
        let mut calls = 0;
        let result = retry(&clock, &PollPolicy::attempts(5, TICK), "delete", || {
            calls += 1;
            if calls < 2 { Err("busy") } else { Ok(calls) }
        });
        assert_eq!(result.unwrap(), 2);
    }
}
