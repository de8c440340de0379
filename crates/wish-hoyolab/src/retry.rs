//! Retry strategies for calls against rate-limited remotes.
//!
//! A [`RetryStrategy`] only decides how many attempts to make and how long to
//! wait between them; [`execute`] drives the attempts, sleeping on the tokio
//! timer and giving up early when its cancellation token fires.

use std::{future::Future, time::Duration};

use rand_core::{OsRng, RngCore};
use tokio_util::sync::CancellationToken;

/// How many attempts to make and how long to wait between them.
pub trait RetryStrategy {
  fn max_attempts(&self) -> u32;

  /// Delay after the failed attempt `attempt` (0-indexed), before the next.
  fn delay_for_attempt(&self, attempt: u32) -> Option<Duration>;
}

/// Doubling backoff: `initial`, `2 * initial`, `4 * initial`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
  pub max_attempts: u32,
  pub initial:      Duration,
}

impl Default for ExponentialBackoff {
  fn default() -> Self {
    Self {
      max_attempts: 5,
      initial:      Duration::from_millis(500),
    }
  }
}

impl RetryStrategy for ExponentialBackoff {
  fn max_attempts(&self) -> u32 { self.max_attempts }

  fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
    self.initial.checked_mul(2u32.checked_pow(attempt)?)
  }
}

/// A uniformly random delay in `[min, max]` between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitteredDelay {
  pub max_attempts: u32,
  pub min:          Duration,
  pub max:          Duration,
}

impl RetryStrategy for JitteredDelay {
  fn max_attempts(&self) -> u32 { self.max_attempts }

  fn delay_for_attempt(&self, _attempt: u32) -> Option<Duration> {
    Some(jitter(self.min, self.max))
  }
}

/// A uniformly random duration in `[min, max]`, at millisecond granularity.
/// An inverted range yields `min`.
pub fn jitter(min: Duration, max: Duration) -> Duration {
  let (lo, hi) = (millis(min), millis(max));
  if hi <= lo {
    return min;
  }
  let span = (hi - lo).saturating_add(1);
  Duration::from_millis(lo + OsRng.next_u64() % span)
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 { u64::try_from(d.as_millis()).unwrap_or(u64::MAX) }

/// Sleep for `delay` unless `cancel` fires first. Returns `false` when
/// cancelled.
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
  tokio::select! {
    () = cancel.cancelled() => false,
    () = tokio::time::sleep(delay) => true,
  }
}

/// Call `f` until it succeeds, fails with an error `retryable` rejects, or the
/// strategy runs out of attempts. Returns the last error on failure.
///
/// If `cancel` fires while waiting between attempts, the pending error is
/// returned immediately.
pub async fn execute<S, T, E, F, Fut>(
  strategy: &S,
  cancel: &CancellationToken,
  retryable: impl Fn(&E) -> bool,
  mut f: F,
) -> Result<T, E>
where
  S: RetryStrategy + ?Sized,
  E: std::fmt::Display,
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  let max = strategy.max_attempts().max(1);
  let mut attempt = 0;
  loop {
    let err = match f(attempt).await {
      Ok(value) => return Ok(value),
      Err(e) => e,
    };

    let delay = strategy.delay_for_attempt(attempt);
    attempt += 1;
    let Some(delay) = delay.filter(|_| attempt < max && retryable(&err)) else {
      return Err(err);
    };

    tracing::warn!(attempt, max, delay_ms = millis(delay), error = %err, "retrying");
    if !sleep_or_cancel(delay, cancel).await {
      return Err(err);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;

  fn fast(max_attempts: u32) -> ExponentialBackoff {
    ExponentialBackoff { max_attempts, initial: Duration::from_millis(1) }
  }

  #[test]
  fn backoff_doubles_from_initial() {
    let strategy = ExponentialBackoff::default();
    assert_eq!(strategy.max_attempts(), 5);
    assert_eq!(strategy.delay_for_attempt(0), Some(Duration::from_millis(500)));
    assert_eq!(strategy.delay_for_attempt(1), Some(Duration::from_millis(1000)));
    assert_eq!(strategy.delay_for_attempt(3), Some(Duration::from_millis(4000)));
  }

  #[test]
  fn jitter_stays_in_range() {
    let (min, max) = (Duration::from_millis(800), Duration::from_millis(1200));
    for _ in 0..200 {
      let d = jitter(min, max);
      assert!(d >= min && d <= max, "{d:?}");
    }
    assert_eq!(jitter(max, min), max);
  }

  #[test]
  fn millis_saturates() {
    assert_eq!(millis(Duration::from_millis(1500)), 1500);
    assert_eq!(millis(Duration::MAX), u64::MAX);
  }

  #[tokio::test]
  async fn succeeds_after_transient_failures() {
    let calls = Cell::new(0);
    let result: Result<u32, String> =
      execute(&fast(5), &CancellationToken::new(), |_| true, |attempt| {
        calls.set(calls.get() + 1);
        async move { if attempt < 2 { Err("busy".to_owned()) } else { Ok(7) } }
      })
      .await;
    assert_eq!(result, Ok(7));
    assert_eq!(calls.get(), 3);
  }

  #[tokio::test]
  async fn permanent_errors_are_not_retried() {
    let calls = Cell::new(0);
    let result: Result<u32, String> =
      execute(&fast(5), &CancellationToken::new(), |_| false, |_| {
        calls.set(calls.get() + 1);
        async { Err("denied".to_owned()) }
      })
      .await;
    assert_eq!(result, Err("denied".to_owned()));
    assert_eq!(calls.get(), 1);
  }

  #[tokio::test]
  async fn gives_up_after_max_attempts() {
    let calls = Cell::new(0);
    let result: Result<u32, String> =
      execute(&fast(3), &CancellationToken::new(), |_| true, |_| {
        calls.set(calls.get() + 1);
        async { Err("busy".to_owned()) }
      })
      .await;
    assert!(result.is_err());
    assert_eq!(calls.get(), 3);
  }

  #[tokio::test]
  async fn cancellation_stops_waiting() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let slow = ExponentialBackoff { max_attempts: 5, initial: Duration::from_secs(3600) };
    let calls = Cell::new(0);
    let result: Result<u32, String> = execute(&slow, &cancel, |_| true, |_| {
      calls.set(calls.get() + 1);
      async { Err("busy".to_owned()) }
    })
    .await;
    assert!(result.is_err());
    assert_eq!(calls.get(), 1);
  }
}
