//! Bounded polling with exponential backoff.
//!
//! Used to wait on asynchronous provider jobs. Every wait is bounded both by
//! an attempt count and by a wall-clock deadline.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Result of a single status check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    Ready(T),
    Pending,
}

/// Why a bounded poll stopped without a result
#[derive(Debug)]
pub enum PollError<E> {
    /// A status check itself failed
    Check(E),
    /// Attempts or deadline ran out while the job was still pending
    Exhausted { attempts: u32, elapsed: Duration },
}

/// Schedule for status checks
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay after the first pending check
    pub interval: Duration,
    /// Upper bound for a single delay
    pub max_interval: Duration,
    /// Growth factor applied per attempt (values below 1.0 are treated as 1.0)
    pub multiplier: f64,
    pub max_attempts: u32,
    /// Total time budget across all attempts
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_interval: Duration::from_secs(5),
            multiplier: 1.5,
            max_attempts: 120,
            timeout: Duration::from_secs(300),
        }
    }
}

impl PollPolicy {
    /// Delay to wait after the `attempt`-th pending check (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let secs = self.interval.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_interval.as_secs_f64() {
            return self.max_interval;
        }
        Duration::from_secs_f64(secs)
    }

    /// Run `check` until it returns `Ready`, fails, or the policy is exhausted.
    ///
    /// `check` receives the 1-based attempt number.
    pub async fn poll_until<T, E, F, Fut>(&self, mut check: F) -> Result<T, PollError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<PollStatus<T>, E>>,
    {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            if let PollStatus::Ready(value) = check(attempts).await.map_err(PollError::Check)? {
                return Ok(value);
            }

            let elapsed = started.elapsed();
            if attempts >= self.max_attempts || elapsed >= self.timeout {
                return Err(PollError::Exhausted { attempts, elapsed });
            }

            let remaining = self.timeout - elapsed;
            let delay = self.delay_for(attempts - 1).min(remaining);
            tracing::trace!("Poll attempt {} pending, sleeping {:?}", attempts, delay);
            tokio::time::sleep(delay).await;
        }
    }
}
