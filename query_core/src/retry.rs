//! Error-classifying retry with exponential backoff and jitter

use crate::context::ExecContext;
use crate::errors::QueryError;
use crate::{debug_log, trace_log};
use config::RetryConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Backoff schedule applied to every execution attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Fraction of the delay drawn uniformly on either side (0.5 → ±50%)
    pub jitter: f64,
    pub enabled: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter: 0.5,
            enabled: true,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            jitter: config.jitter,
            enabled: config.enabled,
        }
    }
}

impl RetryPolicy {
    /// Run exactly once
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay before the attempt after `attempt` (1-based), without jitter:
    /// `min(max_delay, initial_delay × multiplier^(attempt-1))`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff_multiplier.powi(exponent);
        let nanos = self.initial_delay.as_nanos() as f64 * factor;
        if !nanos.is_finite() || nanos >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }
        Duration::from_nanos(nanos.max(0.0).round() as u64)
    }

    /// Scheduled delay scaled by a factor drawn from `[1 - jitter, 1 + jitter]`
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.delay_for_attempt(attempt);
        if self.jitter <= 0.0 || base.is_zero() {
            return base;
        }
        let spread = self.jitter.min(1.0);
        let factor = rand::rng().random_range((1.0 - spread)..=(1.0 + spread));
        base.mul_f64(factor)
    }

    pub fn should_retry(&self, error: &QueryError) -> bool {
        self.enabled && error.is_retryable()
    }

    /// Retry decision for writes: only failures that happened before the
    /// statement could run
    pub fn should_retry_write(&self, error: &QueryError) -> bool {
        self.enabled && error.is_retryable_write()
    }

    /// Run `op` until it succeeds, fails terminally or uses up `max_attempts`.
    ///
    /// Each attempt is guarded by `ctx`; cancellation or deadline expiry during
    /// an attempt or a backoff sleep ends the loop with that outcome instead of
    /// the last database error.
    pub async fn run<T, F, Fut>(&self, ctx: &ExecContext, op: F) -> Result<T, QueryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        self.run_classified(ctx, op, Self::should_retry).await
    }

    /// [`RetryPolicy::run`] for statements that are not idempotent
    /// (INSERT, UPDATE, DELETE). A dropped connection after sending is
    /// returned as is, since the write may already have committed.
    pub async fn run_write<T, F, Fut>(&self, ctx: &ExecContext, op: F) -> Result<T, QueryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        self.run_classified(ctx, op, Self::should_retry_write).await
    }

    async fn run_classified<T, F, Fut>(
        &self,
        ctx: &ExecContext,
        mut op: F,
        retryable: fn(&Self, &QueryError) -> bool,
    ) -> Result<T, QueryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        let started = Instant::now();
        let max_attempts = if self.enabled { self.max_attempts.max(1) } else { 1 };
        let mut attempt = 1;

        loop {
            trace_log!("attempt {}/{}", attempt, max_attempts);
            let error = match ctx.guard(op()).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !retryable(self, &error) {
                return Err(error);
            }

            if attempt >= max_attempts {
                debug_log!("giving up after {} attempts: {}", attempt, error);
                return Err(QueryError::AttemptsExhausted {
                    attempts: attempt,
                    elapsed: started.elapsed(),
                    source: Box::new(error),
                });
            }

            let delay = self.jittered_delay(attempt);
            debug_log!("attempt {} failed ({}), retrying in {:?}", attempt, error, delay);
            ctx.sleep(delay).await?;
            attempt += 1;
        }
    }
}
