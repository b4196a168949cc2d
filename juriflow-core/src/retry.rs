use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::JuriError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Yield to the scheduler between attempts without sleeping.
    #[default]
    Immediate,
    /// Sleep between attempts, doubling the delay each time.
    GradualBackoff,
}

impl RetryStrategy {
    /// Parses the caller-facing option; anything unrecognised is `Immediate`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("gradual_backoff") => RetryStrategy::GradualBackoff,
            _ => RetryStrategy::Immediate,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: usize,
    strategy: RetryStrategy,
    initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            strategy: RetryStrategy::Immediate,
            initial_delay: Duration::from_millis(200),
        }
    }
}

pub fn is_retryable(error: &JuriError) -> bool {
    matches!(
        error,
        JuriError::Backend(_) | JuriError::EmptyResponse(_) | JuriError::Timeout(_)
    )
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, strategy: RetryStrategy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            strategy,
            ..Self::default()
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn strategy(&self) -> RetryStrategy {
        self.strategy
    }

    /// Delay slept after the failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: usize) -> Duration {
        match self.strategy {
            RetryStrategy::Immediate => Duration::ZERO,
            RetryStrategy::GradualBackoff => {
                let exponent = attempt.saturating_sub(1).min(16) as u32;
                self.initial_delay.saturating_mul(2u32.saturating_pow(exponent))
            }
        }
    }

    /// Runs `op` until it succeeds or the attempt budget is spent. The last
    /// failure is returned unchanged; non-retryable failures return at once.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, JuriError>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, JuriError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(output) => return Ok(output),
                Err(error) => {
                    if !is_retryable(&error) || attempt >= self.max_attempts {
                        return Err(error);
                    }
                    tracing::warn!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        error = %error,
                        "attempt failed, retrying"
                    );
                    match self.strategy {
                        RetryStrategy::Immediate => tokio::task::yield_now().await,
                        RetryStrategy::GradualBackoff => sleep(self.delay_after(attempt)).await,
                    }
                    attempt += 1;
                }
            }
        }
    }
}
