//! Bounded retry with exponential backoff.
//!
//! Every store call made by the gateway goes through [`RetryPolicy::execute`].
//! Only failures that [`ClientError::is_transient`] classifies as transient are
//! retried; everything else is surfaced on the first attempt.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use recordstore_persistence::RetryPolicy;
//!
//! let policy = RetryPolicy::new(4, Duration::from_millis(100), 2.0);
//! let delays: Vec<_> = policy.delays().collect();
//! assert_eq!(
//!     delays,
//!     vec![
//!         Duration::from_millis(100),
//!         Duration::from_millis(200),
//!         Duration::from_millis(400),
//!     ]
//! );
//! ```

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::error::{GatewayError, GatewayResult, ValidationError};

/// Retry configuration and executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt.
    #[serde(with = "crate::humantime_serde", default = "default_initial_delay")]
    pub initial_delay: Duration,

    /// Factor applied to the delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Optional upper bound for a single delay.
    #[serde(with = "crate::humantime_serde::option", default)]
    pub max_delay: Option<Duration>,
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy without a delay cap.
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_multiplier,
            max_delay: None,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, 1.0)
    }

    /// Caps every individual delay at `max_delay`.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Validates configuration invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidConfiguration {
                message: "max_attempts must be >= 1".to_string(),
            });
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ValidationError::InvalidConfiguration {
                message: format!(
                    "backoff_multiplier must be a finite value >= 1.0, got {}",
                    self.backoff_multiplier
                ),
            });
        }
        Ok(())
    }

    /// The delays slept between attempts, in order. Yields `max_attempts - 1` values.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let retries = self.max_attempts.saturating_sub(1) as usize;
        std::iter::successors(Some(self.cap(self.initial_delay)), move |delay| {
            Some(self.next_delay(*delay))
        })
        .take(retries)
    }

    /// Runs `call` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// * transient failure with attempts left: sleep, grow the delay, try again
    /// * transient failure on the last attempt: [`GatewayError::StoreUnavailable`]
    /// * any other failure: [`GatewayError::StoreRejected`], without retrying
    pub async fn execute<T, F, Fut>(&self, operation: &'static str, mut call: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut delay = self.cap(self.initial_delay);
        let mut attempts = 0;

        loop {
            attempts += 1;

            match call().await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(operation, attempts, "Store call succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_transient() => {
                    return Err(GatewayError::StoreRejected {
                        operation,
                        source: err,
                    });
                }
                Err(err) => {
                    if attempts >= max_attempts {
                        warn!(operation, attempts, error = %err, "Store call failed, giving up");
                        return Err(GatewayError::StoreUnavailable {
                            operation,
                            attempts,
                            source: err,
                        });
                    }

                    warn!(
                        operation,
                        attempt = attempts,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Store call failed, retrying"
                    );

                    sleep(delay).await;
                    delay = self.next_delay(delay);
                }
            }
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        let scaled = Duration::try_from_secs_f64(delay.as_secs_f64() * self.backoff_multiplier)
            .unwrap_or(Duration::MAX);
        self.cap(scaled)
    }

    fn cap(&self, delay: Duration) -> Duration {
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}
