//! Execution policy configuration with builder pattern.

use std::time::Duration;

use snafu::ensure;

use crate::error::{ConfigSnafu, Result};

/// Default overall timeout for one execution (all attempts included).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Default number of attempts before giving up.
const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Default floor for the per-attempt retry delay.
const DEFAULT_MIN_BACKOFF: Duration = Duration::from_millis(250);

/// Default cap for the per-attempt retry delay.
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Retry/deadline policy for the execute loop.
///
/// The per-attempt delay grows geometrically from `min_backoff` to
/// `max_backoff`. The effective gRPC deadline of each attempt is
/// `min(grpc_deadline, time left of request_timeout)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: usize,

    /// Delay before the first retry.
    pub min_backoff: Duration,

    /// Cap on the delay between retries.
    pub max_backoff: Duration,

    /// Jitter factor (0.0 to 1.0) for randomizing backoff.
    pub jitter: f64,

    /// Per-attempt gRPC deadline; when unset, each attempt may use all the
    /// remaining overall time.
    pub grpc_deadline: Option<Duration>,

    /// Overall timeout covering every attempt and backoff of one execution.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_backoff: DEFAULT_MIN_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            jitter: 0.1,
            grpc_deadline: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy builder.
    #[must_use]
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Creates a policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Default::default() }
    }

    /// Validates the policy's internal consistency.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.max_attempts >= 1,
            ConfigSnafu { message: "max_attempts must be at least 1" }
        );
        ensure!(
            self.min_backoff <= self.max_backoff,
            ConfigSnafu { message: "min_backoff must not exceed max_backoff" }
        );
        ensure!(
            (0.0..=1.0).contains(&self.jitter),
            ConfigSnafu { message: "jitter must be between 0.0 and 1.0" }
        );
        ensure!(
            self.request_timeout > Duration::ZERO,
            ConfigSnafu { message: "request_timeout must be positive" }
        );
        Ok(())
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    max_attempts: Option<usize>,
    min_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    jitter: Option<f64>,
    grpc_deadline: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl RetryPolicyBuilder {
    /// Sets the maximum number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn with_min_backoff(mut self, backoff: Duration) -> Self {
        self.min_backoff = Some(backoff);
        self
    }

    /// Sets the cap on the delay between retries.
    #[must_use]
    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = Some(backoff);
        self
    }

    /// Sets the jitter factor (0.0 to 1.0).
    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Sets the per-attempt gRPC deadline.
    #[must_use]
    pub fn with_grpc_deadline(mut self, deadline: Duration) -> Self {
        self.grpc_deadline = Some(deadline);
        self
    }

    /// Sets the overall timeout for one execution.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds and validates the retry policy.
    pub fn build(self) -> Result<RetryPolicy> {
        let defaults = RetryPolicy::default();
        let policy = RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            min_backoff: self.min_backoff.unwrap_or(defaults.min_backoff),
            max_backoff: self.max_backoff.unwrap_or(defaults.max_backoff),
            jitter: self.jitter.unwrap_or(defaults.jitter),
            grpc_deadline: self.grpc_deadline,
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
        };
        policy.validate()?;
        Ok(policy)
    }
}
