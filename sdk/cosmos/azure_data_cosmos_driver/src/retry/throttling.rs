// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::error::{Error, ErrorKind};
use crate::options::ThrottlingRetryOptions;
use crate::request::CosmosRequest;
use crate::retry::{RetryPolicy, ShouldRetry};
use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use std::fmt;
use std::time::Duration;

/// Retries throttled requests, waiting for the service's hint when it gives one.
///
/// Every throttled attempt consumes one step of the exponential schedule, whether or not the
/// service supplied a hint, so the attempt bound holds either way.
pub struct ThrottlingRetryPolicy {
    delays: ExponentialBackoff,
    max_cumulative_wait: Duration,
    attempts: u32,
    cumulative_wait: Duration,
}

impl ThrottlingRetryPolicy {
    pub fn new(options: ThrottlingRetryOptions) -> Self {
        // `with_max_times` bounds retries, not attempts.
        let delays = ExponentialBuilder::default()
            .with_min_delay(options.backoff_base)
            .with_max_delay(options.backoff_cap)
            .with_factor(2.0)
            .with_max_times(options.max_attempts as usize)
            .build();

        Self {
            delays,
            max_cumulative_wait: options.max_cumulative_wait,
            attempts: 0,
            cumulative_wait: Duration::ZERO,
        }
    }
}

impl fmt::Debug for ThrottlingRetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottlingRetryPolicy")
            .field("attempts", &self.attempts)
            .field("cumulative_wait", &self.cumulative_wait)
            .field("max_cumulative_wait", &self.max_cumulative_wait)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl RetryPolicy for ThrottlingRetryPolicy {
    async fn should_retry(&mut self, error: &Error, _request: &CosmosRequest) -> ShouldRetry {
        let ErrorKind::Throttled { retry_after } = error.kind() else {
            return ShouldRetry::Propagate;
        };

        let Some(backoff) = self.delays.next() else {
            tracing::debug!(attempts = self.attempts, "throttling retries exhausted");
            return ShouldRetry::Propagate;
        };
        self.attempts += 1;

        let delay = retry_after.unwrap_or(backoff);
        let cumulative_wait = self.cumulative_wait + delay;
        if cumulative_wait > self.max_cumulative_wait {
            tracing::debug!(
                ?cumulative_wait,
                "throttling wait would exceed the configured maximum"
            );
            return ShouldRetry::Propagate;
        }
        self.cumulative_wait = cumulative_wait;

        tracing::debug!(attempt = self.attempts, ?delay, "request throttled, retrying");
        ShouldRetry::Retry { after: delay }
    }
}
