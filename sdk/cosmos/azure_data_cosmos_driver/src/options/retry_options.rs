// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::Deserialize;
use std::time::Duration;

/// Controls how throttled (`429`) requests are retried.
///
/// When the service supplies a wait hint it is used as the delay; otherwise the delay grows
/// exponentially from [`backoff_base`](Self::backoff_base) up to [`backoff_cap`](Self::backoff_cap).
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ThrottlingRetryOptions {
    /// Retries allowed for one operation before the throttling error is surfaced.
    pub max_attempts: u32,
    /// Upper bound on the total time spent waiting between throttled attempts.
    pub max_cumulative_wait: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for ThrottlingRetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 9,
            max_cumulative_wait: Duration::from_secs(30),
            backoff_base: Duration::from_millis(100),
            backoff_cap: Duration::from_secs(5),
        }
    }
}

impl ThrottlingRetryOptions {
    /// Creates a new [`ThrottlingRetryOptionsBuilder`] that can be used to construct a [`ThrottlingRetryOptions`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    ///
    /// let options = azure_data_cosmos_driver::ThrottlingRetryOptions::builder()
    ///     .with_max_attempts(3)
    ///     .with_max_cumulative_wait(Duration::from_secs(5))
    ///     .build();
    /// assert_eq!(options.max_attempts, 3);
    /// ```
    pub fn builder() -> ThrottlingRetryOptionsBuilder {
        ThrottlingRetryOptionsBuilder::default()
    }
}

/// Builder used to construct a [`ThrottlingRetryOptions`].
///
/// Obtain a [`ThrottlingRetryOptionsBuilder`] by calling [`ThrottlingRetryOptions::builder()`]
#[derive(Default)]
pub struct ThrottlingRetryOptionsBuilder(ThrottlingRetryOptions);

impl ThrottlingRetryOptionsBuilder {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.0.max_attempts = max_attempts;
        self
    }

    pub fn with_max_cumulative_wait(mut self, max_cumulative_wait: Duration) -> Self {
        self.0.max_cumulative_wait = max_cumulative_wait;
        self
    }

    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.0.backoff_base = base;
        self.0.backoff_cap = cap;
        self
    }

    /// Builds a [`ThrottlingRetryOptions`] from the builder.
    ///
    /// This does not consume the builder, and can be called multiple times.
    pub fn build(&self) -> ThrottlingRetryOptions {
        self.0.clone()
    }
}

/// Controls the retry of reads rejected because the replica had not caught up to the session.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionRetryOptions {
    /// Retries allowed after clearing the session token. Defaults to one.
    pub max_retries: u32,
}

impl Default for SessionRetryOptions {
    fn default() -> Self {
        Self { max_retries: 1 }
    }
}

/// Controls the retry of requests rejected because the partition key did not match the partition
/// they were routed to.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct PartitionKeyMismatchRetryOptions {
    /// Retries allowed after refreshing routing metadata. Defaults to one.
    pub max_retries: u32,
}

impl Default for PartitionKeyMismatchRetryOptions {
    fn default() -> Self {
        Self { max_retries: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_partial_json() {
        let options: ThrottlingRetryOptions =
            serde_json::from_str(r#"{ "maxAttempts": 2 }"#).unwrap();
        assert_eq!(options.max_attempts, 2);
        assert_eq!(options.backoff_cap, Duration::from_secs(5));
    }
}
