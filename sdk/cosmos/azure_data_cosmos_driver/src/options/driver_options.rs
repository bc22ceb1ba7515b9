// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::options::{PartitionKeyMismatchRetryOptions, SessionRetryOptions, ThrottlingRetryOptions};
use crate::ConsistencyLevel;
use serde::Deserialize;
use std::time::Duration;

/// How a driver reaches the service for data-plane operations.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Every request goes through the HTTP gateway.
    #[default]
    Gateway,
    /// Data-plane requests go straight to the replicas; control-plane requests still use the
    /// gateway.
    Direct,
}

/// Tuning for the direct transport stack.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct DirectModeOptions {
    pub max_channels_per_endpoint: u32,
    pub max_requests_per_channel: u32,
    pub port_reuse: bool,
    /// Expected number of physical partitions, used to size connection pools.
    pub partition_count_hint: Option<u32>,
    pub idle_connection_timeout: Duration,
    pub open_timeout: Duration,
    /// Consecutive connectivity failures after which the driver gives up on the direct stack and
    /// sends everything through the gateway.
    pub demotion_threshold: u32,
}

impl Default for DirectModeOptions {
    fn default() -> Self {
        Self {
            max_channels_per_endpoint: 30,
            max_requests_per_channel: 30,
            port_reuse: false,
            partition_count_hint: None,
            idle_connection_timeout: Duration::from_secs(600),
            open_timeout: Duration::from_secs(5),
            demotion_threshold: 5,
        }
    }
}

/// Options used to construct a [`CosmosDriver`](crate::CosmosDriver).
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct DriverOptions {
    pub connection_mode: ConnectionMode,
    pub direct_mode: DirectModeOptions,
    pub throttling_retry: ThrottlingRetryOptions,
    pub session_retry: SessionRetryOptions,
    pub partition_key_mismatch_retry: PartitionKeyMismatchRetryOptions,
    /// Timeout for a single attempt. Retries get a fresh timeout.
    pub request_timeout: Duration,
    /// The consistency level requests use unless they override it.
    pub desired_consistency: Option<ConsistencyLevel>,
    /// Allow requesting a consistency level stronger than the account's.
    pub allow_stronger_consistency: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            connection_mode: ConnectionMode::default(),
            direct_mode: DirectModeOptions::default(),
            throttling_retry: ThrottlingRetryOptions::default(),
            session_retry: SessionRetryOptions::default(),
            partition_key_mismatch_retry: PartitionKeyMismatchRetryOptions::default(),
            request_timeout: Duration::from_secs(60),
            desired_consistency: None,
            allow_stronger_consistency: false,
        }
    }
}

impl DriverOptions {
    /// Creates a new [`DriverOptionsBuilder`] that can be used to construct a [`DriverOptions`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use azure_data_cosmos_driver::{ConnectionMode, ConsistencyLevel, DriverOptions};
    ///
    /// let options = DriverOptions::builder()
    ///     .with_connection_mode(ConnectionMode::Direct)
    ///     .with_desired_consistency(ConsistencyLevel::Session)
    ///     .build();
    /// assert_eq!(options.connection_mode, ConnectionMode::Direct);
    /// ```
    pub fn builder() -> DriverOptionsBuilder {
        DriverOptionsBuilder::default()
    }
}

/// Builder used to construct a [`DriverOptions`].
///
/// Obtain a [`DriverOptionsBuilder`] by calling [`DriverOptions::builder()`]
#[derive(Default)]
pub struct DriverOptionsBuilder(DriverOptions);

impl DriverOptionsBuilder {
    pub fn with_connection_mode(mut self, mode: ConnectionMode) -> Self {
        self.0.connection_mode = mode;
        self
    }

    pub fn with_direct_mode(mut self, options: DirectModeOptions) -> Self {
        self.0.direct_mode = options;
        self
    }

    pub fn with_throttling_retry(mut self, options: ThrottlingRetryOptions) -> Self {
        self.0.throttling_retry = options;
        self
    }

    pub fn with_session_retry(mut self, options: SessionRetryOptions) -> Self {
        self.0.session_retry = options;
        self
    }

    pub fn with_partition_key_mismatch_retry(
        mut self,
        options: PartitionKeyMismatchRetryOptions,
    ) -> Self {
        self.0.partition_key_mismatch_retry = options;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.0.request_timeout = timeout;
        self
    }

    pub fn with_desired_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.0.desired_consistency = Some(level);
        self
    }

    pub fn with_allow_stronger_consistency(mut self, allow: bool) -> Self {
        self.0.allow_stronger_consistency = allow;
        self
    }

    /// Builds a [`DriverOptions`] from the builder.
    ///
    /// This does not consume the builder, and can be called multiple times.
    pub fn build(&self) -> DriverOptions {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_from_json() {
        let options: DriverOptions = serde_json::from_str(
            r#"{
                "connectionMode": "Direct",
                "directMode": { "demotionThreshold": 2, "portReuse": true },
                "desiredConsistency": "Session",
                "requestTimeout": { "secs": 5, "nanos": 0 }
            }"#,
        )
        .unwrap();

        assert_eq!(options.connection_mode, ConnectionMode::Direct);
        assert_eq!(options.direct_mode.demotion_threshold, 2);
        assert!(options.direct_mode.port_reuse);
        assert_eq!(options.direct_mode.max_channels_per_endpoint, 30);
        assert_eq!(options.desired_consistency, Some(ConsistencyLevel::Session));
        assert_eq!(options.request_timeout, Duration::from_secs(5));
        assert!(!options.allow_stronger_consistency);
    }
}
