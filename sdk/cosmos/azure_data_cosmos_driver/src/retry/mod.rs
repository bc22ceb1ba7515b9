// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Retry policies.
//!
//! Every top-level operation gets a fresh [`RetryPolicyChain`]: throttling backoff, then the
//! session reset, then the partition key mismatch refresh, then the caller's policy if one was
//! supplied. Policies hold per-operation state and are never shared between operations.

mod partition_key_mismatch;
mod session;
mod throttling;

pub use partition_key_mismatch::PartitionKeyMismatchRetryPolicy;
pub use session::SessionRetryPolicy;
pub use throttling::ThrottlingRetryPolicy;

use crate::error::Error;
use crate::request::CosmosRequest;
use std::time::Duration;

/// What to do after a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShouldRetry {
    /// Send the request again after waiting `after`.
    Retry { after: Duration },
    /// Surface the error to the caller.
    Propagate,
}

impl ShouldRetry {
    pub fn immediately() -> Self {
        ShouldRetry::Retry {
            after: Duration::ZERO,
        }
    }
}

/// Decides whether a failed attempt is retried.
#[async_trait::async_trait]
pub trait RetryPolicy: Send {
    /// Adjusts the request before each attempt is signed and sent.
    fn before_send(&mut self, _request: &mut CosmosRequest) {}

    /// Called after an attempt failed with `error`.
    async fn should_retry(&mut self, error: &Error, request: &CosmosRequest) -> ShouldRetry;
}

/// Creates a fresh [`RetryPolicy`] for each operation.
pub trait RetryPolicyFactory: Send + Sync {
    fn new_policy(&self) -> Box<dyn RetryPolicy>;
}

/// Consults policies in order; the first one asking for a retry wins.
#[derive(Default)]
pub struct RetryPolicyChain {
    policies: Vec<Box<dyn RetryPolicy>>,
}

impl RetryPolicyChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: Box<dyn RetryPolicy>) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[async_trait::async_trait]
impl RetryPolicy for RetryPolicyChain {
    fn before_send(&mut self, request: &mut CosmosRequest) {
        for policy in &mut self.policies {
            policy.before_send(request);
        }
    }

    async fn should_retry(&mut self, error: &Error, request: &CosmosRequest) -> ShouldRetry {
        for policy in &mut self.policies {
            if let retry @ ShouldRetry::Retry { .. } = policy.should_retry(error, request).await {
                return retry;
            }
        }
        ShouldRetry::Propagate
    }
}
