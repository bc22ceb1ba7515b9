// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::retry::RetryPolicyFactory;
use crate::{ConsistencyLevel, PartitionKey};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// An optimistic-concurrency condition on the target resource's etag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IfMatchCondition {
    /// Sent as `If-Match`: the operation only succeeds if the etag matches.
    Match(String),
    /// Sent as `If-None-Match`: the operation only succeeds if the etag differs.
    NotMatch(String),
}

/// The serialization format requested for response content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentSerializationFormat {
    JsonText,
    CosmosBinary,
}

impl ContentSerializationFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSerializationFormat::JsonText => "JsonText",
            ContentSerializationFormat::CosmosBinary => "CosmosBinary",
        }
    }
}

/// Options for a single call to [`CosmosDriver::process_request`](crate::CosmosDriver::process_request).
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub consistency_level: Option<ConsistencyLevel>,
    pub partition_key: Option<PartitionKey>,
    pub if_match_condition: Option<IfMatchCondition>,
    /// A session token to send instead of the one the driver tracks.
    pub session_token: Option<String>,
    pub content_serialization_format: Option<ContentSerializationFormat>,
    /// Send the request through the gateway regardless of routing.
    pub force_gateway: bool,
    /// Cancels the operation, including any in-flight attempt and pending retry.
    pub cancellation_token: Option<CancellationToken>,
    /// A retry policy consulted after the driver's own policies decline to retry.
    pub retry_policy: Option<Arc<dyn RetryPolicyFactory>>,
}

impl RequestOptions {
    /// Creates a new [`RequestOptionsBuilder`] that can be used to construct a [`RequestOptions`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use azure_data_cosmos_driver::{ConsistencyLevel, RequestOptions};
    ///
    /// let options = RequestOptions::builder()
    ///     .with_partition_key("tenant-1")
    ///     .with_consistency_level(ConsistencyLevel::Eventual)
    ///     .build();
    /// assert!(options.partition_key.is_some());
    /// ```
    pub fn builder() -> RequestOptionsBuilder {
        RequestOptionsBuilder::default()
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("consistency_level", &self.consistency_level)
            .field("partition_key", &self.partition_key)
            .field("if_match_condition", &self.if_match_condition)
            .field("session_token", &self.session_token)
            .field(
                "content_serialization_format",
                &self.content_serialization_format,
            )
            .field("force_gateway", &self.force_gateway)
            .field("cancellable", &self.cancellation_token.is_some())
            .field("custom_retry_policy", &self.retry_policy.is_some())
            .finish()
    }
}

/// Builder used to construct a [`RequestOptions`].
///
/// Obtain a [`RequestOptionsBuilder`] by calling [`RequestOptions::builder()`]
#[derive(Default)]
pub struct RequestOptionsBuilder(RequestOptions);

impl RequestOptionsBuilder {
    pub fn with_consistency_level(mut self, level: ConsistencyLevel) -> Self {
        self.0.consistency_level = Some(level);
        self
    }

    pub fn with_partition_key(mut self, partition_key: impl Into<PartitionKey>) -> Self {
        self.0.partition_key = Some(partition_key.into());
        self
    }

    pub fn with_if_match_condition(mut self, condition: IfMatchCondition) -> Self {
        self.0.if_match_condition = Some(condition);
        self
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.0.session_token = Some(token.into());
        self
    }

    pub fn with_content_serialization_format(mut self, format: ContentSerializationFormat) -> Self {
        self.0.content_serialization_format = Some(format);
        self
    }

    pub fn with_force_gateway(mut self, force_gateway: bool) -> Self {
        self.0.force_gateway = force_gateway;
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.0.cancellation_token = Some(token);
        self
    }

    pub fn with_retry_policy(mut self, factory: Arc<dyn RetryPolicyFactory>) -> Self {
        self.0.retry_policy = Some(factory);
        self
    }

    /// Builds a [`RequestOptions`] from the builder.
    ///
    /// This does not consume the builder, and can be called multiple times.
    pub fn build(&self) -> RequestOptions {
        self.0.clone()
    }
}
