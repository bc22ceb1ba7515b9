// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::cache::{CollectionCache, PartitionKeyRangeCache};
use crate::error::{Error, ErrorKind};
use crate::models::{CollectionProperties, EffectivePartitionKeyRange};
use crate::request::CosmosRequest;
use crate::retry::{RetryPolicy, ShouldRetry};
use std::sync::Arc;

/// Recovers from requests routed with stale partitioning metadata by refreshing the collection
/// and its partition key ranges, then retrying.
pub struct PartitionKeyMismatchRetryPolicy {
    collection_cache: Arc<dyn CollectionCache>,
    partition_key_ranges: Arc<dyn PartitionKeyRangeCache>,
    max_retries: u32,
    retries: u32,
    refreshed: Option<Arc<CollectionProperties>>,
}

impl PartitionKeyMismatchRetryPolicy {
    pub fn new(
        collection_cache: Arc<dyn CollectionCache>,
        partition_key_ranges: Arc<dyn PartitionKeyRangeCache>,
        max_retries: u32,
    ) -> Self {
        Self {
            collection_cache,
            partition_key_ranges,
            max_retries,
            retries: 0,
            refreshed: None,
        }
    }
}

#[async_trait::async_trait]
impl RetryPolicy for PartitionKeyMismatchRetryPolicy {
    fn before_send(&mut self, request: &mut CosmosRequest) {
        if let Some(collection) = self.refreshed.take() {
            request.context_mut().resolved_collection = Some(collection);
        }
    }

    async fn should_retry(&mut self, error: &Error, request: &CosmosRequest) -> ShouldRetry {
        if error.kind() != &ErrorKind::PartitionKeyMismatch {
            return ShouldRetry::Propagate;
        }
        if self.retries >= self.max_retries {
            tracing::debug!("partition key mismatch retry already used, surfacing the error");
            return ShouldRetry::Propagate;
        }
        self.retries += 1;

        let collection = match self.collection_cache.resolve(request, true).await {
            Ok(collection) => collection,
            Err(refresh_error) => {
                tracing::debug!(error = %refresh_error, "failed to refresh collection after partition key mismatch");
                return ShouldRetry::Propagate;
            }
        };

        if let Some(rid) = collection.resource_id() {
            if let Err(refresh_error) = self
                .partition_key_ranges
                .overlapping_ranges(rid, &EffectivePartitionKeyRange::full(), true)
                .await
            {
                tracing::debug!(error = %refresh_error, "failed to refresh partition key ranges");
                return ShouldRetry::Propagate;
            }
        }

        tracing::debug!(collection = %collection.id, "routing metadata refreshed, retrying");
        self.refreshed = Some(collection);
        ShouldRetry::immediately()
    }
}
