// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Routing metadata caches consumed by the driver.
//!
//! The driver treats both caches as opaque lookups. Implementations may perform network I/O and
//! must be safe to call concurrently.

use crate::error::Result;
use crate::models::{CollectionProperties, EffectivePartitionKeyRange, PartitionKeyRange};
use crate::request::CosmosRequest;
use crate::ResourceId;
use std::sync::Arc;

/// Resolves the collection a request targets.
#[async_trait::async_trait]
pub trait CollectionCache: Send + Sync {
    /// Returns the metadata of the collection `request` targets.
    ///
    /// With `force_refresh`, cached metadata for the collection is discarded and fetched again,
    /// so a collection that was deleted and re-created under the same name is seen with its new
    /// resource id.
    async fn resolve(
        &self,
        request: &CosmosRequest,
        force_refresh: bool,
    ) -> Result<Arc<CollectionProperties>>;
}

/// Resolves the partition key ranges of a collection.
#[async_trait::async_trait]
pub trait PartitionKeyRangeCache: Send + Sync {
    /// Returns the ranges of `collection` overlapping `range`, ordered by their minimum.
    async fn overlapping_ranges(
        &self,
        collection: &ResourceId,
        range: &EffectivePartitionKeyRange,
        force_refresh: bool,
    ) -> Result<Vec<PartitionKeyRange>>;
}
