// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical sequence number (LSN) used in Cosmos DB replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lsn(u64);

impl Lsn {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A region identifier used in multi-region session tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(u32);

impl RegionId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

/// The service-assigned resource id (`_rid`) of a resource.
///
/// Unlike the name of a resource, the resource id changes when a resource is deleted and
/// re-created with the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identifier of a partition key range within a collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKeyRangeId(String);

impl PartitionKeyRangeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Identifies a collection both by its name-based link and by its resource id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionIdentity {
    /// The name-based link, e.g. `dbs/db1/colls/coll1`, when the request was name addressed.
    pub name_link: Option<String>,
    /// The resource id of the collection.
    pub resource_id: ResourceId,
}

impl CollectionIdentity {
    pub fn new(name_link: Option<String>, resource_id: ResourceId) -> Self {
        Self {
            name_link,
            resource_id,
        }
    }
}
