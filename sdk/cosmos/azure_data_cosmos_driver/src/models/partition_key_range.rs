// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::PartitionKeyRangeId;
use serde::{Deserialize, Serialize};

/// A contiguous slice of the effective partition key space owned by one physical partition.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartitionKeyRange {
    pub id: PartitionKeyRangeId,
    pub min_inclusive: String,
    pub max_exclusive: String,
}

/// A half-open range `[min, max)` of effective partition key values.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EffectivePartitionKeyRange {
    pub min: String,
    pub max: String,
}

impl EffectivePartitionKeyRange {
    /// The lowest effective partition key.
    pub const MIN: &'static str = "";
    /// The exclusive upper bound of the effective partition key space.
    pub const MAX: &'static str = "FF";

    /// The whole key space.
    pub fn full() -> Self {
        Self {
            min: Self::MIN.to_string(),
            max: Self::MAX.to_string(),
        }
    }

    pub fn overlaps(&self, range: &PartitionKeyRange) -> bool {
        self.min.as_str() < range.max_exclusive.as_str()
            && range.min_inclusive.as_str() < self.max.as_str()
    }
}
