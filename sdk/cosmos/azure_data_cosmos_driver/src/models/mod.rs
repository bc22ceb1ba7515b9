// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Metadata models consumed by the request pipeline.

mod account_properties;
mod collection_properties;
mod partition_key_range;

pub use account_properties::*;
pub use collection_properties::*;
pub use partition_key_range::*;

use crate::ResourceId;
use serde::{Deserialize, Serialize};

/// Properties the service adds to every resource.
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SystemProperties {
    #[serde(default, rename = "_rid", skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<ResourceId>,
    #[serde(default, rename = "_self", skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, rename = "_etag", skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}
