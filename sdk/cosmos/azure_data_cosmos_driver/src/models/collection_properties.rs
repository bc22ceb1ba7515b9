// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::models::SystemProperties;
use crate::ResourceId;
use serde::{Deserialize, Serialize};

/// Collection metadata as resolved by the collection cache.
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionProperties {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<PartitionKeyDefinition>,
    #[serde(flatten)]
    pub system_properties: SystemProperties,
}

impl CollectionProperties {
    pub fn new(id: impl Into<String>, resource_id: ResourceId) -> Self {
        Self {
            id: id.into(),
            partition_key: None,
            system_properties: SystemProperties {
                resource_id: Some(resource_id),
                ..Default::default()
            },
        }
    }

    pub fn with_partition_key(mut self, definition: PartitionKeyDefinition) -> Self {
        self.partition_key = Some(definition);
        self
    }

    pub fn resource_id(&self) -> Option<&ResourceId> {
        self.system_properties.resource_id.as_ref()
    }

    /// Returns the declared partition key definition, if the collection is partitioned.
    pub fn partition_key_definition(&self) -> Option<&PartitionKeyDefinition> {
        self.partition_key.as_ref().filter(|d| !d.paths.is_empty())
    }
}

#[derive(Clone, Copy, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum PartitionKeyKind {
    #[default]
    Hash,
    MultiHash,
    Range,
}

/// The partition key paths declared by a collection.
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartitionKeyDefinition {
    pub paths: Vec<String>,
    #[serde(default)]
    pub kind: PartitionKeyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u8>,
    /// Set on collections created before partitioning existed and migrated to a system key.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub system_key: bool,
}

impl PartitionKeyDefinition {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            paths: vec![path.into()],
            ..Default::default()
        }
    }

    pub fn hierarchical(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            kind: PartitionKeyKind::MultiHash,
            version: Some(2),
            system_key: false,
        }
    }
}

impl From<&str> for PartitionKeyDefinition {
    fn from(path: &str) -> Self {
        PartitionKeyDefinition::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_service_payload() {
        let json = r#"{
            "id": "orders",
            "partitionKey": { "paths": ["/customerId"], "kind": "Hash", "version": 2 },
            "_rid": "Zk5uAMSFmQA=",
            "_self": "dbs/Zk5uAA==/colls/Zk5uAMSFmQA=/",
            "_etag": "\"00000000-0000-0000-0000-000000000000\""
        }"#;
        let collection: CollectionProperties = serde_json::from_str(json).unwrap();
        assert_eq!(collection.resource_id().unwrap().value(), "Zk5uAMSFmQA=");
        assert_eq!(
            collection.partition_key_definition().unwrap().paths,
            vec!["/customerId".to_string()]
        );
    }

    #[test]
    fn empty_paths_mean_unpartitioned() {
        let collection = CollectionProperties::new("c", ResourceId::new("rid"))
            .with_partition_key(PartitionKeyDefinition::default());
        assert!(collection.partition_key_definition().is_none());
    }
}
