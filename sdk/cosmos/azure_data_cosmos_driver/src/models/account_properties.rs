// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::ConsistencyLevel;
use serde::{Deserialize, Serialize};

/// The database account metadata fetched while bootstrapping a client.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountProperties {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "userConsistencyPolicy")]
    pub consistency_policy: ConsistencyPolicy,
    #[serde(default)]
    pub writable_locations: Vec<AccountRegion>,
    #[serde(default)]
    pub readable_locations: Vec<AccountRegion>,
}

impl AccountProperties {
    /// Creates account metadata with the given default consistency and no regional endpoints.
    pub fn with_consistency(id: impl Into<String>, level: ConsistencyLevel) -> Self {
        Self {
            id: id.into(),
            consistency_policy: ConsistencyPolicy {
                default_consistency_level: level,
            },
            writable_locations: Vec::new(),
            readable_locations: Vec::new(),
        }
    }

    pub fn default_consistency_level(&self) -> ConsistencyLevel {
        self.consistency_policy.default_consistency_level
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyPolicy {
    pub default_consistency_level: ConsistencyLevel,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountRegion {
    pub name: String,
    pub database_account_endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_service_payload() {
        let json = r#"{
            "id": "myaccount",
            "userConsistencyPolicy": { "defaultConsistencyLevel": "BoundedStaleness" },
            "writableLocations": [
                { "name": "West US", "databaseAccountEndpoint": "https://myaccount-westus.documents.azure.com:443/" }
            ],
            "readableLocations": []
        }"#;
        let account: AccountProperties = serde_json::from_str(json).unwrap();
        assert_eq!(
            account.default_consistency_level(),
            ConsistencyLevel::BoundedStaleness
        );
        assert_eq!(account.writable_locations[0].name, "West US");
    }
}
