// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Container session state management.

use crate::session::{Error, PartitionSessionToken};
use crate::PartitionKeyRangeId;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

/// The session of a single collection: one token per partition key range.
#[derive(Debug, Default)]
pub struct ContainerSession {
    partition_tokens: RwLock<HashMap<PartitionKeyRangeId, PartitionSessionToken>>,
}

impl ContainerSession {
    /// Creates a new empty container session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a container session token into the tracked state.
    ///
    /// A container session token is a comma-separated list of partition session tokens, for
    /// example `"42:1#123#4=500,43:1#124#4=501"`. The whole token is parsed before anything is
    /// applied, so a malformed token leaves the session untouched.
    pub fn set_session_token(&self, token: &str) -> Result<(), Error> {
        if token.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let parsed = token
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(PartitionSessionToken::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        let mut partition_tokens = self
            .partition_tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for partition_token in parsed {
            match partition_tokens.entry(partition_token.pkrange_id.clone()) {
                Entry::Occupied(mut entry) => {
                    let merged = entry.get().clone().merge(partition_token);
                    entry.insert(merged);
                }
                Entry::Vacant(entry) => {
                    entry.insert(partition_token);
                }
            }
        }

        Ok(())
    }

    /// Serializes the tracked tokens into a single container session token, sorted by range id.
    ///
    /// Returns `None` if there are no partition tokens.
    pub fn get_session_token(&self) -> Option<String> {
        let partition_tokens = self
            .partition_tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        if partition_tokens.is_empty() {
            return None;
        }

        let mut tokens: Vec<&PartitionSessionToken> = partition_tokens.values().collect();
        tokens.sort_by(|a, b| a.pkrange_id.cmp(&b.pkrange_id));

        Some(
            tokens
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Retrieves the session token for the given partition.
    pub fn get_partition_session_token(&self, pk_range_id: &PartitionKeyRangeId) -> Option<String> {
        self.partition_tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pk_range_id)
            .map(|token| token.to_string())
    }

    /// Removes all tracked partition tokens.
    pub fn clear_session(&self) {
        self.partition_tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_container_session_is_empty() {
        let session = ContainerSession::new();
        assert!(session.get_session_token().is_none());
    }

    #[test]
    fn joins_partition_tokens_in_range_order() {
        let session = ContainerSession::new();
        session
            .set_session_token("43:1#124#4=501, 42:1#123#4=500")
            .unwrap();

        assert_eq!(
            session.get_session_token().unwrap(),
            "42:1#123#4=500,43:1#124#4=501"
        );
        assert_eq!(
            session
                .get_partition_session_token(&PartitionKeyRangeId::new("43"))
                .unwrap(),
            "43:1#124#4=501"
        );
        assert!(session
            .get_partition_session_token(&PartitionKeyRangeId::new("99"))
            .is_none());
    }

    #[test]
    fn updates_merge_instead_of_regressing() {
        let session = ContainerSession::new();
        session.set_session_token("42:1#500#4=500").unwrap();
        session.set_session_token("42:1#400#4=600").unwrap();

        assert_eq!(session.get_session_token().unwrap(), "42:1#500#4=600");
    }

    #[test]
    fn malformed_token_leaves_state_untouched() {
        let session = ContainerSession::new();
        session.set_session_token("42:1#123").unwrap();

        assert!(session.set_session_token("43:1#200,invalid").is_err());
        assert_eq!(session.get_session_token().unwrap(), "42:1#123");
        assert_eq!(session.set_session_token(""), Err(Error::EmptyInput));
    }

    #[test]
    fn clear_session() {
        let session = ContainerSession::new();
        session.set_session_token("42:1#123#4=500").unwrap();

        session.clear_session();
        assert!(session.get_session_token().is_none());
    }
}
