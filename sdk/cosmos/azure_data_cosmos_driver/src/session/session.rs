// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Client-wide session state.

use crate::constants;
use crate::http::Headers;
use crate::session::{ContainerSession, SessionTokenTracker};
use crate::{CollectionIdentity, PartitionKeyRangeId, ResourceId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// The session state for every collection a client has touched.
///
/// Sessions are keyed by collection resource id. A second index maps name-based collection links
/// to the resource id they currently resolve to, so a token captured through one address form is
/// found through the other, and a delete+recreate under the same name is detectable.
#[derive(Debug, Default)]
pub struct SessionContainer {
    container_sessions: RwLock<HashMap<ResourceId, ContainerSession>>,
    name_index: RwLock<HashMap<String, ResourceId>>,
}

impl SessionContainer {
    /// Creates a new empty session container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a container session token into the state of `container`.
    pub fn set_session_token(
        &self,
        container: &ResourceId,
        token: &str,
    ) -> Result<(), crate::session::Error> {
        {
            let container_sessions = self
                .container_sessions
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(container_session) = container_sessions.get(container) {
                return container_session.set_session_token(token);
            }
        }

        // Validate before inserting so a bad token never leaves an empty entry behind.
        let container_session = ContainerSession::new();
        container_session.set_session_token(token)?;

        let mut container_sessions = self
            .container_sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match container_sessions.get(container) {
            // Another writer got here first; merge into its entry.
            Some(existing) => existing.set_session_token(token),
            None => {
                container_sessions.insert(container.clone(), container_session);
                Ok(())
            }
        }
    }

    /// Retrieves the session token for the specified container.
    pub fn get_session_token(&self, container: &ResourceId) -> Option<String> {
        self.container_sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(container)
            .and_then(|session| session.get_session_token())
    }

    /// Retrieves the session token for the specified container and partition.
    pub fn get_partition_session_token(
        &self,
        container: &ResourceId,
        pk_range_id: &PartitionKeyRangeId,
    ) -> Option<String> {
        self.container_sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(container)
            .and_then(|session| session.get_partition_session_token(pk_range_id))
    }

    /// Drops all session state for `container`.
    pub fn clear_session(&self, container: &ResourceId) {
        self.container_sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(container);
    }

    /// Returns the number of containers being tracked.
    pub fn container_count(&self) -> usize {
        self.container_sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Points `name_link` at `resource_id`, dropping the session of any collection previously
    /// known under that name.
    fn index_name(&self, name_link: &str, resource_id: &ResourceId) {
        let previous = {
            let mut name_index = self
                .name_index
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            name_index.insert(name_link.to_string(), resource_id.clone())
        };

        if let Some(previous) = previous.filter(|p| p != resource_id) {
            tracing::debug!(
                collection = name_link,
                old_rid = %previous,
                new_rid = %resource_id,
                "collection was re-created, dropping its old session"
            );
            self.clear_session(&previous);
        }
    }
}

impl SessionTokenTracker for SessionContainer {
    fn get_token(&self, collection: &CollectionIdentity) -> Option<String> {
        self.get_session_token(&collection.resource_id)
    }

    fn set_token(&self, collection: &CollectionIdentity, response_headers: &Headers) {
        let Some(token) = response_headers.get_optional_str(&constants::SESSION_TOKEN) else {
            return;
        };

        if let Some(name_link) = &collection.name_link {
            self.index_name(name_link, &collection.resource_id);
        }

        // A token the client cannot parse is dropped; the response itself is still valid.
        if let Err(error) = self.set_session_token(&collection.resource_id, token) {
            tracing::warn!(
                collection = %collection.resource_id,
                %error,
                "ignoring unparseable session token"
            );
        }
    }

    fn clear_token(&self, collection: &CollectionIdentity) {
        self.clear_session(&collection.resource_id);
        if let Some(name_link) = &collection.name_link {
            let tracked = self.tracked_resource_id(name_link);
            if let Some(tracked) = tracked.filter(|rid| *rid != collection.resource_id) {
                self.clear_session(&tracked);
            }
        }
    }

    fn tracked_resource_id(&self, name_link: &str) -> Option<ResourceId> {
        self.name_index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name_link)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: Option<&str>, rid: &str) -> CollectionIdentity {
        CollectionIdentity::new(name.map(str::to_string), ResourceId::new(rid))
    }

    fn headers(token: &'static str) -> Headers {
        let mut headers = Headers::new();
        headers.insert(constants::SESSION_TOKEN, token);
        headers
    }

    #[test]
    fn tracks_tokens_per_collection() {
        let sessions = SessionContainer::new();
        let first = identity(None, "rid1");
        let second = identity(None, "rid2");

        sessions.set_token(&first, &headers("42:1#123#4=500"));
        sessions.set_token(&second, &headers("43:1#124#4=501"));

        assert_eq!(sessions.get_token(&first).unwrap(), "42:1#123#4=500");
        assert_eq!(sessions.get_token(&second).unwrap(), "43:1#124#4=501");
        assert_eq!(sessions.container_count(), 2);
    }

    #[test]
    fn responses_without_token_change_nothing() {
        let sessions = SessionContainer::new();
        sessions.set_token(&identity(Some("dbs/d/colls/c"), "rid1"), &Headers::new());
        assert_eq!(sessions.container_count(), 0);
        assert!(sessions.tracked_resource_id("dbs/d/colls/c").is_none());
    }

    #[test]
    fn unparseable_tokens_are_ignored() {
        let sessions = SessionContainer::new();
        let coll = identity(None, "rid1");
        sessions.set_token(&coll, &headers("not-a-token"));
        assert!(sessions.get_token(&coll).is_none());
        assert_eq!(sessions.container_count(), 0);
    }

    #[test]
    fn name_index_follows_recreated_collection() {
        let sessions = SessionContainer::new();
        let original = identity(Some("dbs/d/colls/c"), "rid1");
        let recreated = identity(Some("dbs/d/colls/c"), "rid2");

        sessions.set_token(&original, &headers("0:1#100"));
        assert_eq!(
            sessions.tracked_resource_id("dbs/d/colls/c"),
            Some(ResourceId::new("rid1"))
        );

        sessions.set_token(&recreated, &headers("0:1#5"));
        assert_eq!(
            sessions.tracked_resource_id("dbs/d/colls/c"),
            Some(ResourceId::new("rid2"))
        );
        assert!(sessions.get_token(&original).is_none());
        assert_eq!(sessions.get_token(&recreated).unwrap(), "0:1#5");
    }

    #[test]
    fn clear_token_removes_collection_state() {
        let sessions = SessionContainer::new();
        let coll = identity(Some("dbs/d/colls/c"), "rid1");
        sessions.set_token(&coll, &headers("0:1#100"));

        sessions.clear_token(&coll);
        assert!(sessions.get_token(&coll).is_none());

        // Clearing an unknown collection is a no-op.
        sessions.clear_token(&identity(None, "missing"));
    }

    #[test]
    fn concurrent_writers_merge() {
        use std::sync::Arc;
        use std::thread;

        let sessions = Arc::new(SessionContainer::new());
        let handles: Vec<_> = (1..=8u64)
            .map(|lsn| {
                let sessions = Arc::clone(&sessions);
                thread::spawn(move || {
                    sessions
                        .set_session_token(&ResourceId::new("rid"), &format!("0:1#{}", lsn * 10))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            sessions.get_session_token(&ResourceId::new("rid")).unwrap(),
            "0:1#80"
        );
    }
}
