// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::cache::CollectionCache;
use crate::error::{Error, ErrorKind};
use crate::models::CollectionProperties;
use crate::request::CosmosRequest;
use crate::retry::{RetryPolicy, ShouldRetry};
use crate::session::SessionTokenTracker;
use std::sync::Arc;

/// Recovers from reads the replica rejected because it had not reached the requested session.
///
/// The session for the collection is cleared and the collection re-resolved. A changed resource
/// id means the collection was deleted and re-created under the same name, and the session was
/// tracking the old one: the request is retried against the new collection without a session
/// token. Otherwise the error is surfaced.
pub struct SessionRetryPolicy {
    collection_cache: Arc<dyn CollectionCache>,
    session: Arc<dyn SessionTokenTracker>,
    max_retries: u32,
    retries: u32,
    recreated: Option<Arc<CollectionProperties>>,
}

impl SessionRetryPolicy {
    pub fn new(
        collection_cache: Arc<dyn CollectionCache>,
        session: Arc<dyn SessionTokenTracker>,
        max_retries: u32,
    ) -> Self {
        Self {
            collection_cache,
            session,
            max_retries,
            retries: 0,
            recreated: None,
        }
    }
}

#[async_trait::async_trait]
impl RetryPolicy for SessionRetryPolicy {
    fn before_send(&mut self, request: &mut CosmosRequest) {
        if let Some(collection) = self.recreated.take() {
            let context = request.context_mut();
            context.resolved_collection = Some(collection);
            context.suppress_session_token = true;
        }
    }

    async fn should_retry(&mut self, error: &Error, request: &CosmosRequest) -> ShouldRetry {
        if error.kind() != &ErrorKind::SessionNotAvailable {
            return ShouldRetry::Propagate;
        }
        if self.retries >= self.max_retries {
            tracing::debug!("session retry already used, surfacing the error");
            return ShouldRetry::Propagate;
        }
        self.retries += 1;

        let Some(identity) = request.collection_identity() else {
            return ShouldRetry::Propagate;
        };
        let tracked = identity
            .name_link
            .as_deref()
            .and_then(|name| self.session.tracked_resource_id(name))
            .unwrap_or_else(|| identity.resource_id.clone());
        self.session.clear_token(&identity);

        let current = match self.collection_cache.resolve(request, true).await {
            Ok(collection) => collection,
            Err(refresh_error) => {
                tracing::debug!(error = %refresh_error, "failed to refresh collection after session error");
                return ShouldRetry::Propagate;
            }
        };

        match current.resource_id() {
            Some(current_rid) if *current_rid != tracked => {
                tracing::debug!(
                    old_rid = %tracked,
                    new_rid = %current_rid,
                    "collection was re-created, retrying without a session token"
                );
                self.recreated = Some(current);
                ShouldRetry::immediately()
            }
            _ => ShouldRetry::Propagate,
        }
    }
}
