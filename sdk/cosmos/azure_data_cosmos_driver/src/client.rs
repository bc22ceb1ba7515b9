// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::auth::AuthorizationProvider;
use crate::cache::{CollectionCache, PartitionKeyRangeCache};
use crate::consistency::ConsistencyNegotiator;
use crate::error::{Error, ErrorKind, Result};
use crate::http::CosmosResponse;
use crate::initialization::{
    AccountContext, AccountReader, Bootstrapper, DefaultBootstrapper, InitializationCoordinator,
    InitializationState,
};
use crate::models::CollectionProperties;
use crate::options::{DriverOptions, IfMatchCondition, RequestOptions};
use crate::pipeline::Pipeline;
use crate::request::{CosmosRequest, OperationType};
use crate::resource_context::ResourceType;
use crate::retry::{
    PartitionKeyMismatchRetryPolicy, RetryPolicyChain, SessionRetryPolicy, ThrottlingRetryPolicy,
};
use crate::routing::{RequestRouter, TransportKind};
use crate::session::{SessionContainer, SessionTokenTracker};
use crate::transport::{DirectTransportFactory, Transport, TransportStrategy};
use crate::{constants, ConsistencyLevel, PartitionKeyResolver};
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// The request-execution core of a Cosmos DB client.
///
/// A driver authorizes, partitions, routes and retries requests. Cloning is cheap and clones
/// share all state, including the bootstrap outcome and the session tokens.
#[derive(Clone)]
pub struct CosmosDriver {
    inner: Arc<DriverInner>,
}

struct DriverInner {
    client_id: Uuid,
    options: DriverOptions,
    auth: AuthorizationProvider,
    session: Arc<dyn SessionTokenTracker>,
    collection_cache: Arc<dyn CollectionCache>,
    partition_key_ranges: Arc<dyn PartitionKeyRangeCache>,
    initialization: InitializationCoordinator,
    negotiator: ConsistencyNegotiator,
    /// Used while the client has not bootstrapped.
    gateway_fallback: Arc<TransportStrategy>,
}

impl CosmosDriver {
    /// Creates a new [`CosmosDriverBuilder`] for a driver authorizing with `auth` and sending
    /// through `gateway`.
    pub fn builder(
        auth: impl Into<AuthorizationProvider>,
        gateway: Arc<dyn Transport>,
    ) -> CosmosDriverBuilder {
        CosmosDriverBuilder {
            options: DriverOptions::default(),
            auth: auth.into(),
            gateway,
            direct_factory: None,
            account_reader: None,
            bootstrapper: None,
            collection_cache: None,
            partition_key_ranges: None,
            session: None,
        }
    }

    /// The identifier of this client instance, included in every log span.
    pub fn client_id(&self) -> Uuid {
        self.inner.client_id
    }

    pub fn options(&self) -> &DriverOptions {
        &self.inner.options
    }

    pub fn session_tracker(&self) -> &Arc<dyn SessionTokenTracker> {
        &self.inner.session
    }

    pub async fn initialization_state(&self) -> InitializationState {
        self.inner.initialization.state().await
    }

    /// Bootstraps the client now, surfacing any failure.
    ///
    /// Calling this is optional: the first request bootstraps implicitly, logging and retrying
    /// failures instead of returning them.
    pub async fn open(&self) -> Result<()> {
        self.inner.initialization.open().await.map(|_| ())
    }

    /// Executes `request`, retrying recoverable failures.
    pub async fn process_request(
        &self,
        request: CosmosRequest,
        options: Option<RequestOptions>,
    ) -> Result<CosmosResponse> {
        let activity_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "process_request",
            client_id = %self.inner.client_id,
            %activity_id,
            operation = %request.operation(),
            resource = %request.link(),
        );
        self.process(request, options.unwrap_or_default(), activity_id)
            .instrument(span)
            .await
    }

    async fn process(
        &self,
        mut request: CosmosRequest,
        options: RequestOptions,
        activity_id: Uuid,
    ) -> Result<CosmosResponse> {
        let inner = &self.inner;
        request.validate()?;

        let context = self.ensure_ready(&options).await?;
        let account_consistency = context
            .as_ref()
            .map(|c| c.account.default_consistency_level());
        let negotiated = inner.negotiator.negotiate(
            options.consistency_level,
            inner.options.desired_consistency,
            account_consistency,
        )?;

        let collection = if request.resource_type().is_collection_child() {
            let collection = inner.collection_cache.resolve(&request, false).await?;
            request.context_mut().resolved_collection = Some(collection.clone());
            Some(collection)
        } else {
            None
        };

        let strategy = context
            .map(|c| c.strategy.clone())
            .unwrap_or_else(|| inner.gateway_fallback.clone());

        let mut force_gateway = options.force_gateway;
        if needs_partition_key(&request, &options) {
            resolve_partition_key(&mut request, &options, collection.as_deref())?;
        } else if collection.is_some()
            && strategy.is_direct_active()
            && RequestRouter::route(request.resource_type(), request.operation(), force_gateway)
                == TransportKind::Direct
        {
            // A replica only serves one partition; without a key the gateway has to fan out.
            match resolve_partition_key(&mut request, &options, collection.as_deref()) {
                Ok(()) => {}
                Err(e) if e.kind() == &ErrorKind::MissingPartitionKey => {
                    tracing::debug!(
                        "no partition key for the request, routing through the gateway"
                    );
                    force_gateway = true;
                }
                Err(e) => return Err(e),
            }
        }

        stamp_headers(&mut request, &options, activity_id);
        if let Some(header) = negotiated.and_then(|n| n.header) {
            request
                .headers_mut()
                .insert(constants::CONSISTENCY_LEVEL, header.as_str());
        }
        request.context_mut().force_gateway = force_gateway;

        let mut policy = self.retry_chain(&options);
        let pipeline = Pipeline {
            auth: &inner.auth,
            session: inner.session.as_ref(),
            strategy: &strategy,
            request_timeout: inner.options.request_timeout,
            attach_session_token: options.session_token.is_none()
                && request.operation().reads_session()
                && negotiated.is_some_and(|n| n.effective == ConsistencyLevel::Session),
            cancellation: options.cancellation_token.as_ref(),
        };
        pipeline.execute(request, &mut policy).await
    }

    async fn ensure_ready(&self, options: &RequestOptions) -> Result<Option<Arc<AccountContext>>> {
        let ready = self.inner.initialization.ensure_ready();
        match &options.cancellation_token {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    Err(Error::new(ErrorKind::Cancelled, "the operation was cancelled"))
                }
                context = ready => Ok(context),
            },
            None => Ok(ready.await),
        }
    }

    /// Throttling, then session reset, then partition key mismatch, then the caller's policy.
    fn retry_chain(&self, options: &RequestOptions) -> RetryPolicyChain {
        let inner = &self.inner;
        let chain = RetryPolicyChain::new()
            .with_policy(Box::new(ThrottlingRetryPolicy::new(
                inner.options.throttling_retry.clone(),
            )))
            .with_policy(Box::new(SessionRetryPolicy::new(
                inner.collection_cache.clone(),
                inner.session.clone(),
                inner.options.session_retry.max_retries,
            )))
            .with_policy(Box::new(PartitionKeyMismatchRetryPolicy::new(
                inner.collection_cache.clone(),
                inner.partition_key_ranges.clone(),
                inner.options.partition_key_mismatch_retry.max_retries,
            )));

        match &options.retry_policy {
            Some(factory) => chain.with_policy(factory.new_policy()),
            None => chain,
        }
    }
}

/// Point operations on documents and stored procedure execution are scoped to one partition.
/// Queries are only when the caller names a key.
fn needs_partition_key(request: &CosmosRequest, options: &RequestOptions) -> bool {
    match (request.resource_type(), request.operation()) {
        (ResourceType::Document, OperationType::Query) => options.partition_key.is_some(),
        (ResourceType::Document, _) => true,
        (ResourceType::StoredProcedure, OperationType::Execute) => true,
        _ => false,
    }
}

fn resolve_partition_key(
    request: &mut CosmosRequest,
    options: &RequestOptions,
    collection: Option<&CollectionProperties>,
) -> Result<()> {
    let document = if request.resource_type() == ResourceType::Document
        && request.operation().is_write()
        && options.partition_key.is_none()
    {
        request.body_json()?
    } else {
        None
    };

    let partition_key = PartitionKeyResolver::resolve(
        options.partition_key.as_ref(),
        document.as_ref(),
        collection,
    )?;
    request
        .headers_mut()
        .insert(constants::PARTITION_KEY, partition_key.to_header_value());
    request.context_mut().partition_key = Some(partition_key);
    Ok(())
}

fn stamp_headers(request: &mut CosmosRequest, options: &RequestOptions, activity_id: Uuid) {
    let operation = request.operation();
    let headers = request.headers_mut();
    headers.insert(constants::VERSION, constants::API_VERSION);
    headers.insert(constants::ACTIVITY_ID, activity_id.to_string());

    match operation {
        OperationType::Upsert => headers.insert(constants::IS_UPSERT, "True"),
        OperationType::Query => headers.insert(constants::IS_QUERY, "True"),
        _ => {}
    }

    match &options.if_match_condition {
        Some(IfMatchCondition::Match(etag)) => headers.insert(constants::IF_MATCH, etag.clone()),
        Some(IfMatchCondition::NotMatch(etag)) => {
            headers.insert(constants::IF_NONE_MATCH, etag.clone())
        }
        None => {}
    }

    if let Some(format) = options.content_serialization_format {
        headers.insert(constants::CONTENT_SERIALIZATION_FORMAT, format.as_str());
    }
    if let Some(token) = &options.session_token {
        headers.insert(constants::SESSION_TOKEN, token.clone());
    }
}

impl fmt::Debug for CosmosDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosmosDriver")
            .field("client_id", &self.inner.client_id)
            .field("authorization", &self.inner.auth.mode())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

/// Builder used to construct a [`CosmosDriver`].
///
/// Obtain a [`CosmosDriverBuilder`] by calling [`CosmosDriver::builder()`]. The collection and
/// partition key range caches, and an [`AccountReader`] (or a custom [`Bootstrapper`]), are
/// required.
pub struct CosmosDriverBuilder {
    options: DriverOptions,
    auth: AuthorizationProvider,
    gateway: Arc<dyn Transport>,
    direct_factory: Option<Arc<dyn DirectTransportFactory>>,
    account_reader: Option<Arc<dyn AccountReader>>,
    bootstrapper: Option<Arc<dyn Bootstrapper>>,
    collection_cache: Option<Arc<dyn CollectionCache>>,
    partition_key_ranges: Option<Arc<dyn PartitionKeyRangeCache>>,
    session: Option<Arc<dyn SessionTokenTracker>>,
}

impl CosmosDriverBuilder {
    pub fn with_options(mut self, options: DriverOptions) -> Self {
        self.options = options;
        self
    }

    /// Opens `factory`'s transport during bootstrap when the options ask for direct mode.
    pub fn with_direct_transport(mut self, factory: Arc<dyn DirectTransportFactory>) -> Self {
        self.direct_factory = Some(factory);
        self
    }

    pub fn with_account_reader(mut self, reader: Arc<dyn AccountReader>) -> Self {
        self.account_reader = Some(reader);
        self
    }

    /// Replaces the default bootstrap sequence.
    pub fn with_bootstrapper(mut self, bootstrapper: Arc<dyn Bootstrapper>) -> Self {
        self.bootstrapper = Some(bootstrapper);
        self
    }

    pub fn with_collection_cache(mut self, cache: Arc<dyn CollectionCache>) -> Self {
        self.collection_cache = Some(cache);
        self
    }

    pub fn with_partition_key_range_cache(
        mut self,
        cache: Arc<dyn PartitionKeyRangeCache>,
    ) -> Self {
        self.partition_key_ranges = Some(cache);
        self
    }

    /// Replaces the default in-memory [`SessionContainer`].
    pub fn with_session_tracker(mut self, session: Arc<dyn SessionTokenTracker>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn build(self) -> Result<CosmosDriver> {
        let collection_cache = self
            .collection_cache
            .ok_or_else(|| missing("a collection cache"))?;
        let partition_key_ranges = self
            .partition_key_ranges
            .ok_or_else(|| missing("a partition key range cache"))?;

        let bootstrapper: Arc<dyn Bootstrapper> = match (self.bootstrapper, self.account_reader) {
            (Some(bootstrapper), _) => bootstrapper,
            (None, Some(account_reader)) => Arc::new(DefaultBootstrapper {
                account_reader,
                gateway: self.gateway.clone(),
                direct_factory: self.direct_factory,
                options: self.options.clone(),
            }),
            (None, None) => return Err(missing("an account reader")),
        };

        let client_id = Uuid::new_v4();
        tracing::debug!(%client_id, mode = ?self.options.connection_mode, "creating driver");

        Ok(CosmosDriver {
            inner: Arc::new(DriverInner {
                client_id,
                negotiator: ConsistencyNegotiator::new(self.options.allow_stronger_consistency),
                options: self.options,
                auth: self.auth,
                session: self
                    .session
                    .unwrap_or_else(|| Arc::new(SessionContainer::new())),
                collection_cache,
                partition_key_ranges,
                initialization: InitializationCoordinator::new(bootstrapper),
                gateway_fallback: Arc::new(TransportStrategy::gateway_only(self.gateway)),
            }),
        })
    }
}

fn missing(what: &str) -> Error {
    Error::new(ErrorKind::Argument, format!("the driver requires {}", what))
}
