// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

#![allow(dead_code)]

use azure_data_cosmos_driver::{
    cache::{CollectionCache, PartitionKeyRangeCache},
    http::{CosmosResponse, Headers, StatusCode},
    models::{
        AccountProperties, CollectionProperties, EffectivePartitionKeyRange, PartitionKeyRange,
    },
    transport::{DirectTransportFactory, Transport},
    AccountReader, ConsistencyLevel, CosmosRequest, DirectModeOptions, Error, ErrorKind,
    PartitionKeyRangeId, ResourceId, Result,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A transport that records every request and replays scripted outcomes.
///
/// Once the script runs out, every request gets `200 OK` with an empty JSON body.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Result<CosmosResponse>>>,
    requests: Mutex<Vec<CosmosRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, headers: &[(&'static str, &'static str)]) {
        let mut response_headers = Headers::new();
        for (name, value) in headers {
            response_headers.insert(*name, *value);
        }
        let response = CosmosResponse::from_bytes(
            StatusCode::from(status),
            response_headers,
            r#"{"code":"Mock","message":"scripted response"}"#,
        );
        self.script.lock().unwrap().push_back(Ok(response));
    }

    pub fn fail(&self, kind: ErrorKind) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(Error::new(kind, "scripted transport failure")));
    }

    /// Makes every send take `delay` before completing.
    pub fn delay_by(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn requests(&self) -> Vec<CosmosRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &CosmosRequest) -> Result<CosmosResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(CosmosResponse::from_bytes(
                StatusCode::Ok,
                Headers::new(),
                "{}",
            ))
        })
    }
}

/// Hands out a pre-built direct transport.
pub struct MockDirectFactory(pub Arc<MockTransport>);

#[async_trait::async_trait]
impl DirectTransportFactory for MockDirectFactory {
    async fn open(&self, _options: &DirectModeOptions) -> Result<Arc<dyn Transport>> {
        Ok(self.0.clone())
    }
}

/// Returns a fixed account after an optional delay, failing the first `failures` reads.
pub struct MockAccountReader {
    consistency: ConsistencyLevel,
    failures: usize,
    delay: Duration,
    reads: AtomicUsize,
}

impl MockAccountReader {
    pub fn new(consistency: ConsistencyLevel) -> Arc<Self> {
        Self::build(consistency, 0, Duration::ZERO)
    }

    pub fn build(consistency: ConsistencyLevel, failures: usize, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            consistency,
            failures,
            delay,
            reads: AtomicUsize::new(0),
        })
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AccountReader for MockAccountReader {
    async fn read_account(&self) -> Result<AccountProperties> {
        let read = self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if read < self.failures {
            return Err(Error::new(ErrorKind::Connectivity, "account endpoint unreachable"));
        }
        Ok(AccountProperties::with_consistency(
            "mockaccount",
            self.consistency,
        ))
    }
}

/// Collection metadata keyed by collection link.
///
/// Each link holds a queue: the front entry is served until a forced refresh pops it, which
/// models a collection re-created under the same name.
#[derive(Default)]
pub struct MockCollectionCache {
    collections: Mutex<HashMap<String, VecDeque<Arc<CollectionProperties>>>>,
    refreshes: AtomicUsize,
}

impl MockCollectionCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, link: &str, collection: CollectionProperties) {
        self.collections
            .lock()
            .unwrap()
            .entry(link.to_string())
            .or_default()
            .push_back(Arc::new(collection));
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CollectionCache for MockCollectionCache {
    async fn resolve(
        &self,
        request: &CosmosRequest,
        force_refresh: bool,
    ) -> Result<Arc<CollectionProperties>> {
        let link = request
            .link()
            .collection_link()
            .ok_or_else(|| Error::new(ErrorKind::Argument, "not a collection resource"))?;

        let mut collections = self.collections.lock().unwrap();
        let versions = collections.get_mut(&link).ok_or_else(|| {
            Error::new(
                ErrorKind::HttpResponse {
                    status: StatusCode::NotFound,
                    sub_status: None,
                },
                "collection not found",
            )
        })?;

        if force_refresh {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if versions.len() > 1 {
                versions.pop_front();
            }
        }
        versions
            .front()
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::Argument, "collection has no versions"))
    }
}

/// Every collection has a single partition key range covering the whole key space.
#[derive(Default)]
pub struct MockPartitionKeyRangeCache {
    refreshes: AtomicUsize,
}

impl MockPartitionKeyRangeCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PartitionKeyRangeCache for MockPartitionKeyRangeCache {
    async fn overlapping_ranges(
        &self,
        _collection: &ResourceId,
        _range: &EffectivePartitionKeyRange,
        force_refresh: bool,
    ) -> Result<Vec<PartitionKeyRange>> {
        if force_refresh {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(vec![PartitionKeyRange {
            id: PartitionKeyRangeId::new("0"),
            min_inclusive: EffectivePartitionKeyRange::MIN.to_string(),
            max_exclusive: EffectivePartitionKeyRange::MAX.to_string(),
        }])
    }
}
