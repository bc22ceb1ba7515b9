// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Transports and the strategy selecting between them.

use crate::error::{ErrorKind, Result};
use crate::http::CosmosResponse;
use crate::options::DirectModeOptions;
use crate::request::CosmosRequest;
use crate::routing::TransportKind;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Sends a signed request to the service.
///
/// A response with a failure status is still `Ok`; the driver classifies it. `Err` is reserved
/// for requests that never produced a response, and should use [`ErrorKind::Connectivity`].
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &CosmosRequest) -> Result<CosmosResponse>;
}

/// Opens the direct transport stack during bootstrap.
#[async_trait::async_trait]
pub trait DirectTransportFactory: Send + Sync {
    async fn open(&self, options: &DirectModeOptions) -> Result<Arc<dyn Transport>>;
}

struct DirectStack {
    transport: Arc<dyn Transport>,
    demoted: AtomicBool,
    consecutive_failures: AtomicU32,
    demotion_threshold: u32,
}

/// The transports a client was bootstrapped with.
///
/// The strategy is frozen once bootstrap completes. The only change allowed afterwards is the
/// one-way demotion of the direct stack, after which every request uses the gateway.
pub struct TransportStrategy {
    gateway: Arc<dyn Transport>,
    direct: Option<DirectStack>,
}

impl TransportStrategy {
    pub fn gateway_only(gateway: Arc<dyn Transport>) -> Self {
        Self {
            gateway,
            direct: None,
        }
    }

    /// A strategy using `direct` for data-plane requests until `demotion_threshold` consecutive
    /// connectivity failures have been observed on it.
    pub fn with_direct(
        gateway: Arc<dyn Transport>,
        direct: Arc<dyn Transport>,
        demotion_threshold: u32,
    ) -> Self {
        Self {
            gateway,
            direct: Some(DirectStack {
                transport: direct,
                demoted: AtomicBool::new(false),
                consecutive_failures: AtomicU32::new(0),
                demotion_threshold: demotion_threshold.max(1),
            }),
        }
    }

    /// Returns `true` while data-plane requests are sent over the direct stack.
    pub fn is_direct_active(&self) -> bool {
        self.direct
            .as_ref()
            .is_some_and(|d| !d.demoted.load(Ordering::Acquire))
    }

    /// Picks the transport for a request the router assigned to `route`.
    pub fn select(&self, route: TransportKind) -> (TransportKind, &Arc<dyn Transport>) {
        match (&self.direct, route) {
            (Some(direct), TransportKind::Direct) if !direct.demoted.load(Ordering::Acquire) => {
                (TransportKind::Direct, &direct.transport)
            }
            _ => (TransportKind::Gateway, &self.gateway),
        }
    }

    /// Feeds the outcome of an attempt sent over `kind` into the demotion tracker.
    pub fn record_outcome(&self, kind: TransportKind, outcome: &Result<CosmosResponse>) {
        let Some(direct) = self.direct.as_ref().filter(|_| kind == TransportKind::Direct) else {
            return;
        };

        let connectivity_failure = matches!(
            outcome,
            Err(e) if matches!(e.kind(), ErrorKind::Connectivity | ErrorKind::Timeout)
        );
        if !connectivity_failure {
            direct.consecutive_failures.store(0, Ordering::Release);
            return;
        }

        let failures = direct.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= direct.demotion_threshold && !direct.demoted.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                failures,
                "direct connectivity is failing, sending all further requests through the gateway"
            );
        }
    }
}

impl fmt::Debug for TransportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportStrategy")
            .field("direct_configured", &self.direct.is_some())
            .field("direct_active", &self.is_direct_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Headers, StatusCode};
    use crate::Error;

    struct Unreachable;

    #[async_trait::async_trait]
    impl Transport for Unreachable {
        async fn send(&self, _request: &CosmosRequest) -> Result<CosmosResponse> {
            Err(Error::new(ErrorKind::Connectivity, "unreachable"))
        }
    }

    fn ok() -> Result<CosmosResponse> {
        Ok(CosmosResponse::from_bytes(
            StatusCode::Ok,
            Headers::new(),
            Vec::new(),
        ))
    }

    fn refused() -> Result<CosmosResponse> {
        Err(Error::new(ErrorKind::Connectivity, "connection refused"))
    }

    #[test]
    fn gateway_only_never_selects_direct() {
        let strategy = TransportStrategy::gateway_only(Arc::new(Unreachable));
        assert!(!strategy.is_direct_active());
        assert_eq!(strategy.select(TransportKind::Direct).0, TransportKind::Gateway);
    }

    #[test]
    fn demotes_after_consecutive_failures() {
        let strategy =
            TransportStrategy::with_direct(Arc::new(Unreachable), Arc::new(Unreachable), 3);

        strategy.record_outcome(TransportKind::Direct, &refused());
        strategy.record_outcome(TransportKind::Direct, &refused());
        // A success resets the streak.
        strategy.record_outcome(TransportKind::Direct, &ok());
        strategy.record_outcome(TransportKind::Direct, &refused());
        strategy.record_outcome(TransportKind::Direct, &refused());
        assert!(strategy.is_direct_active());

        strategy.record_outcome(TransportKind::Direct, &refused());
        assert!(!strategy.is_direct_active());
        assert_eq!(strategy.select(TransportKind::Direct).0, TransportKind::Gateway);

        // Demotion is permanent.
        strategy.record_outcome(TransportKind::Direct, &ok());
        assert!(!strategy.is_direct_active());
    }

    #[test]
    fn gateway_failures_do_not_count() {
        let strategy =
            TransportStrategy::with_direct(Arc::new(Unreachable), Arc::new(Unreachable), 1);
        strategy.record_outcome(TransportKind::Gateway, &refused());
        assert!(strategy.is_direct_active());
        assert_eq!(strategy.select(TransportKind::Direct).0, TransportKind::Direct);
        assert_eq!(strategy.select(TransportKind::Gateway).0, TransportKind::Gateway);
    }
}
