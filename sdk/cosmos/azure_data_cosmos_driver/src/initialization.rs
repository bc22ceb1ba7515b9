// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! One-time client bootstrap.

use crate::error::{Error, ErrorKind, Result};
use crate::models::AccountProperties;
use crate::options::{ConnectionMode, DriverOptions};
use crate::transport::{DirectTransportFactory, Transport, TransportStrategy};
use arc_swap::ArcSwapOption;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;

/// What a successful bootstrap produces. Frozen for the rest of the client's life.
#[derive(Debug)]
pub struct AccountContext {
    pub account: AccountProperties,
    pub strategy: Arc<TransportStrategy>,
}

/// Fetches the database account metadata.
#[async_trait::async_trait]
pub trait AccountReader: Send + Sync {
    async fn read_account(&self) -> Result<AccountProperties>;
}

/// Performs one bootstrap attempt.
#[async_trait::async_trait]
pub trait Bootstrapper: Send + Sync {
    async fn bootstrap(&self) -> Result<AccountContext>;
}

/// Reads the account, then opens the transports the options ask for.
pub(crate) struct DefaultBootstrapper {
    pub account_reader: Arc<dyn AccountReader>,
    pub gateway: Arc<dyn Transport>,
    pub direct_factory: Option<Arc<dyn DirectTransportFactory>>,
    pub options: DriverOptions,
}

#[async_trait::async_trait]
impl Bootstrapper for DefaultBootstrapper {
    async fn bootstrap(&self) -> Result<AccountContext> {
        let account = self.account_reader.read_account().await?;

        let strategy = match (self.options.connection_mode, &self.direct_factory) {
            (ConnectionMode::Direct, Some(factory)) => {
                let direct = factory.open(&self.options.direct_mode).await?;
                TransportStrategy::with_direct(
                    self.gateway.clone(),
                    direct,
                    self.options.direct_mode.demotion_threshold,
                )
            }
            (ConnectionMode::Direct, None) => {
                tracing::warn!("direct mode requested without a direct transport, using the gateway");
                TransportStrategy::gateway_only(self.gateway.clone())
            }
            (ConnectionMode::Gateway, _) => TransportStrategy::gateway_only(self.gateway.clone()),
        };

        tracing::info!(
            account = %account.id,
            consistency = %account.default_consistency_level(),
            direct = strategy.is_direct_active(),
            "client initialized"
        );
        Ok(AccountContext {
            account,
            strategy: Arc::new(strategy),
        })
    }
}

/// A snapshot of the bootstrap state machine.
#[derive(Clone, Debug)]
pub enum InitializationState {
    NotStarted,
    InFlight { attempt: u64 },
    Ready(Arc<AccountContext>),
    /// The last attempt failed. The next call starts a new attempt.
    Faulted { attempt: u64, error: Error },
}

type BootstrapTask = Shared<BoxFuture<'static, Result<Arc<AccountContext>>>>;

enum Slot {
    NotStarted,
    InFlight { attempt: u64, task: BootstrapTask },
    Ready(Arc<AccountContext>),
    Faulted { attempt: u64, error: Error },
}

struct State {
    slot: Slot,
    attempts: u64,
}

/// Runs the bootstrap at most once at a time and shares its outcome with every waiter.
pub(crate) struct InitializationCoordinator {
    bootstrapper: Arc<dyn Bootstrapper>,
    ready: ArcSwapOption<AccountContext>,
    state: async_lock::Mutex<State>,
}

impl InitializationCoordinator {
    pub fn new(bootstrapper: Arc<dyn Bootstrapper>) -> Self {
        Self {
            bootstrapper,
            ready: ArcSwapOption::empty(),
            state: async_lock::Mutex::new(State {
                slot: Slot::NotStarted,
                attempts: 0,
            }),
        }
    }

    /// Bootstraps if needed, swallowing failures. The next call tries again.
    pub async fn ensure_ready(&self) -> Option<Arc<AccountContext>> {
        match self.initialize().await {
            Ok(context) => Some(context),
            Err(error) => {
                tracing::warn!(%error, "client initialization failed, continuing without account metadata");
                None
            }
        }
    }

    /// Bootstraps if needed and reports failures.
    pub async fn open(&self) -> Result<Arc<AccountContext>> {
        self.initialize().await
    }

    pub async fn state(&self) -> InitializationState {
        match &self.state.lock().await.slot {
            Slot::NotStarted => InitializationState::NotStarted,
            Slot::InFlight { attempt, .. } => InitializationState::InFlight { attempt: *attempt },
            Slot::Ready(context) => InitializationState::Ready(context.clone()),
            Slot::Faulted { attempt, error } => InitializationState::Faulted {
                attempt: *attempt,
                error: error.clone(),
            },
        }
    }

    async fn initialize(&self) -> Result<Arc<AccountContext>> {
        if let Some(context) = self.ready.load_full() {
            return Ok(context);
        }

        let (attempt, task) = {
            let mut state = self.state.lock().await;
            match &state.slot {
                Slot::Ready(context) => return Ok(context.clone()),
                Slot::InFlight { attempt, task } => (*attempt, task.clone()),
                Slot::NotStarted | Slot::Faulted { .. } => {
                    state.attempts += 1;
                    let attempt = state.attempts;
                    let task = self.start(attempt);
                    state.slot = Slot::InFlight {
                        attempt,
                        task: task.clone(),
                    };
                    (attempt, task)
                }
            }
        };

        let outcome = task.await;

        let mut state = self.state.lock().await;
        if matches!(&state.slot, Slot::InFlight { attempt: current, .. } if *current == attempt) {
            state.slot = match &outcome {
                Ok(context) => {
                    self.ready.store(Some(context.clone()));
                    Slot::Ready(context.clone())
                }
                Err(error) => Slot::Faulted {
                    attempt,
                    error: error.clone(),
                },
            };
        }
        outcome
    }

    fn start(&self, attempt: u64) -> BootstrapTask {
        let bootstrapper = self.bootstrapper.clone();
        async move {
            tracing::debug!(attempt, "starting client initialization");
            bootstrapper
                .bootstrap()
                .await
                .map(Arc::new)
                .map_err(|error| match error.kind() {
                    ErrorKind::InitializationFailure => error,
                    _ => Error::with_source(
                        ErrorKind::InitializationFailure,
                        format!("client initialization attempt {} failed", attempt),
                        error,
                    ),
                })
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConsistencyLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fails the first `failures` attempts, taking `delay` per attempt.
    struct Flaky {
        calls: AtomicUsize,
        failures: usize,
        delay: Duration,
    }

    impl Flaky {
        fn new(failures: usize, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failures,
                delay,
            })
        }
    }

    #[async_trait::async_trait]
    impl Bootstrapper for Flaky {
        async fn bootstrap(&self) -> Result<AccountContext> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if call < self.failures {
                return Err(Error::new(ErrorKind::Connectivity, "account unreachable"));
            }
            Ok(AccountContext {
                account: AccountProperties::with_consistency("acct", ConsistencyLevel::Session),
                strategy: Arc::new(TransportStrategy::gateway_only(Arc::new(NoTransport))),
            })
        }
    }

    struct NoTransport;

    #[async_trait::async_trait]
    impl Transport for NoTransport {
        async fn send(
            &self,
            _request: &crate::CosmosRequest,
        ) -> Result<crate::http::CosmosResponse> {
            Err(Error::new(ErrorKind::Connectivity, "not connected"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_attempt() {
        let bootstrapper = Flaky::new(0, Duration::from_millis(50));
        let coordinator = InitializationCoordinator::new(bootstrapper.clone());

        let (a, b) = tokio::join!(coordinator.ensure_ready(), coordinator.ensure_ready());

        assert_eq!(bootstrapper.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert!(matches!(
            coordinator.state().await,
            InitializationState::Ready(_)
        ));

        coordinator.ensure_ready().await.unwrap();
        assert_eq!(bootstrapper.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_observe_the_same_failure() {
        let bootstrapper = Flaky::new(1, Duration::from_millis(50));
        let coordinator = InitializationCoordinator::new(bootstrapper.clone());

        let (a, b) = tokio::join!(coordinator.open(), coordinator.open());

        assert_eq!(bootstrapper.calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap_err().kind(), &ErrorKind::InitializationFailure);
        assert_eq!(b.unwrap_err().kind(), &ErrorKind::InitializationFailure);
    }

    #[tokio::test]
    async fn failure_is_swallowed_and_retried_with_a_new_attempt() {
        let bootstrapper = Flaky::new(1, Duration::ZERO);
        let coordinator = InitializationCoordinator::new(bootstrapper.clone());

        assert!(coordinator.ensure_ready().await.is_none());
        assert!(matches!(
            coordinator.state().await,
            InitializationState::Faulted { attempt: 1, .. }
        ));

        assert!(coordinator.ensure_ready().await.is_some());
        assert_eq!(bootstrapper.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn open_surfaces_the_failure() {
        let coordinator = InitializationCoordinator::new(Flaky::new(1, Duration::ZERO));
        let error = coordinator.open().await.unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::InitializationFailure);
        assert!(std::error::Error::source(&error).is_some());

        coordinator.open().await.unwrap();
    }
}
