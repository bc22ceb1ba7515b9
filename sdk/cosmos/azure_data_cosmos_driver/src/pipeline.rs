// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Executes a prepared request: signing, routing, sending and retrying.

use crate::auth::{AuthorizationProvider, SigningRequest};
use crate::constants;
use crate::error::{Error, ErrorKind, Result};
use crate::http::{self, CosmosResponse};
use crate::request::CosmosRequest;
use crate::retry::{RetryPolicy, ShouldRetry};
use crate::routing::{RequestRouter, TransportKind};
use crate::session::SessionTokenTracker;
use crate::transport::{Transport, TransportStrategy};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything one operation needs to run its attempts.
pub(crate) struct Pipeline<'a> {
    pub auth: &'a AuthorizationProvider,
    pub session: &'a dyn SessionTokenTracker,
    pub strategy: &'a TransportStrategy,
    pub request_timeout: Duration,
    /// Attach the tracked session token to each attempt.
    pub attach_session_token: bool,
    pub cancellation: Option<&'a CancellationToken>,
}

impl Pipeline<'_> {
    /// Runs attempts of `request` until one succeeds or `policy` declines to retry.
    ///
    /// Each attempt starts from `request` as adjusted by the policy's `before_send`, so headers
    /// added for one attempt (signature, date, session token) never leak into the next.
    pub async fn execute(
        &self,
        mut request: CosmosRequest,
        policy: &mut dyn RetryPolicy,
    ) -> Result<CosmosResponse> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.check_cancelled()?;

            policy.before_send(&mut request);
            let mut outgoing = request.clone();
            self.prepare(&mut outgoing)?;

            let route = RequestRouter::route(
                outgoing.resource_type(),
                outgoing.operation(),
                outgoing.context().force_gateway,
            );
            let (kind, transport) = self.strategy.select(route);
            tracing::debug!(attempt, transport = %kind, "sending request");

            let outcome = self.send(kind, transport, &outgoing).await;
            if matches!(&outcome, Err(e) if e.kind() == &ErrorKind::Cancelled) {
                return outcome;
            }
            self.strategy.record_outcome(kind, &outcome);

            let error = match outcome.and_then(|response| {
                self.capture_session(&outgoing, &response);
                Error::check_response(response)
            }) {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            match policy.should_retry(&error, &outgoing).await {
                ShouldRetry::Propagate => return Err(error),
                ShouldRetry::Retry { after } => {
                    tracing::debug!(attempt, error = %error, delay = ?after, "retrying request");
                    self.wait(after).await?;
                }
            }
        }
    }

    /// Attaches the session token and the authorization header.
    fn prepare(&self, request: &mut CosmosRequest) -> Result<()> {
        if request.context().suppress_session_token {
            let headers = http::without_header(request.headers(), &constants::SESSION_TOKEN);
            *request.headers_mut() = headers;
        } else if self.attach_session_token
            && request
                .headers()
                .get_optional_str(&constants::SESSION_TOKEN)
                .is_none()
        {
            if let Some(token) = request
                .collection_identity()
                .and_then(|identity| self.session.get_token(&identity))
            {
                request.headers_mut().insert(constants::SESSION_TOKEN, token);
            }
        }

        let link = request.link().clone();
        let resource_address = link.resource_address();
        let partition_key = request.context().partition_key.clone();
        let signing = SigningRequest {
            resource_address: &resource_address,
            resource_type: link.resource_type(),
            addressing: link.addressing(),
            method: request.method(),
            operation: request.operation(),
            partition_key: partition_key.as_ref(),
        };
        let authorization = self.auth.sign(&signing, request.headers_mut())?;
        request
            .headers_mut()
            .insert(constants::AUTHORIZATION, authorization);
        Ok(())
    }

    async fn send(
        &self,
        kind: TransportKind,
        transport: &Arc<dyn Transport>,
        request: &CosmosRequest,
    ) -> Result<CosmosResponse> {
        let attempt = tokio::time::timeout(self.request_timeout, transport.send(request));
        let outcome = match self.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(cancelled()),
                outcome = attempt => outcome,
            },
            None => attempt.await,
        };

        outcome.map_err(|elapsed| {
            Error::with_source(
                ErrorKind::Timeout,
                format!(
                    "request over {} did not complete within {:?}",
                    kind, self.request_timeout
                ),
                elapsed,
            )
        })?
    }

    fn capture_session(&self, request: &CosmosRequest, response: &CosmosResponse) {
        if response.session_token().is_none() {
            return;
        }
        if let Some(identity) = request.collection_identity() {
            self.session.set_token(&identity, response.headers());
        }
    }

    async fn wait(&self, delay: Duration) -> Result<()> {
        if delay.is_zero() {
            return Ok(());
        }
        match self.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(cancelled()),
                _ = tokio::time::sleep(delay) => Ok(()),
            },
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.cancellation {
            Some(token) if token.is_cancelled() => Err(cancelled()),
            _ => Ok(()),
        }
    }
}

fn cancelled() -> Error {
    Error::new(ErrorKind::Cancelled, "the operation was cancelled")
}
