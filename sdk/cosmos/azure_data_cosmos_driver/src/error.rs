// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::http::{self, CosmosResponse, StatusCode};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

/// A convenience alias for `Result` where the error type is the driver's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of an [`Error`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A required argument was missing or invalid. Raised before any network call.
    Argument,
    /// The collection declares a partition key path but no value could be found for the request.
    MissingPartitionKey,
    /// No credential applicable to the requested resource was found.
    Unauthorized,
    /// The requested consistency level is stronger than the account allows.
    InvalidConsistencyLevel,
    /// The service returned a terminal failure status.
    HttpResponse {
        status: StatusCode,
        sub_status: Option<u32>,
    },
    /// The service throttled the request (`429`).
    Throttled { retry_after: Option<Duration> },
    /// The replica could not serve the session the request asked for (`404`/`1002`).
    SessionNotAvailable,
    /// The partition key did not match the partition the request was routed to (`400`/`1001`).
    PartitionKeyMismatch,
    /// Bootstrapping the client failed.
    InitializationFailure,
    /// A single attempt exceeded its timeout.
    Timeout,
    /// The caller cancelled the operation.
    Cancelled,
    /// The transport could not reach the service.
    Connectivity,
    /// A payload could not be serialized or deserialized.
    DataConversion,
}

/// A session token that could not be parsed, compared or merged.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionTokenError {
    #[error("session token is empty")]
    EmptyInput,
    #[error("session token needs at least a version and a global LSN")]
    MissingComponents,
    #[error("invalid session token version '{0}'")]
    InvalidVersion(String),
    #[error("invalid global LSN '{0}'")]
    InvalidGlobalLsn(String),
    #[error("invalid region id '{0}'")]
    InvalidRegionId(String),
    #[error("invalid regional LSN '{0}'")]
    InvalidRegionLsn(String),
    /// A regional component lacks its `=` separator.
    #[error("regional component '{0}' is not of the form region=lsn")]
    MalformedRegionalComponent(String),
    /// Tokens of the same version disagree on their regions.
    #[error("session tokens are not comparable: current='{current}', other='{other}'")]
    InvalidRegions { current: String, other: String },
    #[error("session tokens cannot be merged: {0}")]
    TokensCannotBeMerged(String),
}

/// An error returned by the driver.
///
/// Errors produced from a service response keep that response, so callers can inspect the
/// original status, headers and diagnostic body.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    response: Option<Box<CosmosResponse>>,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            response: None,
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<Cow<'static, str>>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            response: None,
            source: Some(Arc::new(source)),
        }
    }

    /// Classifies a failed service response.
    ///
    /// Returns `None` when the response is a success.
    pub fn from_response(response: CosmosResponse) -> Option<Self> {
        if http::is_success(response.status()) {
            return None;
        }
        Some(Self::from_failed_response(response))
    }

    /// Passes a successful response through and converts a failed one into an error.
    pub fn check_response(response: CosmosResponse) -> Result<CosmosResponse> {
        if http::is_success(response.status()) {
            Ok(response)
        } else {
            Err(Self::from_failed_response(response))
        }
    }

    fn from_failed_response(response: CosmosResponse) -> Self {
        use crate::constants::{
            SUB_STATUS_PARTITION_KEY_MISMATCH, SUB_STATUS_READ_SESSION_NOT_AVAILABLE,
        };

        let status = response.status();
        let sub_status = response.sub_status();
        let kind = match (status, sub_status) {
            (StatusCode::TooManyRequests, _) => ErrorKind::Throttled {
                retry_after: response
                    .headers()
                    .get_optional_str(&crate::constants::RETRY_AFTER_MS)
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_millis),
            },
            (StatusCode::NotFound, Some(SUB_STATUS_READ_SESSION_NOT_AVAILABLE)) => {
                ErrorKind::SessionNotAvailable
            }
            (StatusCode::BadRequest, Some(SUB_STATUS_PARTITION_KEY_MISMATCH)) => {
                ErrorKind::PartitionKeyMismatch
            }
            _ => ErrorKind::HttpResponse { status, sub_status },
        };

        let code = u16::from(status);
        let message = match sub_status {
            Some(sub_status) => format!(
                "operation failed with status {} (sub-status {})",
                code, sub_status
            ),
            None => format!("operation failed with status {}", code),
        };

        Self {
            kind,
            message: message.into(),
            response: Some(Box::new(response)),
            source: None,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The service response that caused this error, if any.
    pub fn response(&self) -> Option<&CosmosResponse> {
        self.response.as_deref()
    }

    /// The HTTP status of the service response that caused this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(|r| r.status())
    }

    /// Returns `true` for the kinds the retry policies know how to recover from.
    ///
    /// Callers only observe these kinds after the owning policy has exhausted its bound.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Throttled { .. }
                | ErrorKind::SessionNotAvailable
                | ErrorKind::PartitionKeyMismatch
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::DataConversion, "JSON conversion failed", error)
    }
}

impl From<SessionTokenError> for Error {
    fn from(error: SessionTokenError) -> Self {
        Error::with_source(ErrorKind::DataConversion, "invalid session token", error)
    }
}
