// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::constants;
use crate::error::{Error, ErrorKind, Result};
use crate::http::{Headers, StatusCode};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::fmt;

/// A response returned by a transport.
///
/// The response is fully buffered: transports collect the body before handing the response to the
/// pipeline, so the pipeline can inspect the status and headers, capture session state, and still
/// hand the original payload back to the caller.
#[derive(Clone)]
pub struct CosmosResponse {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
}

impl CosmosResponse {
    /// Create a response from raw bytes.
    pub fn from_bytes(status: StatusCode, headers: Headers, bytes: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: bytes.into(),
        }
    }

    /// Get the status code from the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the headers from the response.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Gets the raw body of the response.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deconstruct the response into its components.
    pub fn deconstruct(self) -> (StatusCode, Headers, Bytes) {
        (self.status, self.headers, self.body)
    }

    /// Consumes the response and returns the raw body.
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Deserialize the JSON body of the response into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            Error::with_source(
                ErrorKind::DataConversion,
                "failed to deserialize response body",
                e,
            )
        })
    }

    /// The `x-ms-substatus` value, if the service sent one.
    pub fn sub_status(&self) -> Option<u32> {
        self.headers
            .get_optional_str(&constants::SUB_STATUS)
            .and_then(|v| v.trim().parse().ok())
    }

    /// The session token returned by the service, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.headers.get_optional_str(&constants::SESSION_TOKEN)
    }

    /// The request units charged for the operation.
    pub fn request_charge(&self) -> Option<f64> {
        self.headers
            .get_optional_str(&constants::REQUEST_CHARGE)
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn activity_id(&self) -> Option<&str> {
        self.headers.get_optional_str(&constants::ACTIVITY_ID)
    }
}

impl fmt::Debug for CosmosResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The body may contain user data, so only its length is printed.
        f.debug_struct("CosmosResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}
