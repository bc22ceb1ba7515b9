// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! HTTP types shared by the request pipeline and its transports.

mod response;

pub use azure_core::http::headers::{HeaderName, HeaderValue, Headers};
pub use azure_core::http::{Method, StatusCode};
pub use response::*;

/// Whether `status` completes an operation. Cosmos DB answers conditional reads that found no
/// change with `304`, which is not a failure.
pub(crate) fn is_success(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::NotModified
}

/// A copy of `headers` without `name`.
pub(crate) fn without_header(headers: &Headers, name: &HeaderName) -> Headers {
    headers
        .iter()
        .filter(|(n, _)| *n != name)
        .map(|(n, v)| (n.clone(), v.clone()))
        .collect::<std::collections::HashMap<_, _>>()
        .into()
}
