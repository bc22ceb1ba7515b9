// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Header names and wire constants of the Cosmos DB REST protocol.

use crate::http::HeaderName;

pub use azure_core::http::headers::{AUTHORIZATION, IF_MATCH, MS_DATE, VERSION};

pub const IF_NONE_MATCH: HeaderName = HeaderName::from_static("if-none-match");
pub const PARTITION_KEY: HeaderName = HeaderName::from_static("x-ms-documentdb-partitionkey");
pub const CONSISTENCY_LEVEL: HeaderName = HeaderName::from_static("x-ms-consistency-level");
pub const SESSION_TOKEN: HeaderName = HeaderName::from_static("x-ms-session-token");
pub const IS_UPSERT: HeaderName = HeaderName::from_static("x-ms-documentdb-is-upsert");
pub const ACTIVITY_ID: HeaderName = HeaderName::from_static("x-ms-activity-id");
pub const CONTENT_SERIALIZATION_FORMAT: HeaderName =
    HeaderName::from_static("x-ms-documentdb-content-serialization-format");
pub const RETRY_AFTER_MS: HeaderName = HeaderName::from_static("x-ms-retry-after-ms");
pub const SUB_STATUS: HeaderName = HeaderName::from_static("x-ms-substatus");
pub const REQUEST_CHARGE: HeaderName = HeaderName::from_static("x-ms-request-charge");
pub const IS_QUERY: HeaderName = HeaderName::from_static("x-ms-documentdb-isquery");

/// The REST API version stamped on every request.
pub const API_VERSION: &str = "2018-12-31";

/// Sub-status returned with `404 Not Found` when the replica cannot yet serve the requested session.
pub const SUB_STATUS_READ_SESSION_NOT_AVAILABLE: u32 = 1002;

/// Sub-status returned with `400 Bad Request` when the partition key does not match the routed partition.
pub const SUB_STATUS_PARTITION_KEY_MISMATCH: u32 = 1001;
