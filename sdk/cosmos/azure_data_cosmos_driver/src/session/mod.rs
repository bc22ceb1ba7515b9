// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Session consistency tracking.

pub mod container;
pub mod partition;
#[allow(clippy::module_inception)]
pub mod session;
pub mod vector;

pub use crate::error::SessionTokenError as Error;
pub use container::*;
pub use partition::*;
pub use session::*;
pub use vector::*;

use crate::http::Headers;
use crate::{CollectionIdentity, ResourceId};

/// Reads and writes the session token associated with a collection.
///
/// The request pipeline attaches [`get_token`](Self::get_token) to outgoing requests executing
/// with session consistency, and feeds every response that carries session state to
/// [`set_token`](Self::set_token). Tokens are never invented client-side.
pub trait SessionTokenTracker: Send + Sync {
    /// The container session token to send for `collection`, if one is tracked.
    fn get_token(&self, collection: &CollectionIdentity) -> Option<String>;

    /// Captures the session token from `response_headers`, if present.
    fn set_token(&self, collection: &CollectionIdentity, response_headers: &Headers);

    /// Forgets all session state for `collection`.
    fn clear_token(&self, collection: &CollectionIdentity);

    /// The resource id the tracker last saw for a name-based collection link.
    fn tracked_resource_id(&self, name_link: &str) -> Option<ResourceId>;
}
