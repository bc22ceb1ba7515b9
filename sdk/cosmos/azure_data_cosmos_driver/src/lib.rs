// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

#![doc = include_str!("../README.md")]
// Docs.rs build is done with the nightly compiler, so we can enable nightly features in that build.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(docsrs, feature(doc_cfg_hide))]

pub mod auth;
pub mod cache;
mod client;
pub mod consistency;
pub mod constants;
mod error;
pub mod http;
mod ids;
mod initialization;
pub mod models;
mod options;
mod partition_key;
pub(crate) mod pipeline;
pub mod request;
pub mod resource_context;
pub mod retry;
pub mod routing;
pub mod session;
pub mod transport;

#[doc(inline)]
pub use client::{CosmosDriver, CosmosDriverBuilder};

pub use consistency::ConsistencyLevel;
pub use error::{Error, ErrorKind, Result};
pub use ids::*;
pub use initialization::{AccountContext, AccountReader, Bootstrapper, InitializationState};
pub use options::*;
pub use partition_key::*;
pub use request::{CosmosRequest, OperationType};
pub use resource_context::{ResourceLink, ResourceType};
