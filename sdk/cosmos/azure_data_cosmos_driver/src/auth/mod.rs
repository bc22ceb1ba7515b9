// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Request authorization.
//!
//! A driver is constructed with exactly one [`AuthorizationProvider`], which computes the
//! `authorization` header for every attempt of every request.

mod master_key;
mod resource_token;
mod signer;

pub use master_key::MasterKeyCredential;
pub use resource_token::{PartitionKeyAndResourceTokenPair, Permission, ResourceTokenCredential};
pub use signer::{HashSigner, HmacSha256Signer};

use crate::error::Result;
use crate::http::{Headers, Method};
use crate::partition_key::PartitionKeyInternal;
use crate::resource_context::{Addressing, ResourceType};
use crate::OperationType;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped by `encodeURIComponent`-style encoding.
const TOKEN_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// The parts of a request that determine its authorization.
#[derive(Clone, Copy, Debug)]
pub struct SigningRequest<'a> {
    /// The path of the addressed resource, without leading or trailing slashes.
    pub resource_address: &'a str,
    pub resource_type: ResourceType,
    pub addressing: Addressing,
    pub method: Method,
    pub operation: OperationType,
    pub partition_key: Option<&'a PartitionKeyInternal>,
}

/// Which kind of credential a driver authorizes with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationMode {
    MasterKey,
    ResourceToken,
}

/// Computes the `authorization` header value.
#[derive(Clone, Debug)]
pub enum AuthorizationProvider {
    MasterKey(MasterKeyCredential),
    ResourceTokens(ResourceTokenCredential),
}

impl AuthorizationProvider {
    pub fn mode(&self) -> AuthorizationMode {
        match self {
            AuthorizationProvider::MasterKey(_) => AuthorizationMode::MasterKey,
            AuthorizationProvider::ResourceTokens(_) => AuthorizationMode::ResourceToken,
        }
    }

    /// Returns the URL-encoded header value for `request`.
    ///
    /// Master key signing also stamps `x-ms-date` on `headers`.
    pub fn sign(&self, request: &SigningRequest<'_>, headers: &mut Headers) -> Result<String> {
        match self {
            AuthorizationProvider::MasterKey(credential) => {
                let token = credential.sign(request, headers)?;
                Ok(encode_token(&token))
            }
            AuthorizationProvider::ResourceTokens(credential) => {
                let token = credential.resolve(request)?;
                // Tokens handed out by the service are usually already encoded.
                if token.contains('%') {
                    Ok(token.to_string())
                } else {
                    Ok(encode_token(token))
                }
            }
        }
    }
}

impl From<MasterKeyCredential> for AuthorizationProvider {
    fn from(credential: MasterKeyCredential) -> Self {
        AuthorizationProvider::MasterKey(credential)
    }
}

impl From<ResourceTokenCredential> for AuthorizationProvider {
    fn from(credential: ResourceTokenCredential) -> Self {
        AuthorizationProvider::ResourceTokens(credential)
    }
}

fn encode_token(token: &str) -> String {
    utf8_percent_encode(token, TOKEN_ENCODE_SET).to_string()
}
