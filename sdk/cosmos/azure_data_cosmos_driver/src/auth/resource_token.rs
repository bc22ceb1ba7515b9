// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::auth::SigningRequest;
use crate::error::{Error, ErrorKind, Result};
use crate::partition_key::{PartitionKeyInternal, PartitionKeyValue};
use crate::resource_context::{Addressing, ResourceType};
use crate::OperationType;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// A scoped resource token, valid for the partition key range it was issued for.
#[derive(Clone, PartialEq)]
pub struct PartitionKeyAndResourceTokenPair {
    /// The key the token is scoped to. The empty key means the token is not partition-scoped.
    pub partition_key: PartitionKeyInternal,
    pub resource_token: String,
}

impl PartitionKeyAndResourceTokenPair {
    fn covers(&self, partition_key: Option<&PartitionKeyInternal>) -> bool {
        match partition_key {
            Some(key) => self.partition_key.contains(key),
            None => true,
        }
    }
}

impl fmt::Debug for PartitionKeyAndResourceTokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionKeyAndResourceTokenPair")
            .field("partition_key", &self.partition_key)
            .finish_non_exhaustive()
    }
}

/// A permission as returned by the service: the resource it grants access to and its token.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    #[serde(rename = "resource")]
    pub resource_link: String,
    #[serde(rename = "_token")]
    pub token: String,
    #[serde(default)]
    pub resource_partition_key: Option<Vec<serde_json::Value>>,
}

/// Authorizes requests with pre-issued resource tokens.
#[derive(Clone, Default)]
pub struct ResourceTokenCredential {
    tokens: BTreeMap<String, Vec<PartitionKeyAndResourceTokenPair>>,
    literal: Option<String>,
}

impl ResourceTokenCredential {
    pub fn new() -> Self {
        Self::default()
    }

    /// A credential holding one token used for every request.
    pub fn from_literal(token: impl Into<String>) -> Self {
        Self {
            tokens: BTreeMap::new(),
            literal: Some(token.into()),
        }
    }

    /// Adds a token for `resource_link`, optionally scoped to a partition key.
    pub fn with_token(
        mut self,
        resource_link: &str,
        partition_key: Option<PartitionKeyInternal>,
        resource_token: impl Into<String>,
    ) -> Self {
        self.tokens
            .entry(normalize(resource_link))
            .or_default()
            .push(PartitionKeyAndResourceTokenPair {
                partition_key: partition_key.unwrap_or_default(),
                resource_token: resource_token.into(),
            });
        self
    }

    /// Builds a credential from the permissions of a user.
    pub fn from_permissions<'a>(permissions: impl IntoIterator<Item = &'a Permission>) -> Self {
        permissions
            .into_iter()
            .fold(Self::new(), |credential, permission| {
                let partition_key = permission.resource_partition_key.as_ref().map(|values| {
                    PartitionKeyInternal::from_values(
                        values
                            .iter()
                            .map(PartitionKeyValue::from_document_value)
                            .collect(),
                    )
                });
                credential.with_token(&permission.resource_link, partition_key, &permission.token)
            })
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.literal.is_none()
    }

    /// Finds the token authorizing `request`.
    ///
    /// The search order is:
    /// 1. an address that is itself a resource token is returned as-is;
    /// 2. a credential built from a single literal token returns it;
    /// 3. the closest enclosing resource holding a token whose partition scope covers the
    ///    request's key, walking from the target up one path level (two segments) at a time;
    /// 4. for name-based collection-level reads, any token held for a resource inside the
    ///    collection.
    pub(crate) fn resolve<'a>(&'a self, request: &SigningRequest<'a>) -> Result<&'a str> {
        if is_resource_token(request.resource_address) {
            return Ok(request.resource_address);
        }

        if let Some(literal) = &self.literal {
            return Ok(literal);
        }

        let address = normalize(request.resource_address);
        let segments: Vec<&str> = address.split('/').collect();
        let mut depth = segments.len() - segments.len() % 2;
        while depth >= 2 {
            let candidate = segments[..depth].join("/");
            if let Some(pair) = self
                .tokens
                .get(&candidate)
                .and_then(|pairs| pairs.iter().find(|p| p.covers(request.partition_key)))
            {
                return Ok(&pair.resource_token);
            }
            depth -= 2;
        }

        if is_collection_level_read(request) && !address.is_empty() {
            let prefix = format!("{}/", address);
            if let Some(pair) = self
                .tokens
                .range(prefix.clone()..)
                .take_while(|(link, _)| link.starts_with(&prefix))
                .flat_map(|(_, pairs)| pairs.iter())
                .next()
            {
                return Ok(&pair.resource_token);
            }
        }

        Err(Error::new(
            ErrorKind::Unauthorized,
            format!(
                "no resource token authorizes access to '{}'",
                request.resource_address
            ),
        ))
    }
}

fn normalize(link: &str) -> String {
    link.trim_matches('/').to_string()
}

/// Resource tokens start with `type=resource`, possibly percent-encoded.
pub(crate) fn is_resource_token(value: &str) -> bool {
    let lower = value.get(..16).unwrap_or(value).to_ascii_lowercase();
    lower.starts_with("type=resource") || lower.starts_with("type%3dresource")
}

fn is_collection_level_read(request: &SigningRequest<'_>) -> bool {
    request.addressing == Addressing::Name
        && request.operation == OperationType::Read
        && matches!(
            request.resource_type,
            ResourceType::Collection | ResourceType::PartitionKeyRange
        )
}

impl fmt::Debug for ResourceTokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTokenCredential")
            .field("resources", &self.tokens.keys().collect::<Vec<_>>())
            .field("literal", &self.literal.is_some())
            .finish()
    }
}
