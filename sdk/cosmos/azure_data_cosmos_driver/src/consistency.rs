// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Consistency levels and the rules for negotiating them against the account.

use crate::error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A consistency level, ordered from weakest (`Eventual`) to strongest (`Strong`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    Strong,
    BoundedStaleness,
    Session,
    ConsistentPrefix,
    Eventual,
}

impl ConsistencyLevel {
    fn strength(&self) -> u8 {
        match self {
            ConsistencyLevel::Eventual => 0,
            ConsistencyLevel::ConsistentPrefix => 1,
            ConsistencyLevel::Session => 2,
            ConsistencyLevel::BoundedStaleness => 3,
            ConsistencyLevel::Strong => 4,
        }
    }

    /// The value sent in the `x-ms-consistency-level` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Strong => "Strong",
            ConsistencyLevel::BoundedStaleness => "BoundedStaleness",
            ConsistencyLevel::Session => "Session",
            ConsistencyLevel::ConsistentPrefix => "ConsistentPrefix",
            ConsistencyLevel::Eventual => "Eventual",
        }
    }
}

impl PartialOrd for ConsistencyLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConsistencyLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.strength().cmp(&other.strength())
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of negotiating a request's consistency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedConsistency {
    /// The level the request will execute with.
    pub effective: ConsistencyLevel,
    /// The value to send in `x-ms-consistency-level`, present only when it differs from the
    /// account default.
    pub header: Option<ConsistencyLevel>,
}

/// Validates requested consistency levels against the account's configured level.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyNegotiator {
    allow_stronger_than_account: bool,
}

impl ConsistencyNegotiator {
    pub fn new(allow_stronger_than_account: bool) -> Self {
        Self {
            allow_stronger_than_account,
        }
    }

    /// Rejects `requested` if it is stronger than `account_default`, unless the client was built
    /// to allow stronger-than-configured levels.
    pub fn validate(
        &self,
        requested: ConsistencyLevel,
        account_default: ConsistencyLevel,
    ) -> Result<()> {
        if self.allow_stronger_than_account || requested <= account_default {
            return Ok(());
        }

        Err(Error::new(
            ErrorKind::InvalidConsistencyLevel,
            format!(
                "consistency level '{}' is stronger than the account's configured level '{}'",
                requested, account_default
            ),
        ))
    }

    /// Resolves the level for one request.
    ///
    /// A per-request override wins over the client default. Both the client default and the
    /// override must pass [`validate`](Self::validate), so a client configured stronger than its
    /// account fails every request. When the account default is unknown (the client has not
    /// finished bootstrapping) validation is left to the service.
    pub fn negotiate(
        &self,
        request_override: Option<ConsistencyLevel>,
        client_default: Option<ConsistencyLevel>,
        account_default: Option<ConsistencyLevel>,
    ) -> Result<Option<NegotiatedConsistency>> {
        if let (Some(client_default), Some(account)) = (client_default, account_default) {
            self.validate(client_default, account)?;
        }

        let requested = request_override.or(client_default);
        match (requested, account_default) {
            (Some(requested), Some(account)) => {
                self.validate(requested, account)?;
                Ok(Some(NegotiatedConsistency {
                    effective: requested,
                    header: (requested != account).then_some(requested),
                }))
            }
            (None, Some(account)) => Ok(Some(NegotiatedConsistency {
                effective: account,
                header: None,
            })),
            (Some(requested), None) => Ok(Some(NegotiatedConsistency {
                effective: requested,
                header: Some(requested),
            })),
            (None, None) => Ok(None),
        }
    }
}
