// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Partition-scoped session tokens.

use super::Error;
use crate::{session::VectorSessionToken, PartitionKeyRangeId};
use std::fmt;
use std::str::FromStr;

/// A session token for one partition key range.
///
/// The string format is `{pkrange_id}:{vector_session_token}`, for example `42:1#123#4=500`.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSessionToken {
    /// The partition key range this token applies to.
    pub pkrange_id: PartitionKeyRangeId,

    /// The progress reached in that range.
    pub vector_token: VectorSessionToken,
}

impl PartitionSessionToken {
    /// Combines two tokens for the same range, keeping the highest progress of each.
    ///
    /// When the tokens cannot be merged (same version, different regions) the one with the higher
    /// global LSN is kept, so a range never moves backwards.
    pub fn merge(self, other: PartitionSessionToken) -> PartitionSessionToken {
        debug_assert_eq!(self.pkrange_id, other.pkrange_id);
        let pkrange_id = self.pkrange_id;
        let vector_token = match self.vector_token.clone().merge(other.vector_token.clone()) {
            Ok(merged) => merged,
            Err(_) if other.vector_token.global_lsn > self.vector_token.global_lsn => {
                other.vector_token
            }
            Err(_) => self.vector_token,
        };
        PartitionSessionToken {
            pkrange_id,
            vector_token,
        }
    }
}

impl FromStr for PartitionSessionToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::EmptyInput);
        }

        let (pkrange_part, vector_part) = s
            .split_once(':')
            .filter(|(pkrange, vector)| !pkrange.is_empty() && !vector.is_empty())
            .ok_or(Error::MissingComponents)?;

        Ok(PartitionSessionToken {
            pkrange_id: PartitionKeyRangeId::new(pkrange_part),
            vector_token: vector_part.parse()?,
        })
    }
}

impl fmt::Display for PartitionSessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pkrange_id.value(), self.vector_token)
    }
}
