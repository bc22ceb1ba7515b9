// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Vector session tokens.

use std::{collections::BTreeMap, fmt, str::FromStr};

use super::Error;
use crate::{Lsn, RegionId};

/// The progress marker of one partition: a format version, the global LSN, and the LSN reached
/// in each region.
///
/// The string format is `{version}#{globalLsn}[#{regionId}={regionLsn}]*`, for example
/// `1#123#4=500#5=600`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorSessionToken {
    /// The version of the token, incremented when the set of regions changes.
    pub version: u64,

    /// The global logical sequence number.
    pub global_lsn: Lsn,

    /// The logical sequence number reached in each region.
    pub regional_lsns: BTreeMap<RegionId, Lsn>,
}

impl FromStr for VectorSessionToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut parts = s.split('#');
        let version_str = parts.next().unwrap_or_default();
        let global_lsn_str = parts.next().ok_or(Error::MissingComponents)?;

        let version = parse_digits::<u64>(version_str)
            .ok_or_else(|| Error::InvalidVersion(version_str.to_string()))?;
        if global_lsn_str.is_empty() {
            return Err(Error::MissingComponents);
        }
        let global_lsn = parse_digits::<u64>(global_lsn_str)
            .map(Lsn::new)
            .ok_or_else(|| Error::InvalidGlobalLsn(global_lsn_str.to_string()))?;

        let mut regional_lsns = BTreeMap::new();
        for component in parts {
            let (region_str, lsn_str) = component
                .split_once('=')
                .filter(|(region, lsn)| !region.is_empty() && !lsn.is_empty())
                .ok_or_else(|| Error::MalformedRegionalComponent(component.to_string()))?;

            let region = parse_digits::<u32>(region_str)
                .map(RegionId::new)
                .ok_or_else(|| Error::InvalidRegionId(region_str.to_string()))?;
            let lsn = parse_digits::<u64>(lsn_str)
                .map(Lsn::new)
                .ok_or_else(|| Error::InvalidRegionLsn(lsn_str.to_string()))?;

            regional_lsns.insert(region, lsn);
        }

        Ok(VectorSessionToken {
            version,
            global_lsn,
            regional_lsns,
        })
    }
}

/// Parses ASCII digits only; signs and whitespace accepted by `str::parse` are rejected.
fn parse_digits<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl VectorSessionToken {
    /// Returns `true` if this token has made at least as much progress as `other`.
    ///
    /// Tokens with the same version must name the same regions to be comparable.
    pub fn is_at_least(&self, other: &VectorSessionToken) -> Result<bool, Error> {
        if self.version != other.version {
            return Ok(self.version > other.version);
        }

        if self.regional_lsns.len() != other.regional_lsns.len()
            || self
                .regional_lsns
                .keys()
                .any(|region| !other.regional_lsns.contains_key(region))
        {
            return Err(Error::InvalidRegions {
                current: self.to_string(),
                other: other.to_string(),
            });
        }

        Ok(self.global_lsn >= other.global_lsn
            && self
                .regional_lsns
                .iter()
                .all(|(region, lsn)| *lsn >= other.regional_lsns[region]))
    }

    /// Merges this token with another token to create a token representing the highest progress
    /// from both. This operation is commutative.
    pub fn merge(self, other: VectorSessionToken) -> Result<VectorSessionToken, Error> {
        let (higher, lower) = if self.version >= other.version {
            (self, other)
        } else {
            (other, self)
        };

        if higher.version == lower.version {
            if !higher.regional_lsns.keys().eq(lower.regional_lsns.keys()) {
                return Err(Error::TokensCannotBeMerged(
                    "tokens have same version but different regions".to_string(),
                ));
            }

            let regional_lsns = higher
                .regional_lsns
                .iter()
                .map(|(region, lsn)| (*region, (*lsn).max(lower.regional_lsns[region])))
                .collect();
            return Ok(VectorSessionToken {
                version: higher.version,
                global_lsn: higher.global_lsn.max(lower.global_lsn),
                regional_lsns,
            });
        }

        // The higher version defines the region set; shared regions keep the larger LSN.
        let mut regional_lsns = higher.regional_lsns;
        for (region, lower_lsn) in &lower.regional_lsns {
            if let Some(lsn) = regional_lsns.get_mut(region) {
                *lsn = (*lsn).max(*lower_lsn);
            }
        }

        Ok(VectorSessionToken {
            version: higher.version,
            global_lsn: higher.global_lsn,
            regional_lsns,
        })
    }
}

impl fmt::Display for VectorSessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.version, self.global_lsn.value())?;

        for (region_id, region_lsn) in &self.regional_lsns {
            write!(f, "#{}={}", region_id.value(), region_lsn.value())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_token_with_regions() {
        let token: VectorSessionToken = "3#3000#100=1500#200=2500".parse().unwrap();

        assert_eq!(token.version, 3);
        assert_eq!(token.global_lsn, Lsn::new(3000));
        assert_eq!(token.regional_lsns[&RegionId::new(100)], Lsn::new(1500));
        assert_eq!(token.regional_lsns[&RegionId::new(200)], Lsn::new(2500));
    }

    #[test]
    fn parse_rejects_malformed_tokens() {
        assert_eq!(
            "".parse::<VectorSessionToken>().unwrap_err(),
            Error::EmptyInput
        );
        assert_eq!(
            "1".parse::<VectorSessionToken>().unwrap_err(),
            Error::MissingComponents
        );
        assert_eq!(
            "+1#1000".parse::<VectorSessionToken>().unwrap_err(),
            Error::InvalidVersion("+1".to_string())
        );
        assert_eq!(
            "1#1000#100".parse::<VectorSessionToken>().unwrap_err(),
            Error::MalformedRegionalComponent("100".to_string())
        );
        assert_eq!(
            "1#1000#4294967296=1".parse::<VectorSessionToken>().unwrap_err(),
            Error::InvalidRegionId("4294967296".to_string())
        );
    }

    #[test]
    fn display_orders_regions() {
        let token: VectorSessionToken = "2#2000#200=2500#100=1500".parse().unwrap();
        assert_eq!(token.to_string(), "2#2000#100=1500#200=2500");
    }

    #[test]
    fn higher_version_is_further_ahead() {
        let current: VectorSessionToken = "2#500".parse().unwrap();
        let other: VectorSessionToken = "1#1000".parse().unwrap();
        assert!(current.is_at_least(&other).unwrap());
        assert!(!other.is_at_least(&current).unwrap());
    }

    #[test]
    fn same_version_compares_every_lsn() {
        let current: VectorSessionToken = "1#1000#100=500".parse().unwrap();
        let other: VectorSessionToken = "1#900#100=600".parse().unwrap();
        assert!(!current.is_at_least(&other).unwrap());
        assert!(!other.is_at_least(&current).unwrap());

        let mismatched: VectorSessionToken = "1#1000#200=500".parse().unwrap();
        assert!(matches!(
            current.is_at_least(&mismatched),
            Err(Error::InvalidRegions { .. })
        ));
    }

    #[test]
    fn merge_same_version_takes_max_values() {
        let token1: VectorSessionToken = "2#1000#100=500#200=600".parse().unwrap();
        let token2: VectorSessionToken = "2#1200#100=800#200=400".parse().unwrap();

        let merged = token1.clone().merge(token2.clone()).unwrap();
        assert_eq!(merged.to_string(), "2#1200#100=800#200=600");
        assert_eq!(merged, token2.merge(token1).unwrap());
    }

    #[test]
    fn merge_different_versions_keeps_higher_region_set() {
        let token1: VectorSessionToken = "1#1000#100=900".parse().unwrap();
        let token2: VectorSessionToken = "2#1200#100=800#200=600".parse().unwrap();

        let merged = token1.merge(token2).unwrap();
        assert_eq!(merged.to_string(), "2#1200#100=900#200=600");
    }

    #[test]
    fn merge_same_version_incompatible_regions_fails() {
        let token1: VectorSessionToken = "2#1000#100=500".parse().unwrap();
        let token2: VectorSessionToken = "2#1200#200=600".parse().unwrap();

        assert!(matches!(
            token1.merge(token2),
            Err(Error::TokensCannotBeMerged(_))
        ));
    }
}
