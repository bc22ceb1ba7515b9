// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::error::{Error, ErrorKind, Result};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

/// Computes the keyed hash used by master key signatures.
pub trait HashSigner: Send + Sync {
    /// Signs `payload` and returns the base64-encoded signature.
    fn sign(&self, payload: &[u8]) -> String;
}

/// HMAC-SHA256 over an account key.
#[derive(Clone)]
pub struct HmacSha256Signer {
    key: Vec<u8>,
}

impl HmacSha256Signer {
    /// Creates a signer from a base64-encoded account key.
    pub fn from_base64_key(key: &str) -> Result<Self> {
        let key = base64::engine::general_purpose::STANDARD
            .decode(key.trim())
            .map_err(|e| {
                Error::with_source(ErrorKind::Argument, "the account key is not valid base64", e)
            })?;
        if key.is_empty() {
            return Err(Error::new(ErrorKind::Argument, "the account key is empty"));
        }
        Ok(Self { key })
    }
}

impl HashSigner for HmacSha256Signer {
    fn sign(&self, payload: &[u8]) -> String {
        // HMAC accepts keys of any length, so construction cannot fail.
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key)
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
        mac.update(payload);
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }
}

impl fmt::Debug for HmacSha256Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HmacSha256Signer { key: <redacted> }")
    }
}
