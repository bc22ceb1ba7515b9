// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::auth::{HashSigner, HmacSha256Signer, SigningRequest};
use crate::constants;
use crate::error::{Error, ErrorKind, Result};
use crate::http::Headers;
use crate::resource_context::Addressing;
use std::fmt;
use std::sync::Arc;
use time::{format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime};

/// RFC 1123 date format used by `x-ms-date`, e.g. `Tue, 01 Nov 1994 08:12:31 GMT`.
const RFC1123: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// Signs requests with the account master key.
#[derive(Clone)]
pub struct MasterKeyCredential {
    signer: Arc<dyn HashSigner>,
}

impl MasterKeyCredential {
    /// Creates a credential from a base64-encoded account key, signed with HMAC-SHA256.
    pub fn from_key(key: &str) -> Result<Self> {
        Ok(Self::with_signer(Arc::new(HmacSha256Signer::from_base64_key(
            key,
        )?)))
    }

    /// Creates a credential backed by a custom [`HashSigner`].
    pub fn with_signer(signer: Arc<dyn HashSigner>) -> Self {
        Self { signer }
    }

    /// Stamps `x-ms-date` with the current time and returns the signed token.
    pub(crate) fn sign(
        &self,
        request: &SigningRequest<'_>,
        headers: &mut Headers,
    ) -> Result<String> {
        self.sign_at(request, headers, OffsetDateTime::now_utc())
    }

    /// Stamps `x-ms-date` with `now` and returns the unencoded
    /// `type=master&ver=1.0&sig=...` token.
    pub(crate) fn sign_at(
        &self,
        request: &SigningRequest<'_>,
        headers: &mut Headers,
        now: OffsetDateTime,
    ) -> Result<String> {
        let date = now
            .to_offset(time::UtcOffset::UTC)
            .format(RFC1123)
            .map_err(|e| {
                Error::with_source(ErrorKind::DataConversion, "failed to format x-ms-date", e)
            })?;

        let payload = string_to_sign(request, &date);
        let signature = self.signer.sign(payload.as_bytes());
        headers.insert(constants::MS_DATE, date);

        Ok(format!("type=master&ver=1.0&sig={}", signature))
    }
}

/// `verb\nresourceType\nresourceLink\ndate\n\n`, with the verb, resource type and date
/// lowercased. Resource-id links are reduced to the lowercased id of the addressed resource.
fn string_to_sign(request: &SigningRequest<'_>, date: &str) -> String {
    let resource_link = match request.addressing {
        Addressing::Name => request.resource_address.to_string(),
        Addressing::ResourceId => request
            .resource_address
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_lowercase(),
    };

    format!(
        "{}\n{}\n{}\n{}\n\n",
        request.method.as_str().to_lowercase(),
        request.resource_type.path_segment(),
        resource_link,
        date.to_lowercase()
    )
}

impl fmt::Debug for MasterKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKeyCredential { .. }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::{OperationType, ResourceType};
    use std::sync::Mutex;
    use time::macros::datetime;

    /// Records the payloads it is asked to sign.
    #[derive(Default)]
    struct RecordingSigner(Mutex<Vec<String>>);

    impl HashSigner for RecordingSigner {
        fn sign(&self, payload: &[u8]) -> String {
            self.0
                .lock()
                .unwrap()
                .push(String::from_utf8(payload.to_vec()).unwrap());
            "c2lnbmF0dXJl".to_string()
        }
    }

    fn request(address: &str, addressing: Addressing) -> SigningRequest<'_> {
        SigningRequest {
            resource_address: address,
            resource_type: ResourceType::Document,
            addressing,
            method: Method::Get,
            operation: OperationType::Read,
            partition_key: None,
        }
    }

    #[test]
    fn stamps_date_and_builds_payload() {
        let signer = Arc::new(RecordingSigner::default());
        let credential = MasterKeyCredential::with_signer(signer.clone());
        let mut headers = Headers::new();

        let token = credential
            .sign_at(
                &request("dbs/Db1/colls/Coll1/docs/Doc1", Addressing::Name),
                &mut headers,
                datetime!(2017-04-27 00:51:12 UTC),
            )
            .unwrap();

        assert_eq!(token, "type=master&ver=1.0&sig=c2lnbmF0dXJl");
        assert_eq!(
            headers.get_optional_str(&constants::MS_DATE),
            Some("Thu, 27 Apr 2017 00:51:12 GMT")
        );
        assert_eq!(
            signer.0.lock().unwrap()[0],
            "get\ndocs\ndbs/Db1/colls/Coll1/docs/Doc1\nthu, 27 apr 2017 00:51:12 gmt\n\n"
        );
    }

    #[test]
    fn resource_id_links_sign_the_lowercased_id() {
        let signer = Arc::new(RecordingSigner::default());
        let credential = MasterKeyCredential::with_signer(signer.clone());

        credential
            .sign_at(
                &request(
                    "dbs/Zk5uAA==/colls/Zk5uAMSFmQA=/docs/Zk5uAMSFmQABAAAAAAAAAA==",
                    Addressing::ResourceId,
                ),
                &mut Headers::new(),
                datetime!(2017-04-27 00:51:12 UTC),
            )
            .unwrap();

        assert!(signer.0.lock().unwrap()[0].contains("\nzk5uamsfmqabaaaaaaaaaa==\n"));
    }

    #[test]
    fn hmac_signature_matches_known_vector() {
        // Key is base64("secret").
        let credential = MasterKeyCredential::from_key("c2VjcmV0").unwrap();
        let token = credential
            .sign_at(
                &request("dbs/db1", Addressing::Name),
                &mut Headers::new(),
                datetime!(2017-04-27 00:51:12 UTC),
            )
            .unwrap();
        assert_eq!(
            token,
            "type=master&ver=1.0&sig=eSlB6nsaOKDaxMozbpF6LsTwUoiEhQObszqiwI7hRS8="
        );
    }
}
