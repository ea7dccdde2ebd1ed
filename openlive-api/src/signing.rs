//! Request signing.
//!
//! Each request carries six `x-bili-*` headers. Sorted by name and joined
//! as `name:value` lines, they form the canonical string whose
//! HMAC-SHA256 (keyed by the access secret, hex encoded) goes into the
//! `Authorization` header.

use crate::error::ApiError;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_TIMESTAMP: &str = "x-bili-timestamp";
pub const HEADER_SIGNATURE_METHOD: &str = "x-bili-signature-method";
pub const HEADER_SIGNATURE_NONCE: &str = "x-bili-signature-nonce";
pub const HEADER_ACCESS_KEY_ID: &str = "x-bili-accesskeyid";
pub const HEADER_SIGNATURE_VERSION: &str = "x-bili-signature-version";
pub const HEADER_CONTENT_MD5: &str = "x-bili-content-md5";

const SIGNATURE_METHOD: &str = "HMAC-SHA256";
const SIGNATURE_VERSION: &str = "1.0";

/// Access key pair issued by the platform.
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    access_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

/// Signed header set for one request body.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    /// The `x-bili-*` headers, sorted by name.
    pub headers: BTreeMap<&'static str, String>,
    /// Value of the `Authorization` header.
    pub authorization: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, access_secret: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            access_secret: access_secret.into(),
        }
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Signs `body` with the current time and a fresh nonce.
    pub fn sign_now(&self, body: &[u8]) -> Result<SignedHeaders, ApiError> {
        let timestamp = chrono::Utc::now().timestamp();
        let nonce = uuid::Uuid::new_v4().to_string();
        self.sign(body, timestamp, &nonce)
    }

    /// Signs `body` with an explicit timestamp (unix seconds) and nonce.
    pub fn sign(&self, body: &[u8], timestamp: i64, nonce: &str) -> Result<SignedHeaders, ApiError> {
        let mut headers = BTreeMap::new();
        headers.insert(HEADER_TIMESTAMP, timestamp.to_string());
        headers.insert(HEADER_SIGNATURE_METHOD, SIGNATURE_METHOD.to_string());
        headers.insert(HEADER_SIGNATURE_NONCE, nonce.to_string());
        headers.insert(HEADER_ACCESS_KEY_ID, self.access_key.clone());
        headers.insert(HEADER_SIGNATURE_VERSION, SIGNATURE_VERSION.to_string());
        headers.insert(HEADER_CONTENT_MD5, content_md5(body));

        let canonical = canonical_string(&headers);
        let authorization = hmac_sha256_hex(self.access_secret.as_bytes(), canonical.as_bytes())?;

        Ok(SignedHeaders {
            headers,
            authorization,
        })
    }
}

/// Hex MD5 of a request body.
pub fn content_md5(body: &[u8]) -> String {
    hex::encode(Md5::digest(body))
}

/// Joins headers as `name:value` lines in name order, without a trailing
/// newline.
pub fn canonical_string(headers: &BTreeMap<&'static str, String>) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}:{}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hex HMAC-SHA256 of `data` keyed by `secret`.
pub fn hmac_sha256_hex(secret: &[u8], data: &[u8]) -> Result<String, ApiError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| ApiError::InvalidSecret)?;
    mac.update(data);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
