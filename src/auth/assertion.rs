//! Self-signed JWT assertion for the OAuth2 JWT-bearer grant.
//!
//! The assertion is `base64url(header).base64url(claims).base64url(signature)`
//! where the signature is RSASSA-PKCS1-v1_5 over SHA-256 of the first two
//! segments. PKCS#1 v1.5 signing is deterministic, so the same credential and
//! timestamp always produce the same assertion.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

use crate::credential::ServiceAccountCredential;
use crate::{Error, ErrorContext, Result};

/// OAuth2 scope granting access to Google Cloud APIs.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Validity window of an assertion, in seconds.
pub const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// JOSE header. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

impl Default for JwtHeader {
    fn default() -> Self {
        Self {
            alg: "RS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Claims asserted by the service account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The service account's email address.
    pub iss: String,
    /// Space-delimited OAuth2 scopes requested.
    pub scope: String,
    /// The token endpoint the assertion is presented to.
    pub aud: String,
    /// Issued-at, Unix seconds.
    pub iat: u64,
    /// Expiry, Unix seconds. Always `iat + ASSERTION_LIFETIME_SECS`.
    pub exp: u64,
}

/// A signed assertion, ready to send to the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Assertion {
    header: JwtHeader,
    claims: Claims,
    encoded: String,
    signing_input_len: usize,
}

impl Assertion {
    pub fn header(&self) -> &JwtHeader {
        &self.header
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// The full `header.payload.signature` string.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// The `header.payload` prefix that was signed.
    pub fn signing_input(&self) -> &str {
        &self.encoded[..self.signing_input_len]
    }

    /// The base64url signature segment.
    pub fn signature(&self) -> &str {
        &self.encoded[self.signing_input_len + 1..]
    }
}

impl fmt::Debug for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assertion")
            .field("header", &self.header)
            .field("claims", &self.claims)
            .field("signature", &"<redacted>")
            .finish()
    }
}

/// Source of the current time, injectable for deterministic tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub SystemTime);

impl FixedClock {
    pub fn from_unix_secs(secs: u64) -> Self {
        Self(UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// Builds RS256 assertions for a service account.
#[derive(Debug, Clone)]
pub struct AssertionBuilder {
    scope: String,
}

impl AssertionBuilder {
    pub fn new() -> Self {
        Self {
            scope: CLOUD_PLATFORM_SCOPE.to_string(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn build(&self, credential: &ServiceAccountCredential, now: SystemTime) -> Result<Assertion> {
        let iat = now
            .duration_since(UNIX_EPOCH)
            .map_err(|_| {
                Error::validation_with_context(
                    "assertion time precedes the Unix epoch",
                    ErrorContext::new().with_source("assertion_builder"),
                )
            })?
            .as_secs();

        let header = JwtHeader::default();
        let claims = Claims {
            iss: credential.client_email().to_string(),
            scope: self.scope.clone(),
            aud: credential.token_uri().to_string(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let signing_input = format!(
            "{}.{}",
            encode_segment(&header, "header")?,
            encode_segment(&claims, "claims")?
        );
        let signature = jsonwebtoken::crypto::sign(
            signing_input.as_bytes(),
            credential.signing_key(),
            Algorithm::RS256,
        )
        .map_err(|e| Error::KeyExtraction {
            message: format!("cannot sign with the service account key: {}", e),
        })?;

        let signing_input_len = signing_input.len();
        let mut encoded = signing_input;
        encoded.push('.');
        encoded.push_str(&signature);

        Ok(Assertion {
            header,
            claims,
            encoded,
            signing_input_len,
        })
    }
}

impl Default for AssertionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_segment<T: Serialize>(value: &T, name: &str) -> Result<String> {
    let json = serde_json::to_vec(value).map_err(|e| {
        Error::validation_with_context(
            format!("failed to serialize JWT {}: {}", name, e),
            ErrorContext::new().with_source("assertion_builder"),
        )
    })?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}
