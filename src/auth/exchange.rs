//! OAuth2 JWT-bearer token exchange.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error};

use super::assertion::Assertion;
use crate::credential::ServiceAccountCredential;
use crate::{Error, ErrorContext, Result};

/// Grant type for exchanging a signed assertion (RFC 7523).
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Bearer token returned by the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    token_type: Option<String>,
    expires_in: Option<u64>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: None,
            expires_in: None,
        }
    }

    pub fn with_expires_in(mut self, secs: u64) -> Self {
        self.expires_in = Some(secs);
        self
    }

    pub fn secret(&self) -> &str {
        &self.token
    }

    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }

    /// Lifetime in seconds as reported by the token endpoint.
    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Only `access_token` is required; the optional fields are read leniently
/// and dropped when they have an unexpected shape.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    token_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_secs")]
    expires_in: Option<u64>,
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

/// Accepts `3599` or `"3599"`.
fn lenient_secs<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Trades a signed assertion for an access token. Performs no retries.
#[derive(Debug, Clone)]
pub struct TokenExchangeClient {
    http_client: reqwest::Client,
}

impl TokenExchangeClient {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::configuration_with_context(
                    format!("Failed to create HTTP client: {}", e),
                    ErrorContext::new().with_source("token_exchange"),
                )
            })?;
        Ok(Self { http_client })
    }

    pub async fn exchange(
        &self,
        credential: &ServiceAccountCredential,
        assertion: &Assertion,
    ) -> Result<AccessToken> {
        let params = [
            ("grant_type", JWT_BEARER_GRANT_TYPE),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http_client
            .post(credential.token_uri())
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, token_uri = credential.token_uri(), "Token request failed");
                Error::TokenExchangeRejected {
                    status: e.status().map(|s| s.as_u16()),
                    message: format!("token request failed: {}", e),
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| Error::TokenExchangeRejected {
            status: Some(status.as_u16()),
            message: format!("failed to read token response: {}", e),
        })?;

        if !status.is_success() {
            error!(status = status.as_u16(), "Token endpoint rejected the assertion");
            return Err(Error::TokenExchangeRejected {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let token = parse_token_response(&body)?;
        debug!(expires_in = ?token.expires_in(), "access token obtained");
        Ok(token)
    }
}

fn parse_token_response(body: &str) -> Result<AccessToken> {
    let response: TokenResponse =
        serde_json::from_str(body).map_err(|e| Error::TokenResponseMalformed {
            message: format!("token response could not be parsed: {}", e),
        })?;

    match response.access_token {
        Some(token) if !token.is_empty() => Ok(AccessToken {
            token,
            token_type: response.token_type,
            expires_in: response.expires_in,
        }),
        Some(_) => Err(Error::TokenResponseMalformed {
            message: "access_token is empty".to_string(),
        }),
        None => Err(Error::TokenResponseMalformed {
            message: "access_token missing from token response".to_string(),
        }),
    }
}
