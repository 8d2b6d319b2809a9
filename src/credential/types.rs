//! Service-account credential types.

use std::fmt;

use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use url::Url;

use crate::{Error, ErrorContext, Result};

const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// The subset of a service-account key file this crate reads; other keys
/// (`client_id`, `auth_uri`, certificate URLs) are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceAccountFile {
    #[serde(rename = "type")]
    kind: Option<String>,
    project_id: Option<String>,
    private_key_id: Option<String>,
    private_key: String,
    client_email: String,
    token_uri: String,
}

/// Parsed, immutable service-account identity.
#[derive(Clone)]
pub struct ServiceAccountCredential {
    client_email: String,
    token_uri: String,
    project_id: Option<String>,
    private_key_id: Option<String>,
    signing_key: EncodingKey,
}

impl ServiceAccountCredential {
    /// Parses a service-account JSON document.
    ///
    /// The private key must be a PEM-encoded RSA key (PKCS#8 as issued by
    /// Google, PKCS#1 is accepted as well).
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ServiceAccountFile = serde_json::from_str(json).map_err(|e| {
            Error::credential_malformed(
                format!("invalid service account JSON: {}", e),
                ErrorContext::new().with_source("credential_store"),
            )
        })?;

        if let Some(kind) = file.kind.as_deref() {
            if kind != SERVICE_ACCOUNT_TYPE {
                return Err(Error::credential_malformed(
                    format!("unsupported credential type '{}'", kind),
                    ErrorContext::new()
                        .with_field_path("type")
                        .with_details(format!("expected '{}'", SERVICE_ACCOUNT_TYPE)),
                ));
            }
        }

        let client_email = required(file.client_email, "client_email")?;
        let token_uri = required(file.token_uri, "token_uri")?;
        Url::parse(&token_uri).map_err(|e| {
            Error::credential_malformed(
                format!("token_uri is not an absolute URL: {}", e),
                ErrorContext::new()
                    .with_field_path("token_uri")
                    .with_details(token_uri.clone()),
            )
        })?;

        let private_key = required(file.private_key, "private_key")?;
        let signing_key = EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| {
            Error::credential_malformed(
                format!("private key is not a usable RSA PEM key: {}", e),
                ErrorContext::new().with_field_path("private_key"),
            )
        })?;

        Ok(Self {
            client_email,
            token_uri,
            project_id: file.project_id,
            private_key_id: file.private_key_id,
            signing_key,
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn private_key_id(&self) -> Option<&str> {
        self.private_key_id.as_deref()
    }

    pub(crate) fn signing_key(&self) -> &EncodingKey {
        &self.signing_key
    }
}

impl fmt::Debug for ServiceAccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredential")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

fn required(value: String, field: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::credential_malformed(
            format!("{} must not be empty", field),
            ErrorContext::new().with_field_path(field),
        ));
    }
    Ok(value)
}
