//! Memoizing credential store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error};

use super::types::ServiceAccountCredential;
use crate::{Error, ErrorContext, Result};

/// Environment variable holding the service-account key file path, or the
/// key document itself.
pub const CREDENTIALS_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Where the service-account document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Path to a service-account JSON key file.
    File(PathBuf),
    /// Service-account JSON content provided directly.
    Json(String),
    /// `GOOGLE_APPLICATION_CREDENTIALS` read at load time, interpreted
    /// like [`CredentialSource::from_value`].
    Environment,
}

impl CredentialSource {
    /// Picks a source from a single configuration string.
    ///
    /// - Empty string → `Environment`
    /// - Starts with `{` → `Json`
    /// - Otherwise → `File`
    pub fn from_value(value: &str) -> Self {
        if value.trim().is_empty() {
            CredentialSource::Environment
        } else if value.trim_start().starts_with('{') {
            CredentialSource::Json(value.to_string())
        } else {
            CredentialSource::File(PathBuf::from(value))
        }
    }

    async fn read(&self) -> Result<String> {
        match self {
            CredentialSource::Json(json) => Ok(json.clone()),
            CredentialSource::File(path) => read_file(path).await,
            CredentialSource::Environment => {
                let value = std::env::var(CREDENTIALS_ENV_VAR).map_err(|_| {
                    Error::credential_unavailable(
                        format!("{} is not set", CREDENTIALS_ENV_VAR),
                        ErrorContext::new().with_source("credential_store"),
                    )
                })?;
                read_env_value(&value).await
            }
        }
    }
}

async fn read_env_value(value: &str) -> Result<String> {
    match CredentialSource::from_value(value) {
        CredentialSource::Json(json) => Ok(json),
        CredentialSource::File(path) => read_file(&path).await,
        CredentialSource::Environment => Err(Error::credential_unavailable(
            format!("{} is empty", CREDENTIALS_ENV_VAR),
            ErrorContext::new().with_source("credential_store"),
        )),
    }
}

async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        error!(error = %e, path = %path.display(), "Failed to read credentials file");
        Error::credential_unavailable(
            format!("failed to read credentials file: {}", e),
            ErrorContext::new()
                .with_details(path.display().to_string())
                .with_source("credential_store"),
        )
    })
}

/// Loads a service-account credential once and hands out shared references.
///
/// Concurrent first callers wait on a single load. A failed load is not
/// remembered, so a later call reads the source again.
#[derive(Debug)]
pub struct CredentialStore {
    source: Option<CredentialSource>,
    cell: OnceCell<Arc<ServiceAccountCredential>>,
}

impl CredentialStore {
    pub fn new(source: CredentialSource) -> Self {
        Self {
            source: Some(source),
            cell: OnceCell::new(),
        }
    }

    /// Store that is already initialised with `credential`.
    pub fn preloaded(credential: ServiceAccountCredential) -> Self {
        Self {
            source: None,
            cell: OnceCell::new_with(Some(Arc::new(credential))),
        }
    }

    /// `None` for a [`preloaded`](Self::preloaded) store.
    pub fn source(&self) -> Option<&CredentialSource> {
        self.source.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn load(&self) -> Result<Arc<ServiceAccountCredential>> {
        let credential = self
            .cell
            .get_or_try_init(|| async {
                let source = self.source.as_ref().ok_or_else(|| {
                    Error::credential_unavailable(
                        "no credential source configured",
                        ErrorContext::new().with_source("credential_store"),
                    )
                })?;
                let json = source.read().await?;
                let credential = ServiceAccountCredential::from_json(&json)?;
                debug!(
                    client_email = credential.client_email(),
                    "service account credential loaded"
                );
                Ok::<_, Error>(Arc::new(credential))
            })
            .await?;
        Ok(Arc::clone(credential))
    }
}
