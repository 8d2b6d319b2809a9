//! Optional access-token cache.
//!
//! Off by default: the pipeline exchanges a fresh token for every call
//! unless `cache_tokens` is enabled.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tracing::debug;

use super::assertion::ASSERTION_LIFETIME_SECS;
use super::exchange::AccessToken;
use crate::credential::ServiceAccountCredential;

/// Tokens are dropped this long before their reported expiry.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct CachedToken {
    token: AccessToken,
    expires_at: Instant,
}

/// Access tokens keyed by service-account identity.
pub struct TokenCache {
    entries: Mutex<HashMap<String, CachedToken>>,
    refresh_margin: Duration,
}

impl TokenCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            refresh_margin: DEFAULT_REFRESH_MARGIN,
        }
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// SHA-256 over the identity fields, hex encoded.
    pub fn key_for(credential: &ServiceAccountCredential) -> String {
        let mut hasher = Sha256::new();
        hasher.update(credential.client_email().as_bytes());
        hasher.update(b"\n");
        hasher.update(credential.token_uri().as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    pub fn get(&self, credential: &ServiceAccountCredential) -> Option<AccessToken> {
        self.get_at(credential, Instant::now())
    }

    pub fn get_at(&self, credential: &ServiceAccountCredential, now: Instant) -> Option<AccessToken> {
        let key = Self::key_for(credential);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&key) {
            Some(entry) if now.checked_add(self.refresh_margin).is_some_and(|t| t < entry.expires_at) => {
                Some(entry.token.clone())
            }
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, credential: &ServiceAccountCredential, token: AccessToken) {
        self.insert_at(credential, token, Instant::now());
    }

    pub fn insert_at(&self, credential: &ServiceAccountCredential, token: AccessToken, obtained_at: Instant) {
        // Google access tokens never outlive the assertion that minted them.
        let lifetime = token
            .expires_in()
            .unwrap_or(ASSERTION_LIFETIME_SECS)
            .min(ASSERTION_LIFETIME_SECS);
        let Some(expires_at) = obtained_at.checked_add(Duration::from_secs(lifetime)) else {
            debug!(lifetime, "token expiry not representable, not caching");
            return;
        };
        let entry = CachedToken { expires_at, token };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::key_for(credential), entry);
    }

    pub fn invalidate(&self, credential: &ServiceAccountCredential) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&Self::key_for(credential))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}
