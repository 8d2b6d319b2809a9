//! Service-account credential loading.
//!
//! A [`CredentialStore`] reads a Google service-account key file once and
//! keeps the parsed [`ServiceAccountCredential`] for the lifetime of the
//! process. Only `client_email`, `token_uri` and `private_key` are used for
//! authentication; the remaining fields are carried for diagnostics.

mod store;
mod types;

pub use store::{CredentialSource, CredentialStore, CREDENTIALS_ENV_VAR};
pub use types::ServiceAccountCredential;
