//! # gcp-tts-rust
//!
//! Service-account authenticated client for Google Cloud Text-to-Speech.
//!
//! ## Overview
//!
//! A synthesis call runs five stages in order, each short-circuiting the rest
//! on failure:
//!
//! 1. load the service-account credential (once per pipeline),
//! 2. sign an RS256 JWT assertion with the account's private key,
//! 3. exchange the assertion for an OAuth2 access token (JWT-bearer grant),
//! 4. call `text:synthesize` with the bearer token,
//! 5. decode the returned audio into an [`AudioArtifact`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gcp_tts_rust::{CredentialSource, SpeechConfig, SpeechPipeline};
//!
//! #[tokio::main]
//! async fn main() -> gcp_tts_rust::Result<()> {
//!     let pipeline = SpeechPipeline::builder()
//!         .config(SpeechConfig::from_env()?)
//!         .credential_source(CredentialSource::File("service-account.json".into()))
//!         .build()?;
//!
//!     let clip = pipeline.speak("Hello there!").await?;
//!     println!("{} bytes of {}", clip.len(), clip.format().mime_type());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`credential`] | Service-account loading and memoization |
//! | [`auth`] | Assertion signing, token exchange, optional token cache |
//! | [`tts`] | Synthesis request types and HTTP client |
//! | [`audio`] | WAV/PCM decoding into playable artifacts |
//! | [`pipeline`] | Orchestration, stage reporting, detached calls |
//! | [`config`] | YAML / environment configuration |

pub mod audio;
pub mod auth;
pub mod config;
pub mod credential;
pub mod pipeline;
pub mod tts;

// Re-export main types for convenience
pub use audio::{AudioArtifact, AudioMaterializer, ContainerFormat, PcmSpec};
pub use auth::{AccessToken, Assertion, AssertionBuilder, Clock, FixedClock, SystemClock, TokenExchangeClient};
pub use config::{SpeechConfig, VoiceConfig};
pub use credential::{CredentialSource, CredentialStore, ServiceAccountCredential};
pub use pipeline::{PipelineStage, SpeakHandle, SpeechPipeline, SpeechPipelineBuilder, StageObserver};
pub use tts::{AudioEncoding, SynthesisClient, SynthesisRequest, VoiceSelection};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ErrorKind};
