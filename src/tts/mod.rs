//! TTS module: turns text into audio bytes through the Cloud Text-to-Speech API.

mod client;
mod types;

pub use client::{SynthesisClient, SynthesisClientBuilder, DEFAULT_SYNTHESIS_ENDPOINT};
pub use types::{AudioEncoding, SynthesisRequest, VoiceSelection};
