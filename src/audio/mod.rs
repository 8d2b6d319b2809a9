//! Audio materialization: decoded bytes in, playable [`AudioArtifact`] out.
//!
//! LINEAR16 responses carry a WAV header; its `fmt ` chunk supplies sample
//! rate, channel count and bit depth. Payloads without a header are taken as
//! raw 16-bit mono PCM. MP3 and Ogg payloads are only checked for their
//! container signature.

mod materializer;
mod types;
mod wav;

pub use materializer::{AudioMaterializer, DEFAULT_RAW_PCM_SAMPLE_RATE};
pub use types::{AudioArtifact, ContainerFormat, PcmLayout, PcmSpec, SampleFormat};
