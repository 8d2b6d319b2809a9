//! Turns synthesized bytes into an [`AudioArtifact`].

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{AudioArtifact, ContainerFormat, PcmLayout, PcmSpec};
use super::wav;
use crate::{Error, ErrorContext, Result};

/// Sample rate assumed for LINEAR16 payloads that arrive without a WAV header.
pub const DEFAULT_RAW_PCM_SAMPLE_RATE: u32 = 24_000;

/// Decodes audio either in memory or through a scratch file.
#[derive(Debug, Clone)]
pub struct AudioMaterializer {
    scratch_dir: Option<PathBuf>,
    raw_pcm_sample_rate: u32,
}

impl AudioMaterializer {
    /// Decodes directly from the byte buffer.
    pub fn in_memory() -> Self {
        Self {
            scratch_dir: None,
            raw_pcm_sample_rate: DEFAULT_RAW_PCM_SAMPLE_RATE,
        }
    }

    /// Writes each payload to a uniquely named file under `dir`, decodes the
    /// file contents and removes the file again.
    pub fn with_scratch_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: Some(dir.into()),
            raw_pcm_sample_rate: DEFAULT_RAW_PCM_SAMPLE_RATE,
        }
    }

    pub fn raw_pcm_sample_rate(mut self, sample_rate: u32) -> Self {
        self.raw_pcm_sample_rate = sample_rate;
        self
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_deref()
    }

    pub async fn materialize(&self, bytes: Vec<u8>, format: ContainerFormat) -> Result<AudioArtifact> {
        let bytes = match &self.scratch_dir {
            Some(dir) => self.round_trip(dir, bytes, format).await?,
            None => bytes,
        };
        self.decode(bytes, format)
    }

    async fn round_trip(&self, dir: &Path, bytes: Vec<u8>, format: ContainerFormat) -> Result<Vec<u8>> {
        let path = dir.join(format!("tts-{}.{}", Uuid::new_v4(), format.extension()));
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            remove_scratch(&path).await;
            return Err(Error::audio_persist(
                format!("failed to write scratch audio file: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("audio_materializer"),
            ));
        }
        debug!(path = %path.display(), bytes = bytes.len(), "audio persisted");
        drop(bytes);

        let read_back = tokio::fs::read(&path).await;
        remove_scratch(&path).await;
        read_back.map_err(|e| {
            Error::audio_decode(
                format!("failed to read back scratch audio file: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("audio_materializer"),
            )
        })
    }

    /// Validates `bytes` as `format` and records the PCM layout where one exists.
    pub fn decode(&self, bytes: Vec<u8>, format: ContainerFormat) -> Result<AudioArtifact> {
        if bytes.is_empty() {
            return Err(Error::audio_decode(
                "audio payload is empty",
                ErrorContext::new().with_source("audio_materializer"),
            ));
        }

        let pcm = match format {
            ContainerFormat::Wav if wav::has_riff_header(&bytes) => Some(wav::parse(&bytes)?),
            ContainerFormat::Wav => Some(self.raw_pcm_layout(&bytes)?),
            ContainerFormat::Mp3 => {
                check_signature(is_mp3(&bytes), format)?;
                None
            }
            ContainerFormat::Ogg => {
                check_signature(bytes.starts_with(b"OggS"), format)?;
                None
            }
        };

        Ok(AudioArtifact::new(bytes, format, pcm))
    }

    fn raw_pcm_layout(&self, bytes: &[u8]) -> Result<PcmLayout> {
        let spec = PcmSpec::linear16_mono(self.raw_pcm_sample_rate);
        if bytes.len() % spec.block_align() != 0 {
            return Err(Error::audio_decode(
                format!("raw LINEAR16 payload has odd length {}", bytes.len()),
                ErrorContext::new().with_source("audio_materializer"),
            ));
        }
        Ok(PcmLayout {
            spec,
            data_offset: 0,
            data_len: bytes.len(),
        })
    }
}

impl Default for AudioMaterializer {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Best-effort removal; a file that was never created is not an error.
async fn remove_scratch(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, path = %path.display(), "failed to remove scratch audio file"),
    }
}

fn is_mp3(bytes: &[u8]) -> bool {
    bytes.starts_with(b"ID3") || (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0)
}

fn check_signature(matches: bool, format: ContainerFormat) -> Result<()> {
    if matches {
        Ok(())
    } else {
        Err(Error::audio_decode(
            format!("payload does not look like {} audio", format.mime_type()),
            ErrorContext::new().with_source("audio_materializer"),
        ))
    }
}
