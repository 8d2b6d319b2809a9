//! Audio artifact types.

use std::fmt;
use std::time::Duration;

/// Container the synthesized audio arrives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    Wav,
    Mp3,
    Ogg,
}

impl ContainerFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Sample coding inside a WAV container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    Pcm,
    Float,
    ALaw,
    MuLaw,
}

/// Decoded stream parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub sample_format: SampleFormat,
}

impl PcmSpec {
    /// 16-bit mono linear PCM.
    pub fn linear16_mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            bits_per_sample: 16,
            sample_format: SampleFormat::Pcm,
        }
    }

    /// Bytes per frame (one sample for every channel).
    pub fn block_align(&self) -> usize {
        self.channels as usize * ((self.bits_per_sample as usize + 7) / 8)
    }
}

/// Where the samples sit inside an artifact's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmLayout {
    pub spec: PcmSpec,
    pub data_offset: usize,
    pub data_len: usize,
}

/// Playable result of a synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    data: Vec<u8>,
    format: ContainerFormat,
    pcm: Option<PcmLayout>,
}

impl AudioArtifact {
    pub(crate) fn new(data: Vec<u8>, format: ContainerFormat, pcm: Option<PcmLayout>) -> Self {
        Self { data, format, pcm }
    }

    /// The complete payload, container header included.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn format(&self) -> ContainerFormat {
        self.format
    }

    /// Stream parameters, known for WAV and raw PCM payloads.
    pub fn pcm_spec(&self) -> Option<&PcmSpec> {
        self.pcm.as_ref().map(|layout| &layout.spec)
    }

    pub fn pcm_layout(&self) -> Option<&PcmLayout> {
        self.pcm.as_ref()
    }

    /// Raw sample bytes without the container header.
    pub fn samples(&self) -> Option<&[u8]> {
        self.pcm
            .as_ref()
            .map(|layout| &self.data[layout.data_offset..layout.data_offset + layout.data_len])
    }

    pub fn duration(&self) -> Option<Duration> {
        let layout = self.pcm.as_ref()?;
        let block_align = layout.spec.block_align();
        if block_align == 0 || layout.spec.sample_rate == 0 {
            return None;
        }
        let frames = (layout.data_len / block_align) as f64;
        Some(Duration::from_secs_f64(frames / layout.spec.sample_rate as f64))
    }
}
