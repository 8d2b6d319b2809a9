//! TTS (Text-to-Speech) request types and wire format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::audio::ContainerFormat;
use crate::{Error, ErrorContext, Result};

/// Audio encodings accepted by the synthesis endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AudioEncoding {
    /// 16-bit signed little-endian PCM, delivered with a WAV header.
    #[default]
    #[serde(rename = "LINEAR16")]
    Linear16,
    #[serde(rename = "MP3")]
    Mp3,
    #[serde(rename = "OGG_OPUS")]
    OggOpus,
    #[serde(rename = "MULAW")]
    Mulaw,
    #[serde(rename = "ALAW")]
    Alaw,
}

impl AudioEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear16 => "LINEAR16",
            Self::Mp3 => "MP3",
            Self::OggOpus => "OGG_OPUS",
            Self::Mulaw => "MULAW",
            Self::Alaw => "ALAW",
        }
    }

    /// Container the endpoint wraps this encoding in.
    pub fn container_format(&self) -> ContainerFormat {
        match self {
            Self::Linear16 | Self::Mulaw | Self::Alaw => ContainerFormat::Wav,
            Self::Mp3 => ContainerFormat::Mp3,
            Self::OggOpus => ContainerFormat::Ogg,
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "LINEAR16" | "PCM" | "WAV" => Ok(Self::Linear16),
            "MP3" => Ok(Self::Mp3),
            "OGG_OPUS" | "OPUS" => Ok(Self::OggOpus),
            "MULAW" => Ok(Self::Mulaw),
            "ALAW" => Ok(Self::Alaw),
            other => Err(Error::configuration_with_context(
                format!("unknown audio encoding '{}'", other),
                ErrorContext::new().with_field_path("audio_encoding"),
            )),
        }
    }
}

/// Voice to synthesize with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceSelection {
    #[serde(rename = "languageCode")]
    pub language_code: String,
    pub name: String,
}

impl VoiceSelection {
    pub fn new(language_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            language_code: language_code.into(),
            name: name.into(),
        }
    }
}

/// A single speak intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    text: String,
    voice: VoiceSelection,
    audio_encoding: AudioEncoding,
}

impl SynthesisRequest {
    pub fn new(
        text: impl Into<String>,
        voice: VoiceSelection,
        audio_encoding: AudioEncoding,
    ) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::validation_with_context(
                "text to synthesize must not be empty",
                ErrorContext::new().with_field_path("input.text"),
            ));
        }
        Ok(Self {
            text,
            voice,
            audio_encoding,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice(&self) -> &VoiceSelection {
        &self.voice
    }

    pub fn audio_encoding(&self) -> AudioEncoding {
        self.audio_encoding
    }

    pub(crate) fn body(&self) -> SynthesizeBody<'_> {
        SynthesizeBody {
            input: SynthesisInput { text: &self.text },
            voice: &self.voice,
            audio_config: AudioConfig {
                audio_encoding: self.audio_encoding,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SynthesizeBody<'a> {
    input: SynthesisInput<'a>,
    voice: &'a VoiceSelection,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct AudioConfig {
    #[serde(rename = "audioEncoding")]
    audio_encoding: AudioEncoding,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SynthesizeResponse {
    #[serde(rename = "audioContent")]
    pub audio_content: Option<String>,
}
