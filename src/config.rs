//! Pipeline configuration.
//!
//! Defaults reproduce the stock setup (Wavenet-D US English voice, LINEAR16
//! audio, a fresh token per call). A YAML file can override any field and
//! `TTS_*` environment variables override both.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::audio::DEFAULT_RAW_PCM_SAMPLE_RATE;
use crate::auth::CLOUD_PLATFORM_SCOPE;
use crate::tts::{AudioEncoding, VoiceSelection, DEFAULT_SYNTHESIS_ENDPOINT};
use crate::{Error, ErrorContext, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub name: String,
    pub language_code: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name: "en-US-Wavenet-D".to_string(),
            language_code: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub voice: VoiceConfig,
    pub audio_encoding: AudioEncoding,
    pub synthesis_endpoint: String,
    pub scope: String,
    pub http_timeout_secs: u64,
    /// Decode through a scratch file in this directory instead of in memory.
    pub scratch_dir: Option<PathBuf>,
    /// Reuse access tokens until shortly before they expire.
    pub cache_tokens: bool,
    pub raw_pcm_sample_rate: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice: VoiceConfig::default(),
            audio_encoding: AudioEncoding::Linear16,
            synthesis_endpoint: DEFAULT_SYNTHESIS_ENDPOINT.to_string(),
            scope: CLOUD_PLATFORM_SCOPE.to_string(),
            http_timeout_secs: 30,
            scratch_dir: None,
            cache_tokens: false,
            raw_pcm_sample_rate: DEFAULT_RAW_PCM_SAMPLE_RATE,
        }
    }
}

impl SpeechConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid configuration YAML: {}", e),
                ErrorContext::new().with_source("config"),
            )
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("failed to read configuration file: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("config"),
            )
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies `TTS_*` overrides looked up through `lookup`.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("TTS_VOICE_NAME") {
            self.voice.name = name;
        }
        if let Some(code) = lookup("TTS_LANGUAGE_CODE") {
            self.voice.language_code = code;
        }
        if let Some(encoding) = lookup("TTS_AUDIO_ENCODING") {
            self.audio_encoding = AudioEncoding::from_str(&encoding)?;
        }
        if let Some(endpoint) = lookup("TTS_SYNTHESIS_ENDPOINT") {
            self.synthesis_endpoint = endpoint;
        }
        if let Some(secs) = lookup("TTS_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = parse_env("TTS_HTTP_TIMEOUT_SECS", &secs)?;
        }
        if let Some(dir) = lookup("TTS_SCRATCH_DIR") {
            self.scratch_dir = if dir.is_empty() { None } else { Some(PathBuf::from(dir)) };
        }
        if let Some(flag) = lookup("TTS_CACHE_TOKENS") {
            self.cache_tokens = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(rate) = lookup("TTS_RAW_PCM_SAMPLE_RATE") {
            self.raw_pcm_sample_rate = parse_env("TTS_RAW_PCM_SAMPLE_RATE", &rate)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.voice.name.trim().is_empty() {
            return Err(invalid("voice.name", "voice name must not be empty"));
        }
        if self.voice.language_code.trim().is_empty() {
            return Err(invalid("voice.language_code", "language code must not be empty"));
        }
        if self.scope.trim().is_empty() {
            return Err(invalid("scope", "scope must not be empty"));
        }
        if self.http_timeout_secs == 0 {
            return Err(invalid("http_timeout_secs", "timeout must be positive"));
        }
        if self.raw_pcm_sample_rate == 0 {
            return Err(invalid("raw_pcm_sample_rate", "sample rate must be positive"));
        }
        url::Url::parse(&self.synthesis_endpoint).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid synthesis endpoint: {}", e),
                ErrorContext::new()
                    .with_field_path("synthesis_endpoint")
                    .with_details(self.synthesis_endpoint.clone()),
            )
        })?;
        Ok(())
    }

    pub fn voice_selection(&self) -> VoiceSelection {
        VoiceSelection::new(self.voice.language_code.clone(), self.voice.name.clone())
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::configuration_with_context(
            format!("{} has an invalid value '{}'", key, value),
            ErrorContext::new().with_field_path(key),
        )
    })
}

fn invalid(field: &str, msg: &str) -> Error {
    Error::configuration_with_context(msg, ErrorContext::new().with_field_path(field))
}
