//! TTS (Text-to-Speech) client.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, error};

use super::types::{SynthesisRequest, SynthesizeResponse};
use crate::auth::AccessToken;
use crate::{Error, ErrorContext, Result};

/// Google Cloud Text-to-Speech REST endpoint.
pub const DEFAULT_SYNTHESIS_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Client for authenticated text-to-speech synthesis.
#[derive(Debug, Clone)]
pub struct SynthesisClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl SynthesisClient {
    pub fn builder() -> SynthesisClientBuilder {
        SynthesisClientBuilder::new()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends `request` and returns the decoded audio bytes.
    pub async fn synthesize(&self, request: &SynthesisRequest, token: &AccessToken) -> Result<Vec<u8>> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(token.secret())
            .json(&request.body())
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint = %self.endpoint, "TTS request failed");
                Error::SynthesisRejected {
                    status: e.status().map(|s| s.as_u16()),
                    message: format!("TTS request failed: {}", e),
                }
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| Error::SynthesisRejected {
            status: Some(status.as_u16()),
            message: format!("Failed to read TTS response: {}", e),
        })?;
        if !status.is_success() {
            let body_str = String::from_utf8_lossy(&body);
            error!(status = status.as_u16(), "TTS endpoint rejected the request");
            return Err(Error::SynthesisRejected {
                status: Some(status.as_u16()),
                message: body_str.into_owned(),
            });
        }

        let audio = decode_audio_content(&body)?;
        debug!(bytes = audio.len(), "synthesis response decoded");
        Ok(audio)
    }
}

fn decode_audio_content(body: &[u8]) -> Result<Vec<u8>> {
    let response: SynthesizeResponse =
        serde_json::from_slice(body).map_err(|e| Error::SynthesisResponseMalformed {
            message: format!("TTS response is not valid JSON: {}", e),
        })?;
    let content = response
        .audio_content
        .ok_or_else(|| Error::SynthesisResponseMalformed {
            message: "audioContent missing from TTS response".to_string(),
        })?;
    let audio = STANDARD
        .decode(content.trim())
        .map_err(|e| Error::SynthesisResponseMalformed {
            message: format!("audioContent is not valid base64: {}", e),
        })?;
    if audio.is_empty() {
        return Err(Error::SynthesisResponseMalformed {
            message: "audioContent is empty".to_string(),
        });
    }
    Ok(audio)
}

pub struct SynthesisClientBuilder {
    endpoint: Option<String>,
    http_client: Option<reqwest::Client>,
    timeout_secs: u64,
}

impl SynthesisClientBuilder {
    pub fn new() -> Self {
        Self {
            endpoint: None,
            http_client: None,
            timeout_secs: 30,
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Reuse an existing HTTP client; the timeout setting is then ignored.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<SynthesisClient> {
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_SYNTHESIS_ENDPOINT.to_string());
        url::Url::parse(&endpoint).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid synthesis endpoint: {}", e),
                ErrorContext::new()
                    .with_field_path("synthesis_endpoint")
                    .with_details(endpoint.clone()),
            )
        })?;
        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(Duration::from_secs(self.timeout_secs))
                .build()
                .map_err(|e| {
                    Error::configuration_with_context(
                        format!("Failed to create HTTP client: {}", e),
                        ErrorContext::new().with_source("synthesis_client"),
                    )
                })?,
        };
        Ok(SynthesisClient {
            http_client,
            endpoint,
        })
    }
}

impl Default for SynthesisClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
