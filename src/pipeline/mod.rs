//! The speak pipeline.
//!
//! One `speak` call walks credential load → assertion → token exchange →
//! synthesis → materialization strictly in order, stopping at the first
//! failure. Calls are independent; the only state they share is the
//! memoized credential (and the token cache, when enabled).

mod stage;

pub use stage::{NoopObserver, PipelineStage, RecordingObserver, StageObserver};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::audio::{AudioArtifact, AudioMaterializer};
use crate::auth::{AccessToken, AssertionBuilder, Clock, SystemClock, TokenCache, TokenExchangeClient};
use crate::config::SpeechConfig;
use crate::credential::{CredentialSource, CredentialStore, ServiceAccountCredential};
use crate::tts::{SynthesisClient, SynthesisRequest};
use crate::{Error, ErrorContext, Result};

struct Inner {
    config: SpeechConfig,
    credentials: CredentialStore,
    assertions: AssertionBuilder,
    exchange: TokenExchangeClient,
    synthesis: SynthesisClient,
    materializer: AudioMaterializer,
    token_cache: Option<TokenCache>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn StageObserver>,
}

/// Explicitly constructed speech pipeline. Cheap to clone.
#[derive(Clone)]
pub struct SpeechPipeline {
    inner: Arc<Inner>,
}

impl SpeechPipeline {
    pub fn builder() -> SpeechPipelineBuilder {
        SpeechPipelineBuilder::new()
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.inner.config
    }

    pub fn credential_store(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    pub fn token_cache(&self) -> Option<&TokenCache> {
        self.inner.token_cache.as_ref()
    }

    /// Synthesizes `text` and returns the playable result.
    pub async fn speak(&self, text: &str) -> Result<AudioArtifact> {
        let invocation = Uuid::new_v4();
        let span = info_span!("speak", invocation = %invocation);
        async move {
            self.enter(invocation, PipelineStage::Idle);
            match self.run(invocation, text).await {
                Ok(artifact) => {
                    self.enter(invocation, PipelineStage::Ready);
                    info!(
                        bytes = artifact.len(),
                        format = %artifact.format(),
                        "speech synthesized"
                    );
                    Ok(artifact)
                }
                Err(e) => {
                    self.enter(invocation, PipelineStage::Failed(e.kind()));
                    error!(error = %e, kind = %e.kind(), "speech synthesis failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Starts `speak` on the runtime and returns immediately.
    pub fn speak_detached(&self, text: impl Into<String>) -> SpeakHandle {
        let pipeline = self.clone();
        let text = text.into();
        SpeakHandle {
            handle: tokio::spawn(async move { pipeline.speak(&text).await }),
        }
    }

    async fn run(&self, invocation: Uuid, text: &str) -> Result<AudioArtifact> {
        let inner = &self.inner;
        let request = SynthesisRequest::new(
            text,
            inner.config.voice_selection(),
            inner.config.audio_encoding,
        )?;

        self.enter(invocation, PipelineStage::CredentialLoading);
        let credential = inner.credentials.load().await?;

        let token = self.access_token(invocation, &credential).await?;

        self.enter(invocation, PipelineStage::Synthesizing);
        let audio = match inner.synthesis.synthesize(&request, &token).await {
            Ok(audio) => audio,
            Err(e) => {
                if let (Some(cache), Some(401)) = (&inner.token_cache, e.status()) {
                    cache.invalidate(&credential);
                }
                return Err(e);
            }
        };

        self.enter(invocation, PipelineStage::Materializing);
        inner
            .materializer
            .materialize(audio, request.audio_encoding().container_format())
            .await
    }

    async fn access_token(
        &self,
        invocation: Uuid,
        credential: &ServiceAccountCredential,
    ) -> Result<AccessToken> {
        let inner = &self.inner;
        if let Some(token) = inner.token_cache.as_ref().and_then(|c| c.get(credential)) {
            debug!("reusing cached access token");
            return Ok(token);
        }

        self.enter(invocation, PipelineStage::AssertionBuilding);
        let assertion = inner.assertions.build(credential, inner.clock.now())?;

        self.enter(invocation, PipelineStage::TokenExchanging);
        let token = inner.exchange.exchange(credential, &assertion).await?;

        if let Some(cache) = &inner.token_cache {
            cache.insert(credential, token.clone());
        }
        Ok(token)
    }

    fn enter(&self, invocation: Uuid, stage: PipelineStage) {
        debug!(stage = %stage, "pipeline transition");
        self.inner.observer.on_transition(invocation, stage);
    }
}

/// Completion handle for [`SpeechPipeline::speak_detached`].
pub struct SpeakHandle {
    handle: tokio::task::JoinHandle<Result<AudioArtifact>>,
}

impl SpeakHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the invocation to finish.
    pub async fn wait(self) -> Result<AudioArtifact> {
        self.handle.await.map_err(|e| {
            Error::runtime_with_context(
                format!("speak task did not complete: {}", e),
                ErrorContext::new().with_source("pipeline"),
            )
        })?
    }
}

pub struct SpeechPipelineBuilder {
    config: Option<SpeechConfig>,
    source: Option<CredentialSource>,
    credential: Option<ServiceAccountCredential>,
    clock: Option<Arc<dyn Clock>>,
    observer: Option<Arc<dyn StageObserver>>,
    http_client: Option<reqwest::Client>,
}

impl SpeechPipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            source: None,
            credential: None,
            clock: None,
            observer: None,
            http_client: None,
        }
    }

    pub fn config(mut self, config: SpeechConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Where to load the service account from. Defaults to
    /// `GOOGLE_APPLICATION_CREDENTIALS`.
    pub fn credential_source(mut self, source: CredentialSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Use an already parsed credential; overrides `credential_source`.
    pub fn credential(mut self, credential: ServiceAccountCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Share an HTTP client; `http_timeout_secs` is then not applied.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn build(self) -> Result<SpeechPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(Duration::from_secs(config.http_timeout_secs))
                .build()
                .map_err(|e| {
                    Error::configuration_with_context(
                        format!("Failed to create HTTP client: {}", e),
                        ErrorContext::new().with_source("pipeline"),
                    )
                })?,
        };

        let credentials = match self.credential {
            Some(credential) => CredentialStore::preloaded(credential),
            None => CredentialStore::new(self.source.unwrap_or(CredentialSource::Environment)),
        };

        let synthesis = SynthesisClient::builder()
            .endpoint(config.synthesis_endpoint.clone())
            .http_client(http_client.clone())
            .build()?;

        let materializer = match &config.scratch_dir {
            Some(dir) => AudioMaterializer::with_scratch_dir(dir.clone()),
            None => AudioMaterializer::in_memory(),
        }
        .raw_pcm_sample_rate(config.raw_pcm_sample_rate);

        let token_cache = config.cache_tokens.then(TokenCache::new);

        Ok(SpeechPipeline {
            inner: Arc::new(Inner {
                assertions: AssertionBuilder::new().with_scope(config.scope.clone()),
                exchange: TokenExchangeClient::new(http_client),
                synthesis,
                materializer,
                token_cache,
                credentials,
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                observer: self.observer.unwrap_or_else(|| Arc::new(NoopObserver)),
                config,
            }),
        })
    }
}

impl Default for SpeechPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
