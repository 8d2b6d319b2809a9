//! End-to-end speak calls against a mock token endpoint and synthesis endpoint.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gcp_tts_rust::pipeline::RecordingObserver;
use gcp_tts_rust::{
    AssertionBuilder, Clock, ContainerFormat, CredentialSource, ErrorKind, FixedClock,
    PipelineStage, SpeechConfig, SpeechPipeline,
};
use mockito::Matcher;
use serde_json::json;

use crate::integration::mock_server::{MockServerFixture, TOKEN_PATH};

const TOKEN_BODY: &str = r#"{"access_token":"tok123","expires_in":3599,"token_type":"Bearer"}"#;

fn audio_body(audio: &[u8]) -> String {
    json!({ "audioContent": STANDARD.encode(audio) }).to_string()
}

fn config(fixture: &MockServerFixture) -> SpeechConfig {
    SpeechConfig {
        synthesis_endpoint: fixture.synthesis_endpoint(),
        http_timeout_secs: 5,
        ..SpeechConfig::default()
    }
}

fn pipeline(fixture: &MockServerFixture, config: SpeechConfig) -> SpeechPipeline {
    SpeechPipeline::builder()
        .config(config)
        .credential_source(CredentialSource::Json(fixture.service_account_json()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn speak_returns_synthesized_audio() {
    let mut fixture = MockServerFixture::new().await;
    let token = fixture.mock_token(200, TOKEN_BODY, 1).await;
    let audio: Vec<u8> = (0u8..10).collect();
    let synthesis = fixture.mock_synthesis("tok123", 200, &audio_body(&audio), 1).await;

    let pipeline = pipeline(&fixture, config(&fixture));
    let clip = pipeline.speak("hello").await.unwrap();

    assert_eq!(clip.len(), 10);
    assert_eq!(clip.format(), ContainerFormat::Wav);
    assert_eq!(clip.samples(), Some(&audio[..]));
    assert!(pipeline.credential_store().is_loaded());
    token.assert_async().await;
    synthesis.assert_async().await;
}

#[tokio::test]
async fn rejected_assertion_skips_synthesis() {
    let mut fixture = MockServerFixture::new().await;
    let _token = fixture
        .mock_token(401, r#"{"error":"invalid_grant"}"#, 1)
        .await;
    let synthesis = fixture.mock_synthesis("tok123", 200, &audio_body(b"xx"), 0).await;

    let observer = Arc::new(RecordingObserver::new());
    let pipeline = SpeechPipeline::builder()
        .config(config(&fixture))
        .credential(fixture.credential())
        .observer(observer.clone())
        .build()
        .unwrap();

    let err = pipeline.speak("hello").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TokenExchangeRejected);
    assert_eq!(err.status(), Some(401));
    synthesis.assert_async().await;

    let id = observer.invocations()[0];
    assert_eq!(
        observer.stages_for(id),
        vec![
            PipelineStage::Idle,
            PipelineStage::CredentialLoading,
            PipelineStage::AssertionBuilding,
            PipelineStage::TokenExchanging,
            PipelineStage::Failed(ErrorKind::TokenExchangeRejected),
        ]
    );
}

#[tokio::test]
async fn stages_run_in_order_on_success() {
    let mut fixture = MockServerFixture::new().await;
    let _token = fixture.mock_token(200, TOKEN_BODY, 1).await;
    let _synthesis = fixture.mock_synthesis("tok123", 200, &audio_body(&[0, 0]), 1).await;

    let observer = Arc::new(RecordingObserver::new());
    let pipeline = SpeechPipeline::builder()
        .config(config(&fixture))
        .credential(fixture.credential())
        .observer(observer.clone())
        .build()
        .unwrap();

    pipeline.speak("hello").await.unwrap();

    let id = observer.invocations()[0];
    assert_eq!(
        observer.stages_for(id),
        vec![
            PipelineStage::Idle,
            PipelineStage::CredentialLoading,
            PipelineStage::AssertionBuilding,
            PipelineStage::TokenExchanging,
            PipelineStage::Synthesizing,
            PipelineStage::Materializing,
            PipelineStage::Ready,
        ]
    );
}

#[tokio::test]
async fn token_request_carries_the_signed_assertion() {
    let mut fixture = MockServerFixture::new().await;
    let clock = FixedClock::from_unix_secs(1_700_000_000);
    let credential = fixture.credential();
    let expected = AssertionBuilder::new().build(&credential, clock.now()).unwrap();

    let token = fixture
        .server
        .mock("POST", TOKEN_PATH)
        .match_body(Matcher::UrlEncoded("assertion".into(), expected.as_str().into()))
        .with_status(200)
        .with_body(TOKEN_BODY)
        .expect(1)
        .create_async()
        .await;
    let _synthesis = fixture.mock_synthesis("tok123", 200, &audio_body(&[1, 0]), 1).await;

    let pipeline = SpeechPipeline::builder()
        .config(config(&fixture))
        .credential(credential)
        .clock(Arc::new(clock))
        .build()
        .unwrap();

    pipeline.speak("hello").await.unwrap();
    token.assert_async().await;
}

#[tokio::test]
async fn synthesis_failure_is_reported() {
    let mut fixture = MockServerFixture::new().await;
    let _token = fixture.mock_token(200, TOKEN_BODY, 1).await;
    let _synthesis = fixture
        .mock_synthesis("tok123", 500, r#"{"error":{"code":500,"status":"INTERNAL"}}"#, 1)
        .await;

    let err = pipeline(&fixture, config(&fixture)).speak("hello").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SynthesisRejected);
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn each_call_exchanges_a_fresh_token_by_default() {
    let mut fixture = MockServerFixture::new().await;
    let token = fixture.mock_token(200, TOKEN_BODY, 2).await;
    let _synthesis = fixture.mock_synthesis("tok123", 200, &audio_body(&[0, 0]), 2).await;

    let pipeline = pipeline(&fixture, config(&fixture));
    pipeline.speak("one").await.unwrap();
    pipeline.speak("two").await.unwrap();
    token.assert_async().await;
}

#[tokio::test]
async fn cached_token_is_reused() {
    let mut fixture = MockServerFixture::new().await;
    let token = fixture.mock_token(200, TOKEN_BODY, 1).await;
    let synthesis = fixture.mock_synthesis("tok123", 200, &audio_body(&[0, 0]), 2).await;

    let config = SpeechConfig {
        cache_tokens: true,
        ..config(&fixture)
    };
    let observer = Arc::new(RecordingObserver::new());
    let pipeline = SpeechPipeline::builder()
        .config(config)
        .credential_source(CredentialSource::Json(fixture.service_account_json()))
        .observer(observer.clone())
        .build()
        .unwrap();

    pipeline.speak("one").await.unwrap();
    pipeline.speak("two").await.unwrap();
    token.assert_async().await;
    synthesis.assert_async().await;

    let second = observer.invocations()[1];
    assert!(!observer
        .stages_for(second)
        .contains(&PipelineStage::TokenExchanging));
    assert_eq!(pipeline.token_cache().map(|c| c.len()), Some(1));
}

#[tokio::test]
async fn unauthorized_synthesis_drops_cached_token() {
    let mut fixture = MockServerFixture::new().await;
    let _token = fixture.mock_token(200, TOKEN_BODY, 1).await;
    let _synthesis = fixture
        .mock_synthesis("tok123", 401, r#"{"error":{"code":401,"status":"UNAUTHENTICATED"}}"#, 1)
        .await;

    let config = SpeechConfig {
        cache_tokens: true,
        ..config(&fixture)
    };
    let pipeline = pipeline(&fixture, config);

    let err = pipeline.speak("hello").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SynthesisRejected);
    assert_eq!(pipeline.token_cache().map(|c| c.is_empty()), Some(true));
}

#[tokio::test]
async fn scratch_dir_is_left_clean() {
    let mut fixture = MockServerFixture::new().await;
    let _token = fixture.mock_token(200, TOKEN_BODY, 1).await;
    let _synthesis = fixture.mock_synthesis("tok123", 200, &audio_body(&[0, 0, 1, 0]), 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = SpeechConfig {
        scratch_dir: Some(dir.path().to_path_buf()),
        ..config(&fixture)
    };

    let clip = pipeline(&fixture, config).speak("hello").await.unwrap();
    assert_eq!(clip.len(), 4);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn unwritable_scratch_dir_fails_to_persist() {
    let mut fixture = MockServerFixture::new().await;
    let _token = fixture.mock_token(200, TOKEN_BODY, 1).await;
    let _synthesis = fixture.mock_synthesis("tok123", 200, &audio_body(&[0, 0]), 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = SpeechConfig {
        scratch_dir: Some(dir.path().join("missing")),
        ..config(&fixture)
    };

    let err = pipeline(&fixture, config).speak("hello").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AudioPersist);
}

#[tokio::test]
async fn detached_speak_completes() {
    let mut fixture = MockServerFixture::new().await;
    let _token = fixture.mock_token(200, TOKEN_BODY, 1).await;
    let _synthesis = fixture.mock_synthesis("tok123", 200, &audio_body(&[0, 0]), 1).await;

    let handle = pipeline(&fixture, config(&fixture)).speak_detached("hello");
    let clip = handle.wait().await.unwrap();
    assert_eq!(clip.len(), 2);
}

#[tokio::test]
async fn concurrent_calls_share_one_credential_load() {
    let mut fixture = MockServerFixture::new().await;
    let token = fixture.mock_token(200, TOKEN_BODY, 4).await;
    let _synthesis = fixture.mock_synthesis("tok123", 200, &audio_body(&[0, 0]), 4).await;

    let pipeline = pipeline(&fixture, config(&fixture));
    let calls = (0..4).map(|i| {
        let pipeline = pipeline.clone();
        async move { pipeline.speak(&format!("line {}", i)).await }
    });
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert!(pipeline.credential_store().is_loaded());
    token.assert_async().await;
}

#[tokio::test]
async fn credential_file_is_read_once() {
    let mut fixture = MockServerFixture::new().await;
    let _token = fixture.mock_token(200, TOKEN_BODY, 2).await;
    let _synthesis = fixture.mock_synthesis("tok123", 200, &audio_body(&[0, 0]), 2).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service-account.json");
    std::fs::write(&path, fixture.service_account_json()).unwrap();

    let pipeline = SpeechPipeline::builder()
        .config(config(&fixture))
        .credential_source(CredentialSource::File(path.clone()))
        .build()
        .unwrap();

    pipeline.speak("one").await.unwrap();
    std::fs::remove_file(&path).unwrap();
    pipeline.speak("two").await.unwrap();
}

#[tokio::test]
async fn cached_token_with_huge_expiry_does_not_panic() {
    let mut fixture = MockServerFixture::new().await;
    let token = fixture
        .mock_token(200, r#"{"access_token":"tok123","expires_in":18446744073709551615}"#, 1)
        .await;
    let _synthesis = fixture.mock_synthesis("tok123", 200, &audio_body(&[0, 0]), 2).await;

    let config = SpeechConfig {
        cache_tokens: true,
        ..config(&fixture)
    };
    let pipeline = pipeline(&fixture, config);

    pipeline.speak("one").await.unwrap();
    pipeline.speak("two").await.unwrap();
    token.assert_async().await;
}

#[tokio::test]
async fn string_expiry_in_token_response_is_accepted() {
    let mut fixture = MockServerFixture::new().await;
    let _token = fixture
        .mock_token(200, r#"{"access_token":"tok123","expires_in":"3599"}"#, 1)
        .await;
    let _synthesis = fixture.mock_synthesis("tok123", 200, &audio_body(&[0, 0]), 1).await;

    let clip = pipeline(&fixture, config(&fixture)).speak("hello").await.unwrap();
    assert_eq!(clip.len(), 2);
}
