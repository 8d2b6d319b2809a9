//! Synthesis endpoint round trips against a mock server.

use crate::integration::mock_server::{MockServerFixture, SYNTHESIZE_PATH};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gcp_tts_rust::{AccessToken, AudioEncoding, ErrorKind, SynthesisClient, SynthesisRequest, VoiceSelection};
use mockito::Matcher;
use serde_json::json;

fn request(text: &str) -> SynthesisRequest {
    SynthesisRequest::new(
        text,
        VoiceSelection::new("en-US", "en-US-Wavenet-D"),
        AudioEncoding::Linear16,
    )
    .unwrap()
}

fn client(fixture: &MockServerFixture) -> SynthesisClient {
    SynthesisClient::builder()
        .endpoint(fixture.synthesis_endpoint())
        .timeout_secs(5)
        .build()
        .unwrap()
}

#[tokio::test]
async fn sends_json_body_with_bearer_token() {
    let mut fixture = MockServerFixture::new().await;
    let audio = b"RIFF-ish audio bytes";
    let mock = fixture
        .server
        .mock("POST", SYNTHESIZE_PATH)
        .match_header("authorization", "Bearer tok123")
        .match_body(Matcher::Json(json!({
            "input": {"text": "he said \"hi\""},
            "voice": {"languageCode": "en-US", "name": "en-US-Wavenet-D"},
            "audioConfig": {"audioEncoding": "LINEAR16"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "audioContent": STANDARD.encode(audio) }).to_string())
        .expect(1)
        .create_async()
        .await;

    let bytes = client(&fixture)
        .synthesize(&request("he said \"hi\""), &AccessToken::new("tok123"))
        .await
        .unwrap();
    assert_eq!(bytes, audio);
    mock.assert_async().await;
}

#[tokio::test]
async fn missing_audio_content_is_malformed() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_synthesis("tok123", 200, r#"{"timepoints":[]}"#, 1)
        .await;

    let err = client(&fixture)
        .synthesize(&request("hello"), &AccessToken::new("tok123"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SynthesisResponseMalformed);
}

#[tokio::test]
async fn server_error_is_rejected_with_status() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_synthesis(
            "tok123",
            403,
            r#"{"error":{"code":403,"message":"Cloud Text-to-Speech API has not been used","status":"PERMISSION_DENIED"}}"#,
            1,
        )
        .await;

    let err = client(&fixture)
        .synthesize(&request("hello"), &AccessToken::new("tok123"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SynthesisRejected);
    assert_eq!(err.status(), Some(403));
    assert!(err.to_string().contains("PERMISSION_DENIED"));
}
