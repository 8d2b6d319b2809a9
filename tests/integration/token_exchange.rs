//! Token endpoint round trips against a mock server.

use crate::integration::mock_server::{service_account_json_with_token_uri, MockServerFixture, TOKEN_PATH};
use gcp_tts_rust::auth::JWT_BEARER_GRANT_TYPE;
use gcp_tts_rust::{AssertionBuilder, ErrorKind, FixedClock, ServiceAccountCredential, TokenExchangeClient};
use gcp_tts_rust::Clock;
use mockito::Matcher;
use std::time::Duration;

fn client() -> TokenExchangeClient {
    TokenExchangeClient::with_timeout(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn posts_grant_and_assertion_as_form() {
    let mut fixture = MockServerFixture::new().await;
    let credential = fixture.credential();
    let assertion = AssertionBuilder::new()
        .build(&credential, FixedClock::from_unix_secs(1_700_000_000).now())
        .unwrap();

    let mock = fixture
        .server
        .mock("POST", TOKEN_PATH)
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), JWT_BEARER_GRANT_TYPE.into()),
            Matcher::UrlEncoded("assertion".into(), assertion.as_str().into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"tok123","expires_in":3599,"token_type":"Bearer"}"#)
        .expect(1)
        .create_async()
        .await;

    let token = client().exchange(&credential, &assertion).await.unwrap();
    assert_eq!(token.secret(), "tok123");
    assert_eq!(token.expires_in(), Some(3599));
    mock.assert_async().await;
}

#[tokio::test]
async fn unauthorized_is_rejected_with_status() {
    let mut fixture = MockServerFixture::new().await;
    let credential = fixture.credential();
    let assertion = AssertionBuilder::new()
        .build(&credential, FixedClock::from_unix_secs(1_700_000_000).now())
        .unwrap();
    let mock = fixture
        .mock_token(401, r#"{"error":"invalid_grant","error_description":"Invalid JWT Signature."}"#, 1)
        .await;

    let err = client().exchange(&credential, &assertion).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TokenExchangeRejected);
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("invalid_grant"));
    mock.assert_async().await;
}

#[tokio::test]
async fn success_without_access_token_is_malformed() {
    let mut fixture = MockServerFixture::new().await;
    let credential = fixture.credential();
    let assertion = AssertionBuilder::new()
        .build(&credential, FixedClock::from_unix_secs(1_700_000_000).now())
        .unwrap();
    let _mock = fixture.mock_token(200, r#"{"token_type":"Bearer"}"#, 1).await;

    let err = client().exchange(&credential, &assertion).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TokenResponseMalformed);
}

#[tokio::test]
async fn unreachable_endpoint_is_rejected_without_status() {
    let credential = ServiceAccountCredential::from_json(&service_account_json_with_token_uri(
        "http://127.0.0.1:1/token",
    ))
    .unwrap();
    let assertion = AssertionBuilder::new()
        .build(&credential, FixedClock::from_unix_secs(1_700_000_000).now())
        .unwrap();

    let err = client().exchange(&credential, &assertion).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TokenExchangeRejected);
    assert_eq!(err.status(), None);
}
