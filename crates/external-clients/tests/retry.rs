use std::time::Duration;

use external_clients::{RetryPolicy, RetryingClient};
use shared::ApiError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy() -> RetryPolicy {
    RetryPolicy { attempts: 3, min_delay: Duration::from_millis(5), max_delay: Duration::from_millis(20), factor: 2 }
}

#[tokio::test]
async fn succeeds_after_a_5xx_then_recovering() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = RetryingClient::new(server.uri(), Duration::from_secs(5))
        .unwrap()
        .with_retry_policy(fast_policy());

    let response = client.get("/flaky").await.unwrap();
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn never_retries_a_4xx() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rejected"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let client = RetryingClient::new(server.uri(), Duration::from_secs(5))
        .unwrap()
        .with_retry_policy(fast_policy());

    let err = client.get("/rejected").await.unwrap_err();
    assert!(matches!(err, ApiError::ExternalClientError(_)));
}

#[tokio::test]
async fn surfaces_external_server_error_after_retries_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = RetryingClient::new(server.uri(), Duration::from_secs(5))
        .unwrap()
        .with_retry_policy(fast_policy());

    let err = client.get("/down").await.unwrap_err();
    assert!(matches!(err, ApiError::ExternalServerError(_)));
}
