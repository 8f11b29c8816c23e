//! Integration tests for WeatherProvider and WeatherService using wiremock.

use std::time::Duration;

use skycast_weather::{WeatherCache, WeatherError, WeatherProvider, WeatherService};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn timeline_body(address: &str) -> serde_json::Value {
    serde_json::json!({
        "address": address,
        "resolvedAddress": address,
        "currentConditions": {"temp": 70, "conditions": "Clear"},
        "days": [
            {"datetime": "2026-10-19", "temp": 70, "tempmax": 75, "tempmin": 65, "precipprob": 10},
            {"datetime": "2026-10-20", "temp": 68, "tempmax": 72, "tempmin": 64, "precipprob": 20}
        ]
    })
}

fn provider_for(server: &MockServer) -> WeatherProvider {
    WeatherProvider::new(
        &format!("{}/timeline", server.uri()),
        "test-key",
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_fetch_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/timeline/London/next7days"))
        .and(query_param("key", "test-key"))
        .and(query_param("unitGroup", "us"))
        .and(query_param("include", "days,current,events"))
        .and(query_param("contentType", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_body("London")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let payload = provider_for(&mock_server).fetch("London").await.unwrap();

    assert_eq!(payload.resolved_address(), Some("London"));
    assert_eq!(payload.days.len(), 2);
    assert!(payload.current_conditions().is_some());
}

#[tokio::test]
async fn test_fetch_upstream_error_keeps_status_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/timeline/Atlantis/next7days"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string("Bad API Request:Invalid location parameter value."),
        )
        .mount(&mock_server)
        .await;

    let result = provider_for(&mock_server).fetch("Atlantis").await;

    match result {
        Err(WeatherError::Upstream { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.contains("Invalid location"));
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_upstream_error_without_body_uses_reason() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let result = provider_for(&mock_server).fetch("London").await;

    match result {
        Err(WeatherError::Upstream { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "Service Unavailable");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_malformed_body_is_transport_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let result = provider_for(&mock_server).fetch("London").await;
    assert!(matches!(result, Err(WeatherError::Transport(_))));
}

#[tokio::test]
async fn test_fetch_timeout_is_transport_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(timeline_body("London"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let provider = WeatherProvider::new(
        &format!("{}/timeline", mock_server.uri()),
        "test-key",
        Duration::from_millis(200),
    )
    .unwrap();

    let result = provider.fetch("London").await;
    match result {
        Err(WeatherError::Transport(message)) => {
            assert!(!message.contains("test-key"), "API key leaked: {}", message);
        }
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_load_or_fetch_serves_second_call_from_cache() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/timeline/London/next7days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_body("London")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = WeatherService::new(
        provider_for(&mock_server),
        WeatherCache::new(dir.path(), None),
    );

    let first = service.load_or_fetch("London").await.unwrap();
    let second = service.load_or_fetch("London").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_load_or_fetch_keys_by_city() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/timeline/London/next7days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_body("London")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/timeline/Paris/next7days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_body("Paris")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = WeatherService::new(
        provider_for(&mock_server),
        WeatherCache::new(dir.path(), None),
    );

    let london = service.load_or_fetch("London").await.unwrap();
    let paris = service.load_or_fetch("Paris").await.unwrap();
    let london_again = service.load_or_fetch("London").await.unwrap();

    assert_eq!(london.resolved_address(), Some("London"));
    assert_eq!(paris.resolved_address(), Some("Paris"));
    assert_eq!(london, london_again);
}

#[tokio::test]
async fn test_upstream_error_is_not_cached() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let service = WeatherService::new(
        provider_for(&mock_server),
        WeatherCache::new(dir.path(), None),
    );

    assert!(service.load_or_fetch("London").await.is_err());
    assert!(service.load_or_fetch("London").await.is_err());
    assert!(WeatherCache::new(dir.path(), None).load("London").is_none());
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_body("London")))
        .expect(2)
        .mount(&mock_server)
        .await;

    let service = WeatherService::new(
        provider_for(&mock_server),
        WeatherCache::new(dir.path(), None),
    );

    service.load_or_fetch("London").await.unwrap();
    assert!(service.invalidate("London").await.unwrap());
    service.load_or_fetch("London").await.unwrap();
}

#[tokio::test]
async fn test_unwritable_cache_still_serves_payload() {
    let mock_server = MockServer::start().await;
    let file = tempfile::NamedTempFile::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_body("London")))
        .mount(&mock_server)
        .await;

    // The cache dir is a regular file, so every store fails.
    let service = WeatherService::new(
        provider_for(&mock_server),
        WeatherCache::new(file.path(), None),
    );

    let payload = service.load_or_fetch("London").await.unwrap();
    assert_eq!(payload.days.len(), 2);
}

#[tokio::test]
async fn test_clear_forces_refetch_for_every_city() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_body("Anywhere")))
        .expect(4)
        .mount(&mock_server)
        .await;

    let service = WeatherService::new(
        provider_for(&mock_server),
        WeatherCache::new(dir.path(), None),
    );

    service.load_or_fetch("London").await.unwrap();
    service.load_or_fetch("Paris").await.unwrap();
    assert_eq!(service.clear().await.unwrap(), 2);
    assert_eq!(service.clear().await.unwrap(), 0);

    service.load_or_fetch("London").await.unwrap();
    service.load_or_fetch("Paris").await.unwrap();
}
