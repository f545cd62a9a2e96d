//! Integration tests for WeatherProvider using wiremock.

use meteopin_core::NetworkError;
use meteopin_weather::{IconCategory, WeatherProvider, WeatherSource};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn current_body(temperature: f64, humidity: i32, wind: f64, code: i32) -> serde_json::Value {
    serde_json::json!({
        "latitude": 56.84,
        "longitude": 60.6,
        "timezone": "Asia/Yekaterinburg",
        "current": {
            "time": "2026-10-19T12:00",
            "interval": 900,
            "temperature_2m": temperature,
            "relative_humidity_2m": humidity,
            "wind_speed_10m": wind,
            "weather_code": code
        }
    })
}

#[tokio::test]
async fn test_fetch_maps_current_conditions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "56.8389"))
        .and(query_param("longitude", "60.6057"))
        .and(query_param(
            "current",
            "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code",
        ))
        .and(query_param("wind_speed_unit", "ms"))
        .and(query_param("timezone", "auto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(21.4, 48, 3.1, 0)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = WeatherProvider::new(&mock_server.uri(), None).unwrap();
    let snapshot = provider.fetch(56.8389, 60.6057).await.unwrap();

    assert_eq!(snapshot.temperature, 21);
    assert_eq!(snapshot.description, "Clear");
    assert_eq!(snapshot.humidity, 48);
    assert!((snapshot.wind_speed - 3.1).abs() < f64::EPSILON);
    assert_eq!(snapshot.icon, IconCategory::Clear);
}

#[tokio::test]
async fn test_unknown_code_falls_back() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(-3.6, 91, 7.0, 77)))
        .mount(&mock_server)
        .await;

    let provider = WeatherProvider::new(&mock_server.uri(), None).unwrap();
    let snapshot = provider.fetch(10.0, 20.0).await.unwrap();

    assert_eq!(snapshot.temperature, -4);
    assert_eq!(snapshot.description, "Unknown");
    assert_eq!(snapshot.icon, IconCategory::Wind);
}

#[tokio::test]
async fn test_null_code_falls_back() {
    let mock_server = MockServer::start().await;

    let mut body = current_body(-2.5, 64, 1.2, 0);
    body["current"]["weather_code"] = serde_json::Value::Null;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let provider = WeatherProvider::new(&mock_server.uri(), None).unwrap();
    let snapshot = provider.fetch(10.0, 20.0).await.unwrap();

    assert_eq!(snapshot.temperature, -2);
    assert_eq!(snapshot.description, "Unknown");
    assert_eq!(snapshot.icon, IconCategory::Wind);
}

#[tokio::test]
async fn test_http_error_is_network_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": true,
            "reason": "Latitude must be in range of -90 to 90°."
        })))
        .mount(&mock_server)
        .await;

    let provider = WeatherProvider::new(&mock_server.uri(), None).unwrap();
    let err = provider.fetch(91.0, 0.0).await.unwrap_err();

    match err {
        NetworkError::ServerError { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("Latitude"), "body should be kept: {}", message);
        }
        other => panic!("expected ServerError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_outage_is_network_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let provider = WeatherProvider::new(&mock_server.uri(), None).unwrap();
    let err = provider.fetch(0.0, 0.0).await.unwrap_err();

    assert!(matches!(err, NetworkError::ServerError { status: 503, .. }));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": { "temperature_2m": 1.0 }
        })))
        .mount(&mock_server)
        .await;

    let provider = WeatherProvider::new(&mock_server.uri(), None).unwrap();
    let err = provider.fetch(0.0, 0.0).await.unwrap_err();

    assert!(matches!(err, NetworkError::InvalidResponse(_)));
}
