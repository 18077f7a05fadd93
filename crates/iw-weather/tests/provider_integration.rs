//! Integration tests for the OpenWeatherMap provider and companion using wiremock.
#![allow(clippy::unwrap_used, clippy::panic)]

use iw_weather::relay::{pair, MessageKey};
use iw_weather::{
    Companion, ConditionCategory, Dictionary, OpenWeatherMapProvider, ProviderError,
    RelayChannel, RelayEvent, WeatherSource,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn current_weather(kelvin: f64, id: i32, main: &str) -> serde_json::Value {
    serde_json::json!({
        "coord": { "lon": -122.42, "lat": 37.77 },
        "weather": [{ "id": id, "main": main, "description": "whatever", "icon": "10d" }],
        "main": { "temp": kelvin, "humidity": 80 },
        "name": "San Francisco"
    })
}

#[tokio::test]
async fn test_current_weather_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "37.77"))
        .and(query_param("lon", "-122.42"))
        .and(query_param("appid", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather(285.15, 500, "Rain")))
        .mount(&mock_server)
        .await;

    let provider = OpenWeatherMapProvider::new(
        format!("{}/data/2.5/weather", mock_server.uri()),
        "test-key",
    )
    .unwrap();

    let observation = provider.current(37.77, -122.42).await.unwrap();

    assert_eq!(observation.temperature, 12);
    assert_eq!(observation.conditions, "Rain");
    assert_eq!(observation.condition_code, 500);
}

#[tokio::test]
async fn test_current_weather_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key."
        })))
        .mount(&mock_server)
        .await;

    let provider =
        OpenWeatherMapProvider::new(format!("{}/data/2.5/weather", mock_server.uri()), "bad")
            .unwrap();

    let result = provider.current(0.0, 0.0).await;
    assert!(matches!(result, Err(ProviderError::Unauthorized)));
}

#[tokio::test]
async fn test_current_weather_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let provider =
        OpenWeatherMapProvider::new(format!("{}/data/2.5/weather", mock_server.uri()), "key")
            .unwrap();

    let result = provider.current(0.0, 0.0).await;
    assert!(matches!(result, Err(ProviderError::Status(503))));
}

#[tokio::test]
async fn test_current_weather_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "cod": 200 })))
        .mount(&mock_server)
        .await;

    let provider =
        OpenWeatherMapProvider::new(format!("{}/data/2.5/weather", mock_server.uri()), "key")
            .unwrap();

    let result = provider.current(0.0, 0.0).await;
    assert!(matches!(result, Err(ProviderError::Parse(_))));
}

#[tokio::test]
async fn test_companion_relays_openweathermap_reading() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather(295.15, 800, "Clear")))
        .mount(&mock_server)
        .await;

    let provider =
        OpenWeatherMapProvider::new(format!("{}/data/2.5/weather", mock_server.uri()), "key")
            .unwrap();

    let (mut link, phone) = pair(4);
    link.register_inbox();
    let companion = Companion::new(
        phone,
        WeatherSource::OpenWeatherMap {
            provider,
            latitude: 1.0,
            longitude: 2.0,
        },
    );

    assert!(companion.handle(&Dictionary::weather_request(3)).await);

    match link.next_event().await {
        Some(RelayEvent::Received(reply)) => {
            let reading = reply.reading().unwrap();
            assert_eq!(reading.temperature(), 22);
            assert_eq!(reading.category(), ConditionCategory::Sunny);
            assert_eq!(reply.int(MessageKey::RequestId), Some(3));
        }
        other => panic!("unexpected relay event: {:?}", other),
    }
}

#[tokio::test]
async fn test_companion_stays_silent_on_lookup_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let provider =
        OpenWeatherMapProvider::new(format!("{}/data/2.5/weather", mock_server.uri()), "key")
            .unwrap();

    let (_link, phone) = pair(4);
    let companion = Companion::new(
        phone,
        WeatherSource::OpenWeatherMap {
            provider,
            latitude: 0.0,
            longitude: 0.0,
        },
    );

    assert!(!companion.handle(&Dictionary::weather_request(1)).await);
}
