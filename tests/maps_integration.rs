//! Testes de integração do cliente de mapas contra um servidor simulado.

use std::sync::Arc;
use std::time::Duration;

use pisofrete::geo::{DistanceResolver, MapsBackend, OrsClient};
use pisofrete::types::config::{CacheConfig, MapsConfig};
use pisofrete::types::shipment::{DistanceMethod, GeoPoint, GeoSource, Place};
use pisofrete::LookupError;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn maps_config(server: &MockServer) -> MapsConfig {
    MapsConfig {
        base_url: server.uri(),
        api_key: Some("test-key".to_string()),
        timeout_secs: 2,
        max_concurrency: 4,
        geocode_interval_ms: 5,
        route_interval_ms: 5,
    }
}

fn geocode_body(lon: f64, lat: f64, label: &str) -> serde_json::Value {
    json!({
        "type": "FeatureCollection",
        "features": [{
            "geometry": {"type": "Point", "coordinates": [lon, lat]},
            "properties": {"label": label}
        }]
    })
}

async fn mount_geocode(server: &MockServer, text: &str, lon: f64, lat: f64) {
    Mock::given(method("GET"))
        .and(path("/geocode/search"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("text", text))
        .and(query_param("boundary.country", "BR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geocode_body(lon, lat, text)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_routed_distance_through_service() {
    let server = MockServer::start().await;
    mount_geocode(&server, "São Paulo, SP, Brasil", -46.6333, -23.5505).await;
    mount_geocode(&server, "Campinas, SP, Brasil", -47.0626, -22.9099).await;
    Mock::given(method("GET"))
        .and(path("/v2/directions/driving-hgv"))
        .and(query_param("start", "-46.6333,-23.5505"))
        .and(query_param("end", "-47.0626,-22.9099"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "features": [{"properties": {"summary": {"distance": 95_400.0, "duration": 4_320.0}}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OrsClient::from_config(&maps_config(&server)).unwrap();
    let resolver = DistanceResolver::from_backend(Arc::new(client), &CacheConfig::default());

    let origin = Place::new("São Paulo", "SP");
    let destination = Place::new("Campinas", "SP");
    let first = resolver.resolve(&origin, &destination).await;
    let second = resolver.resolve(&origin, &destination).await;

    assert_eq!(first.method, DistanceMethod::Routed);
    assert!((first.distance_km - 95.4).abs() < 1e-9);
    assert!((first.duration_min - 72.0).abs() < 1e-9);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_route_not_found_falls_back_to_great_circle() {
    let server = MockServer::start().await;
    mount_geocode(&server, "São Paulo, SP, Brasil", -46.6333, -23.5505).await;
    mount_geocode(&server, "Rio de Janeiro, RJ, Brasil", -43.1729, -22.9068).await;
    Mock::given(method("GET"))
        .and(path("/v2/directions/driving-hgv"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = OrsClient::from_config(&maps_config(&server)).unwrap();
    let resolver = DistanceResolver::from_backend(Arc::new(client), &CacheConfig::default());

    let d = resolver
        .resolve(&Place::new("São Paulo", "SP"), &Place::new("Rio de Janeiro", "RJ"))
        .await;

    assert_eq!(d.method, DistanceMethod::GreatCircle);
    assert!(d.distance_km > 400.0 && d.distance_km < 460.0);
}

#[tokio::test]
async fn test_route_without_distance_falls_back_to_great_circle() {
    let server = MockServer::start().await;
    mount_geocode(&server, "São Paulo, SP, Brasil", -46.6333, -23.5505).await;
    mount_geocode(&server, "Campinas, SP, Brasil", -47.0626, -22.9099).await;
    Mock::given(method("GET"))
        .and(path("/v2/directions/driving-hgv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "features": [{"properties": {"summary": {}}}]
        })))
        .mount(&server)
        .await;

    let client = OrsClient::from_config(&maps_config(&server)).unwrap();
    let resolver = DistanceResolver::from_backend(Arc::new(client), &CacheConfig::default());

    let d = resolver
        .resolve(&Place::new("São Paulo", "SP"), &Place::new("Campinas", "SP"))
        .await;

    assert_eq!(d.method, DistanceMethod::GreatCircle);
    assert!(d.distance_km > 0.0);
}

#[tokio::test]
async fn test_empty_geocode_uses_region_estimate() {
    let server = MockServer::start().await;
    mount_geocode(&server, "São Paulo, SP, Brasil", -46.6333, -23.5505).await;
    Mock::given(method("GET"))
        .and(path("/geocode/search"))
        .and(query_param("text", "Xique-Xique, BA, Brasil"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"features": []})))
        .mount(&server)
        .await;

    let client = OrsClient::from_config(&maps_config(&server)).unwrap();
    let resolver = DistanceResolver::from_backend(Arc::new(client), &CacheConfig::default());

    let d = resolver
        .resolve(&Place::new("São Paulo", "SP"), &Place::new("Xique-Xique", "BA"))
        .await;

    assert_eq!(d.method, DistanceMethod::RegionEstimate);
    assert_eq!(d.distance_km, 1900.0);
}

#[tokio::test]
async fn test_concurrent_geocodes_hit_service_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geocode/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(geocode_body(-49.2733, -25.4284, "Curitiba, PR, Brazil"))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OrsClient::from_config(&maps_config(&server)).unwrap();
    let resolver = DistanceResolver::from_backend(Arc::new(client), &CacheConfig::default());
    let place = Place::new("Curitiba", "PR");

    let lookups = (0..6).map(|_| resolver.geocoder().resolve(&place));
    let hits = futures::future::join_all(lookups).await;

    for hit in hits {
        let hit = hit.unwrap();
        assert_eq!(hit.source, GeoSource::Network);
        assert_eq!(hit.label, "Curitiba, PR, Brazil");
    }
}

#[tokio::test]
async fn test_server_error_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = OrsClient::from_config(&maps_config(&server)).unwrap();
    let err = client
        .route(GeoPoint::new(-23.55, -46.63), GeoPoint::new(-22.90, -47.06))
        .await
        .unwrap_err();

    assert_eq!(err, LookupError::Status(503));
    assert_eq!(client.dispatcher().stats().failed, 1);
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut config = maps_config(&server);
    config.timeout_secs = 1;
    let client = OrsClient::from_config(&config).unwrap();

    let err = client.geocode(&Place::new("Campinas", "SP")).await.unwrap_err();
    assert_eq!(err, LookupError::Timeout(1000));
    assert_eq!(client.dispatcher().stats().timed_out, 1);
}

#[tokio::test]
async fn test_missing_api_key_never_calls_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = maps_config(&server);
    config.api_key = None;
    let client = OrsClient::from_config(&config).unwrap();

    let err = client.geocode(&Place::new("Campinas", "SP")).await.unwrap_err();
    assert_eq!(err, LookupError::MissingApiKey);

    // A cascata ainda produz uma distância
    let resolver = DistanceResolver::from_backend(Arc::new(client), &CacheConfig::default());
    let d = resolver
        .resolve(&Place::new("São Paulo", "SP"), &Place::new("Campinas", "SP"))
        .await;
    assert_eq!(d.method, DistanceMethod::GreatCircle);
}
