use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use actix_web_httpauth::middleware::HttpAuthentication;
use async_trait::async_trait;
use common::types::{Identifier, MetricPair, MetricTimestamp};
use common::{Result, ServerConfig};
use serde_json::{json, Value};
use std::sync::Arc;

use telemetry_server::auth::validate_basic_auth;
use telemetry_server::devices::MemoryDeviceDirectory;
use telemetry_server::ingest::HandlerRegistry;
use telemetry_server::registration::{GatewayOrchestrator, RegistrationOutcome};
use telemetry_server::server::{configure_routes, AppState};
use telemetry_server::store::{DocumentStore, MemoryStore};

struct NoopOrchestrator;

#[async_trait]
impl GatewayOrchestrator for NoopOrchestrator {
    async fn create_gateway(&self, _uuid: &str, _public_key: &str) -> Result<RegistrationOutcome> {
        Ok(RegistrationOutcome::Success)
    }
}

fn test_config() -> ServerConfig {
    ServerConfig {
        redis_url: "redis://127.0.0.1:6379".to_string(),
        bind_address: "127.0.0.1:0".to_string(),
        basic_auth_username: "admin".to_string(),
        basic_auth_password: "secret".to_string(),
        orchestrator_base_url: "https://orc8r.local/magma/v1".to_string(),
        orchestrator_network: "openschema".to_string(),
        orchestrator_identity_pem: String::new(),
        gateway_base_id: "openschema_ue_".to_string(),
    }
}

fn test_state(store: Arc<MemoryStore>) -> web::Data<AppState> {
    web::Data::new(AppState {
        config: test_config(),
        registry: HandlerRegistry::baseline(),
        store,
        orchestrator: Arc::new(NoopOrchestrator),
        devices: Arc::new(MemoryDeviceDirectory::new()),
    })
}

fn auth_header() -> (&'static str, String) {
    ("Authorization", format!("Basic {}", base64::encode("admin:secret")))
}

fn push_body(metric_name: &str, client_type: &str, pairs: Vec<MetricPair>) -> Value {
    json!({
        "metricName": metric_name,
        "metricsList": pairs,
        "identifier": Identifier {
            client_type: client_type.to_string(),
            uuid: "276f45e0-ae4b-4bfa-b650-4a2b5c51bd1a".to_string(),
        },
        "timestamp": MetricTimestamp {
            timestamp: 1_621_439_106_916,
            offset_minutes: -300,
        },
    })
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .wrap(HttpAuthentication::basic(validate_basic_auth))
                .configure(configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn wifi_session_push_nests_location() {
    let store = Arc::new(MemoryStore::new());
    let state = test_state(store.clone());
    let app = test_app!(state);

    let body = push_body(
        "openschemaWifiSession",
        "android",
        vec![
            MetricPair::new("ssid", "net1"),
            MetricPair::new("bssid", "aa:bb"),
            MetricPair::new("longitude", "-122.4"),
            MetricPair::new("latitude", "37.7"),
            MetricPair::new("rxBytes", "2048"),
            MetricPair::new("txBytes", "1024"),
        ],
    );

    let req = test::TestRequest::post()
        .uri("/metrics/push")
        .insert_header(auth_header())
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let documents = store.fetch_all("openschemaWifiSession").await.unwrap();
    assert_eq!(documents.len(), 1);
    let metrics = &documents[0]["metrics"];
    assert_eq!(
        metrics["location"],
        json!({"longitude": -122.4, "latitude": 37.7})
    );
    assert!(metrics.get("longitude").is_none());
    assert!(metrics.get("latitude").is_none());
    assert_eq!(metrics["rxBytes"], json!(2048));
}

#[actix_web::test]
async fn double_push_stores_two_documents() {
    let store = Arc::new(MemoryStore::new());
    let state = test_state(store.clone());
    let app = test_app!(state);

    let body = push_body(
        "openschemaDeviceInfo",
        "android",
        vec![MetricPair::new("model", "pixel")],
    );

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/metrics/push")
            .insert_header(auth_header())
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    // No dedup key: identical pushes accumulate.
    assert_eq!(store.count("openschemaDeviceInfo").await.unwrap(), 2);
}

#[actix_web::test]
async fn android_pairs_are_numerically_coerced() {
    let store = Arc::new(MemoryStore::new());
    let state = test_state(store.clone());
    let app = test_app!(state);

    let body = push_body(
        "openschemaUsageHourly",
        "android",
        vec![
            MetricPair::new("rxBytes", "42"),
            MetricPair::new("transportType", "wifi"),
        ],
    );

    let req = test::TestRequest::post()
        .uri("/metrics/push")
        .insert_header(auth_header())
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let documents = store.fetch_all("openschemaUsageHourly").await.unwrap();
    assert_eq!(documents[0]["metrics"]["rxBytes"], json!(42));
    assert_eq!(documents[0]["metrics"]["transportType"], json!("wifi"));
}

#[actix_web::test]
async fn connection_report_folds_transport_data() {
    let store = Arc::new(MemoryStore::new());
    let state = test_state(store.clone());
    let app = test_app!(state);

    let body = push_body(
        "openschemaConnectionReport",
        "android",
        vec![
            MetricPair::new("transportType", "wifi"),
            MetricPair::new("ssid", "net1"),
            MetricPair::new("bssid", "aa:bb"),
        ],
    );

    let req = test::TestRequest::post()
        .uri("/metrics/push")
        .insert_header(auth_header())
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let documents = store.fetch_all("openschemaConnectionReport").await.unwrap();
    let metrics = &documents[0]["metrics"];
    assert_eq!(
        metrics["transportData"],
        json!({"ssid": "net1", "bssid": "aa:bb"})
    );
    assert!(metrics.get("ssid").is_none());
    assert!(metrics.get("bssid").is_none());
}

#[actix_web::test]
async fn unknown_metric_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let state = test_state(store.clone());
    let app = test_app!(state);

    let body = push_body(
        "notARegisteredMetric",
        "android",
        vec![MetricPair::new("anything", "1")],
    );

    let req = test::TestRequest::post()
        .uri("/metrics/push")
        .insert_header(auth_header())
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response: Value = test::read_body_json(resp).await;
    assert_eq!(response["error"], json!("UNKNOWN_METRIC"));
    assert_eq!(store.count("notARegisteredMetric").await.unwrap(), 0);
}

#[actix_web::test]
async fn invalid_transport_type_fails_to_store() {
    let store = Arc::new(MemoryStore::new());
    let state = test_state(store.clone());
    let app = test_app!(state);

    let body = push_body(
        "openschemaNetworkQuality",
        "android",
        vec![MetricPair::new("transportType", "satellite")],
    );

    let req = test::TestRequest::post()
        .uri("/metrics/push")
        .insert_header(auth_header())
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.count("openschemaNetworkQuality").await.unwrap(), 0);
}

#[actix_web::test]
async fn push_without_credentials_is_unauthorized() {
    let store = Arc::new(MemoryStore::new());
    let state = test_state(store.clone());
    let app = test_app!(state);

    let body = push_body(
        "openschemaDeviceInfo",
        "android",
        vec![MetricPair::new("model", "pixel")],
    );

    let req = test::TestRequest::post()
        .uri("/metrics/push")
        .set_json(&body)
        .to_request();
    let resp = test::try_call_service(&app, req).await;
    match resp {
        Ok(resp) => assert_eq!(resp.status(), StatusCode::UNAUTHORIZED),
        Err(e) => assert_eq!(
            e.as_response_error().status_code(),
            StatusCode::UNAUTHORIZED
        ),
    }
}

#[actix_web::test]
async fn status_reports_storage_health() {
    let store = Arc::new(MemoryStore::new());
    let state = test_state(store);
    let app = test_app!(state);

    let req = test::TestRequest::get()
        .uri("/status")
        .insert_header(auth_header())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let response: Value = test::read_body_json(resp).await;
    assert_eq!(response["status"], json!("ok"));
}
