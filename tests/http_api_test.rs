use axum::Json;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, State};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::IntoResponse;
use novacast::application::forecast_service::{ForecastService, PredictRequest};
use novacast::config::ModelEnvConfig;
use novacast::infrastructure::mock::{MockModelLoader, MockRuntime};
use novacast::infrastructure::observability::Metrics;
use novacast::interfaces::http::{self, API_KEY_HEADER, ApiError, AppState};
use serde_json::json;
use std::sync::Arc;

const KEY: &str = "test-key";

fn state(dir: &tempfile::TempDir, with_artifacts: bool) -> Arc<AppState> {
    let config = ModelEnvConfig {
        model_path: dir.path().to_path_buf(),
        ..ModelEnvConfig::default()
    };
    if with_artifacts {
        for source in config.sources() {
            std::fs::write(&source.path, b"stub").unwrap();
        }
    }

    let loader = MockModelLoader::new()
        .with_runtime("lstm.onnx", Arc::new(MockRuntime::new("lstm", 1.0)))
        .with_runtime("xgboost.json", Arc::new(MockRuntime::new("xgboost", 110.0)))
        .with_runtime("transformer.onnx", Arc::new(MockRuntime::new("transformer", 1.0)));

    let service = ForecastService::load(config.sources(), Arc::new(loader))
        .with_metrics(Metrics::default());
    Arc::new(AppState::new(Arc::new(service), Some(KEY.to_string())))
}

fn authed() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(API_KEY_HEADER, KEY.parse().unwrap());
    headers
}

fn request(history: serde_json::Value) -> PredictRequest {
    serde_json::from_value(json!({
        "symbol": "ETH",
        "timeframe": "1d",
        "historicalData": history
    }))
    .unwrap()
}

#[tokio::test]
async fn test_health_needs_no_key() {
    let Json(health) = http::health_check().await;
    assert!(health.ok);

    let body = serde_json::to_value(&health).unwrap();
    assert!(body["time"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn test_predict_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir, true);

    let history = json!([{"close": 100.0}, {"close": 105.0}]);
    let Json(response) = http::predict(State(state.clone()), authed(), Ok(Json(request(history))))
        .await
        .unwrap();

    // Window spans 100..105, so a scaled output of 1.0 is the window max
    assert_eq!(response.predictions.lstm.price, 105.0);
    assert_eq!(response.predictions.xgboost.price, 110.0);
    assert_eq!(response.symbol, "ETH");
}

#[tokio::test]
async fn test_predict_rejects_bad_key() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir, true);

    let mut headers = HeaderMap::new();
    headers.insert(API_KEY_HEADER, "nope".parse().unwrap());

    let err = http::predict(State(state.clone()), headers, Ok(Json(request(json!([{"close": 1}])))))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);

    let err = http::models_status(State(state), HeaderMap::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

/// Extract the body the way the router would, keeping any rejection
async fn extract_body(body: &str) -> Result<Json<PredictRequest>, JsonRejection> {
    let request = Request::builder()
        .method("POST")
        .uri("/ml/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    Json::<PredictRequest>::from_request(request, &()).await
}

#[tokio::test]
async fn test_key_is_checked_before_body() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir, true);

    let payload = extract_body(r#"{"symbol":"A","timeframe":"90d"}"#).await;
    assert!(payload.is_err());

    let err = http::predict(State(state), HeaderMap::new(), payload)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_body_with_key_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir, true);

    let payload = extract_body(r#"{"symbol":"A","timeframe":"90d"}"#).await;
    let err = http::predict(State(state), authed(), payload).await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidRequest(_)));
    assert!(err.detail().contains("90d"));
    assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_valid_body_is_extracted() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir, true);

    let payload =
        extract_body(r#"{"symbol":"A","timeframe":"1d","historicalData":[{"close":100},{"close":105}]}"#)
            .await;
    let Json(response) = http::predict(State(state), authed(), payload).await.unwrap();
    assert_eq!(response.predictions.lstm.price, 105.0);
}

#[tokio::test]
async fn test_unconfigured_key_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let configured = state(&dir, true);
    let state = Arc::new(AppState::new(configured.service.clone(), None));

    let err = http::models_status(State(state), authed()).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_error_statuses() {
    let dir = tempfile::tempdir().unwrap();

    let ready = state(&dir, true);
    let err = http::predict(State(ready), authed(), Ok(Json(request(json!([{"open": 3}])))))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(err.detail().contains("close"));

    let empty_dir = tempfile::tempdir().unwrap();
    let not_ready = state(&empty_dir, false);
    let err = http::predict(State(not_ready), authed(), Ok(Json(request(json!([{"close": 3}])))))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_status_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir, false);

    let Json(before) = http::models_status(State(state.clone()), authed()).await.unwrap();
    assert!(!before.models.lstm.loaded);
    assert_eq!(before.models.meta.errors.len(), 3);

    for file in ["lstm.onnx", "xgboost.json", "transformer.onnx"] {
        std::fs::write(dir.path().join(file), b"stub").unwrap();
    }

    let Json(after) = http::reload_models(State(state.clone()), authed()).await.unwrap();
    assert!(after.models.lstm.loaded && after.models.xgboost.loaded && after.models.transformer.loaded);
    assert!(after.models.meta.errors.is_empty());
    assert_eq!(
        after.models.xgboost.file.as_deref(),
        Some(dir.path().join("xgboost.json").as_path())
    );

    let body = serde_json::to_value(&after).unwrap();
    assert!(body["models"]["meta"]["loadedAt"].is_string());
    assert!(body["models"]["meta"]["paths"]["transformer"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir, true);

    let response = http::get_metrics(State(state)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
}
