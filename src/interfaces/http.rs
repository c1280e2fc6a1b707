//! HTTP API for the forecasting service.
//!
//! Thin transport over [`ForecastService`]: API-key check, JSON in/out, and
//! error-to-status mapping. Model calls run on the blocking pool.

use crate::application::forecast_service::{ForecastService, PredictRequest, PredictResponse};
use crate::application::ml::ModelsStatus;
use crate::domain::errors::ForecastError;
use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared handler state
pub struct AppState {
    pub service: Arc<ForecastService>,
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(service: Arc<ForecastService>, api_key: Option<String>) -> Self {
        Self { service, api_key }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let expected = self.api_key.as_deref().ok_or(ApiError::KeyNotConfigured)?;
        let provided = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());

        match provided {
            Some(key) if key == expected => Ok(()),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub models: ModelsStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Failures surfaced to HTTP clients
#[derive(Debug)]
pub enum ApiError {
    KeyNotConfigured,
    Unauthorized,
    /// Body did not match the request schema
    InvalidRequest(String),
    Forecast(ForecastError),
    Internal(String),
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        ApiError::Forecast(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::KeyNotConfigured | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Forecast(ForecastError::MissingHistory) => StatusCode::BAD_REQUEST,
            ApiError::Forecast(ForecastError::ModelsNotReady { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Forecast(ForecastError::Inference { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ApiError::KeyNotConfigured => "API_KEY not configured".to_string(),
            ApiError::Unauthorized => "Invalid API key".to_string(),
            ApiError::InvalidRequest(reason) => reason.clone(),
            ApiError::Forecast(err) => err.to_string(),
            ApiError::Internal(reason) => reason.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, self.detail());
        }
        (status, Json(ErrorBody { detail: self.detail() })).into_response()
    }
}

/// Health check
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        time: Utc::now(),
    })
}

/// Per-role load status
pub async fn models_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, ApiError> {
    state.authorize(&headers)?;
    Ok(Json(StatusResponse {
        models: state.service.status(),
    }))
}

/// Run the three models and combine them.
///
/// The body is parsed only after the key check passes.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    state.authorize(&headers)?;
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;

    let service = state.service.clone();
    let response = tokio::task::spawn_blocking(move || service.predict(&request))
        .await
        .map_err(|e| ApiError::Internal(format!("Prediction task failed: {}", e)))??;

    Ok(Json(response))
}

/// Rebuild the registry from disk and report the new status
pub async fn reload_models(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, ApiError> {
    state.authorize(&headers)?;

    let service = state.service.clone();
    let models = tokio::task::spawn_blocking(move || service.reload())
        .await
        .map_err(|e| ApiError::Internal(format!("Reload task failed: {}", e)))?;

    info!("Models reloaded via API");
    Ok(Json(StatusResponse { models }))
}

/// Prometheus text exposition
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.service.metrics() {
        Some(metrics) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            metrics.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Create API router
pub fn create_router(state: Arc<AppState>) -> Router {
    if state.api_key.is_none() {
        warn!("API_KEY is not set; authenticated endpoints will answer 500");
    }

    Router::new()
        .route("/health", get(health_check))
        .route("/ml/models/status", get(models_status))
        .route("/ml/predict", post(predict))
        .route("/ml/models/reload", post(reload_models))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

/// Bind and serve until the process is interrupted
pub async fn serve(state: Arc<AppState>, address: &str) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("API server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received. Exiting...");
            }
        })
        .await?;

    Ok(())
}
