//! HTTP front end of the prediction service.
//!
//! | Method | Path                          | Body                    |
//! |--------|-------------------------------|-------------------------|
//! | GET    | `/health`                     |                         |
//! | POST   | `/predict`                    | [`PredictRequest`]      |
//! | GET    | `/models/{model_type}/status` |                         |
//! | POST   | `/models/{model_type}/reload` |                         |
//! | GET    | `/comparison`                 |                         |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, error, info, warn};
use serde_json::json;
use tokio::net::TcpListener;

use crate::error::{Result, SpamError};
use crate::ml::ModelKind;
use crate::serving::service::{
    ModelStatusRequest, ModelStatusResponse, PredictRequest, PredictResponse, ServingState,
};

/// Build the router over a shared service state.
pub fn router(state: Arc<ServingState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/models/{model_type}/status", get(model_status))
        .route("/models/{model_type}/reload", post(reload_model))
        .route("/comparison", get(comparison))
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn serve(state: Arc<ServingState>, host: &str, port: u16) -> Result<()> {
    let address = format!("{host}:{port}");
    debug!("Starting HTTP server on: {address}");

    let listener = TcpListener::bind(&address).await.map_err(|e| {
        error!("Failed to bind to address {address}: {e}");
        SpamError::configuration(format!("failed to bind to {address}: {e}"))
    })?;
    info!("Serving spam predictions on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {e}");
    }
}

async fn health(State(state): State<Arc<ServingState>>) -> impl IntoResponse {
    let models: Vec<&str> = state
        .loaded_models()
        .into_iter()
        .map(ModelKind::as_str)
        .collect();
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "models_loaded": models,
    }))
}

async fn predict(
    State(state): State<Arc<ServingState>>,
    Json(request): Json<PredictRequest>,
) -> Json<PredictResponse> {
    Json(state.predict(&request))
}

async fn model_status(
    State(state): State<Arc<ServingState>>,
    Path(model_type): Path<String>,
) -> Json<ModelStatusResponse> {
    Json(state.model_status(&ModelStatusRequest { model_type }))
}

async fn reload_model(
    State(state): State<Arc<ServingState>>,
    Path(model_type): Path<String>,
) -> Response {
    let kind = match model_type.parse::<ModelKind>() {
        Ok(kind) => kind,
        Err(e) => {
            return (StatusCode::NOT_FOUND, Json(json!({"error": e.to_string()}))).into_response();
        }
    };

    // Loading reads and parses the artifact from disk.
    let reload_state = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || reload_state.reload(kind)).await;

    match result {
        Ok(Ok(())) => (
            StatusCode::OK,
            Json(json!({"status": "reloaded", "model_type": kind.as_str()})),
        )
            .into_response(),
        Ok(Err(e)) => {
            warn!("Reload of {kind} model failed: {e}");
            let status = match e {
                SpamError::ModelUnavailable(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({"error": e.to_string()}))).into_response()
        }
        Err(e) => {
            error!("Reload task failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "reload task failed"})),
            )
                .into_response()
        }
    }
}

async fn comparison(State(state): State<Arc<ServingState>>) -> Response {
    match state.comparison() {
        Ok(document) => Json(document).into_response(),
        Err(e) if e.is_unavailable() => Json(json!({
            "available": false,
            "reason": e.to_string(),
        }))
        .into_response(),
        Err(e) => {
            error!("Failed to read comparison: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::evaluation::{ClassificationMetrics, compare, save};
    use tempfile::TempDir;

    fn state(dir: &TempDir) -> Arc<ServingState> {
        let mut config = AppConfig::default();
        config.paths.models_dir = dir.path().join("models");
        config.paths.results_dir = dir.path().join("results");
        Arc::new(ServingState::new(config))
    }

    #[tokio::test]
    async fn test_predict_without_models() {
        let dir = TempDir::new().unwrap();
        let Json(response) = predict(
            State(state(&dir)),
            Json(PredictRequest {
                message: "free entry".to_string(),
                model_type: "baseline".to_string(),
            }),
        )
        .await;

        assert!(response.is_error());
        assert_eq!(response.spam_probability, 0.0);
    }

    #[tokio::test]
    async fn test_model_status_handler() {
        let dir = TempDir::new().unwrap();
        let Json(status) =
            model_status(State(state(&dir)), Path("challenger".to_string())).await;

        assert!(!status.is_loaded);
        assert_eq!(status.model_name, "Multinomial Naive Bayes");
    }

    #[tokio::test]
    async fn test_reload_status_codes() {
        let dir = TempDir::new().unwrap();

        let response = reload_model(State(state(&dir)), Path("bert".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Known model without a trained artifact.
        let response = reload_model(State(state(&dir)), Path("baseline".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_comparison_handler() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        // Missing document degrades to an "unavailable" body.
        let response = comparison(State(Arc::clone(&state))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let metrics = ClassificationMetrics::from_confusion_matrix([[9, 1], [2, 8]]).unwrap();
        let zeroed = ClassificationMetrics::zeroed();
        let record = compare(&metrics, &zeroed, 0.95, "baseline", "challenger");
        save(&record, &metrics, &zeroed, state.results_path()).unwrap();

        let response = comparison(State(Arc::clone(&state))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let status = state.model_status(&ModelStatusRequest::default());
        assert_eq!(status.f1_score, metrics.f1);
    }

    #[test]
    fn test_router_builds() {
        let dir = TempDir::new().unwrap();
        let _router = router(state(&dir));
    }
}
