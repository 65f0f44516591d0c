//! HTTP surface: `POST /api/generate`, `POST /api/upscale` and `GET /health`.

use crate::config::ServerConfig;
use crate::error::StudioError;
use crate::studio::Studio;
use crate::types::{GenerateResponse, GenerationRequest, UpscaleRequest, UpscaleResponse};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const GENERATE_FAILED: &str = "Failed to generate image";
const UPSCALE_FAILED: &str = "Failed to upscale image";

/// Error returned by the HTTP handlers.
///
/// Validation problems become `400 {"error"}`; everything else becomes
/// `500 {"error", "details"}` with a fixed label per endpoint.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Failed {
        label: &'static str,
        details: String,
    },
}

impl ApiError {
    fn from_studio(label: &'static str, err: StudioError) -> Self {
        if err.is_validation() {
            return ApiError::BadRequest(err.to_string());
        }
        tracing::error!(error = %err, "{}", label);
        ApiError::Failed {
            label,
            details: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Failed { label, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": label, "details": details })),
            )
                .into_response(),
        }
    }
}

/// Builds the router around a shared [`Studio`].
pub fn router(studio: Arc<Studio>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate", post(generate))
        .route("/api/upscale", post(upscale))
        .layer(TraceLayer::new_for_http())
        .with_state(studio)
}

/// Binds the configured address and serves until Ctrl+C or SIGTERM.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let studio = Arc::new(Studio::from_config(&config)?);
    let addr = config.socket_addr()?;

    tracing::info!(
        "Starting server on {} (relay: {}, retries: {}, retry delay: {:?})",
        addr,
        config.relay_url().unwrap_or_default(),
        config.retry.retries,
        config.retry.delay
    );
    if config.storage.resolve().is_err() {
        tracing::warn!("Storage is not fully configured, uploads will fail until it is");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(studio))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn generate(
    State(studio): State<Arc<Studio>>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    let request: GenerationRequest = parse_body(&body)?;

    let outcome = studio
        .generate(&request)
        .await
        .map_err(|e| ApiError::from_studio(GENERATE_FAILED, e))?;

    Ok(Json(GenerateResponse {
        success: true,
        images: outcome.images,
        enhanced_prompt: outcome.enhanced_prompt,
    }))
}

async fn upscale(
    State(studio): State<Arc<Studio>>,
    body: Bytes,
) -> Result<Json<UpscaleResponse>, ApiError> {
    let request: UpscaleRequest = parse_body(&body)?;

    let image = studio
        .upscale(&request)
        .await
        .map_err(|e| ApiError::from_studio(UPSCALE_FAILED, e))?;

    Ok(Json(UpscaleResponse {
        success: true,
        image,
    }))
}

/// Parses a JSON body whatever `Content-Type` the caller sent.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
