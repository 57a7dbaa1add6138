//! Health endpoint
//!
//! `GET /status` reports whether the cookie file exists and has content.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Router, extract::State, http::StatusCode, response::Json, routing::get};
use serde::{Deserialize, Serialize};

use crate::error::{RefreshError, Result};

#[derive(Debug, Clone)]
pub struct HealthState {
    cookies_file: Arc<PathBuf>,
}

impl HealthState {
    pub fn new(cookies_file: impl Into<PathBuf>) -> Self {
        Self {
            cookies_file: Arc::new(cookies_file.into()),
        }
    }
}

/// Body of a `/status` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub fresh: bool,
    pub message: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/status", get(status)).with_state(state)
}

async fn status(State(state): State<HealthState>) -> (StatusCode, Json<HealthStatus>) {
    let present = match tokio::fs::metadata(state.cookies_file.as_path()).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::error!("Healthcheck: error accessing cookies file: {}", e);
            false
        }
    };

    if present {
        tracing::debug!("Healthcheck: cookies file found.");
        (
            StatusCode::OK,
            Json(HealthStatus {
                fresh: true,
                message: "Cookies file found.".to_string(),
            }),
        )
    } else {
        tracing::warn!("Healthcheck: cookies file missing or empty.");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthStatus {
                fresh: false,
                message: "Cookies file missing or empty.".to_string(),
            }),
        )
    }
}

/// Serve the health endpoint on `addr` until `shutdown` resolves
pub async fn serve<F>(addr: SocketAddr, state: HealthState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RefreshError::Server(format!("failed to bind {addr}: {e}")))?;
    tracing::info!("Health server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| RefreshError::Server(e.to_string()))
}
