// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server wiring: shared state, router, and listener

use std::sync::Arc;

use ab_glyph::FontVec;
use axum::extract::{Form, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::detect::{detect_both_handler, detect_handler};
use super::detections::{recent_detections_handler, statistics_handler, update_status_handler};
use super::errors::ApiError;
use crate::detect::CategoryMap;
use crate::eventlog::EventLog;
use crate::registry::{ModelName, ModelRegistry};
use crate::store::DetectionStore;
use crate::version;

/// Shared per-request state, cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub store: Option<Arc<dyn DetectionStore>>,
    pub categories: Arc<CategoryMap>,
    pub event_log: Option<Arc<EventLog>>,
    pub font: Option<Arc<FontVec>>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/", get(health_handler))
        // Model registry
        .route("/models", get(models_handler))
        .route("/models/switch", post(switch_model_handler))
        // Detection endpoints
        .route("/detect", post(detect_handler))
        .route("/detect/both", post(detect_both_handler))
        // Persisted detections
        .route("/detections/recent", get(recent_detections_handler))
        .route("/statistics", get(statistics_handler))
        .route("/detections/:id/status", put(update_status_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the listener and serve until the process exits
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("🚀 Detection API listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = match &state.store {
        Some(store) => {
            if store.ping().await {
                "connected"
            } else {
                "disconnected"
            }
        }
        None => "disconnected",
    };

    Json(json!({
        "message": format!("{} running", version::get_version_string()),
        "database": database,
    }))
}

async fn models_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let current = state.registry.current_name().await;

    Json(json!({
        "models": state.registry.available(),
        "current_model": current.as_str(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SwitchForm {
    pub model_name: String,
}

/// POST /models/switch - Change the model used by single-model detection
async fn switch_model_handler(
    State(state): State<AppState>,
    Form(form): Form<SwitchForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = ModelName::parse(&form.model_name).ok_or(ApiError::UnknownModel {
        model: form.model_name.clone(),
    })?;

    state.registry.select(name).await;
    info!("Switched current model to {}", name);

    Ok(Json(json!({
        "message": format!("Switched to {} model", name),
        "current_model": name.as_str(),
    })))
}
