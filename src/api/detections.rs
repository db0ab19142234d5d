// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Read and update endpoints for persisted detections

use axum::extract::{Form, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::warn;

use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Optional category filter (weapon, fire, smoke)
    pub detection_type: Option<String>,
    #[serde(default = "default_hours")]
    pub hours: i32,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default = "default_hours")]
    pub hours: i32,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateForm {
    pub status: String,
    pub notes: Option<String>,
}

fn default_limit() -> i64 {
    10
}

fn default_hours() -> i32 {
    24
}

/// GET /detections/recent - Latest persisted detections, newest first
pub async fn recent_detections_handler(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = state.store.as_ref().ok_or(ApiError::StoreUnavailable)?;

    let detections = store
        .recent_detections(query.limit, query.detection_type, query.hours)
        .await
        .map_err(|e| {
            warn!("Failed to query recent detections: {}", e);
            ApiError::StoreError(format!("Failed to retrieve detections: {}", e))
        })?;

    Ok(Json(serde_json::json!({
        "detections": detections,
        "count": detections.len(),
        "period_hours": query.hours,
    })))
}

/// GET /statistics - Per-category aggregates over a time window
pub async fn statistics_handler(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = state.store.as_ref().ok_or(ApiError::StoreUnavailable)?;

    let statistics = store.statistics(query.hours).await.map_err(|e| {
        warn!("Failed to query statistics: {}", e);
        ApiError::StoreError(format!("Failed to retrieve statistics: {}", e))
    })?;

    Ok(Json(serde_json::json!({
        "statistics": statistics,
        "period_hours": query.hours,
    })))
}

/// PUT /detections/:id/status - Update review status on one record
pub async fn update_status_handler(
    State(state): State<AppState>,
    Path(detection_id): Path<i64>,
    Form(form): Form<StatusUpdateForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = state.store.as_ref().ok_or(ApiError::StoreUnavailable)?;

    let updated = store
        .update_status(detection_id, form.status.clone(), form.notes)
        .await
        .map_err(|e| {
            warn!("Failed to update detection {}: {}", detection_id, e);
            ApiError::StoreError(format!("Update failed: {}", e))
        })?;

    if updated {
        Ok(Json(serde_json::json!({
            "success": true,
            "detection_id": detection_id,
            "new_status": form.status,
        })))
    } else {
        Ok(Json(serde_json::json!({
            "error": "Update failed",
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_query_defaults() {
        let query: RecentQuery = serde_urlencoded::from_str("").unwrap();
        assert_eq!(query.limit, 10);
        assert_eq!(query.hours, 24);
        assert!(query.detection_type.is_none());
    }

    #[test]
    fn test_recent_query_with_filter() {
        let query: RecentQuery =
            serde_urlencoded::from_str("limit=5&detection_type=weapon&hours=48").unwrap();
        assert_eq!(query.limit, 5);
        assert_eq!(query.detection_type.as_deref(), Some("weapon"));
        assert_eq!(query.hours, 48);
    }

    #[test]
    fn test_status_form_optional_notes() {
        let form: StatusUpdateForm = serde_urlencoded::from_str("status=reviewed").unwrap();
        assert_eq!(form.status, "reviewed");
        assert!(form.notes.is_none());

        let form: StatusUpdateForm =
            serde_urlencoded::from_str("status=false_positive&notes=glare").unwrap();
        assert_eq!(form.notes.as_deref(), Some("glare"));
    }
}
