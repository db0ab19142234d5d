// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP API integration tests
//!
//! Exercises the router end to end with an in-memory store. Model files are
//! not available in CI, so inference paths are tested up to the
//! model-not-loaded responses; the decode and NMS layers have their own
//! unit tests.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use tower::ServiceExt;

use fabstir_vision_node::api::{create_router, AppState};
use fabstir_vision_node::detect::CategoryMap;
use fabstir_vision_node::registry::ModelRegistry;
use fabstir_vision_node::store::{
    CategoryStats, DetectionRow, DetectionStore, NewDetection,
};

const BOUNDARY: &str = "----testboundary7MA4YWxkTrZu0gW";

/// In-memory stand-in for the Postgres store
#[derive(Default)]
struct FakeStore {
    rows: Mutex<Vec<DetectionRow>>,
}

impl FakeStore {
    fn with_rows(rows: Vec<DetectionRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }
}

#[async_trait]
impl DetectionStore for FakeStore {
    async fn insert_detection(&self, detection: &NewDetection) -> Result<i64> {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(DetectionRow {
            id,
            camera_id: detection.camera_id.clone(),
            timestamp: Utc::now(),
            object_label: detection.object_label.clone(),
            category: detection.category.clone(),
            confidence: detection.confidence,
            bbox_coordinates: serde_json::json!({
                "x1": detection.bbox.x1,
                "y1": detection.bbox.y1,
                "x2": detection.bbox.x2,
                "y2": detection.bbox.y2,
            }),
            model_name: detection.model_name.clone(),
            status: "active".to_string(),
            notes: None,
        });
        Ok(id)
    }

    async fn recent_detections(
        &self,
        limit: i64,
        category: Option<String>,
        _hours: i32,
    ) -> Result<Vec<DetectionRow>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .rev()
            .filter(|row| category.as_ref().map_or(true, |c| &row.category == c))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn statistics(&self, _hours: i32) -> Result<Vec<CategoryStats>> {
        let rows = self.rows.lock().unwrap();
        let mut stats: Vec<CategoryStats> = Vec::new();
        for row in rows.iter() {
            match stats.iter_mut().find(|s| s.category == row.category) {
                Some(entry) => entry.count += 1,
                None => stats.push(CategoryStats {
                    category: row.category.clone(),
                    count: 1,
                    avg_confidence: row.confidence as f64,
                    last_seen: Some(row.timestamp),
                }),
            }
        }
        Ok(stats)
    }

    async fn update_status(
        &self,
        id: i64,
        status: String,
        notes: Option<String>,
    ) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|row| row.id == id) {
            Some(row) => {
                row.status = status;
                row.notes = notes;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> bool {
        true
    }
}

fn sample_row(id: i64, category: &str) -> DetectionRow {
    DetectionRow {
        id,
        camera_id: "CAM_001".to_string(),
        timestamp: Utc::now(),
        object_label: "gun".to_string(),
        category: category.to_string(),
        confidence: 0.88,
        bbox_coordinates: serde_json::json!({"x1": 1, "y1": 2, "x2": 3, "y2": 4}),
        model_name: "yolov8-weapon".to_string(),
        status: "active".to_string(),
        notes: None,
    }
}

fn test_state(store: Option<Arc<dyn DetectionStore>>) -> AppState {
    AppState {
        registry: Arc::new(ModelRegistry::empty()),
        store,
        categories: Arc::new(CategoryMap::default()),
        event_log: None,
        font: None,
    }
}

/// Build a multipart/form-data body with the given (name, value) parts
fn multipart_body(parts: &[(&str, &[u8])]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"test.jpg\"\r\n\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(value);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
    (content_type, body)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_connected_store() {
    let app = create_router(test_state(Some(Arc::new(FakeStore::default()))));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["database"], "connected");
    assert!(json["message"].as_str().unwrap().contains("running"));
}

#[tokio::test]
async fn test_health_without_store() {
    let app = create_router(test_state(None));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["database"], "disconnected");
}

#[tokio::test]
async fn test_models_endpoint_with_empty_registry() {
    let app = create_router(test_state(None));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["current_model"], "weapon");
    assert_eq!(json["models"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_switch_model_updates_selection() {
    let state = test_state(None);
    let app = create_router(state.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/models/switch")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("model_name=fire_smoke"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["current_model"], "fire_smoke");
    assert_eq!(json["message"], "Switched to fire_smoke model");

    // The selection is visible on a subsequent /models call
    let response = create_router(state)
        .oneshot(
            Request::builder()
                .uri("/models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["current_model"], "fire_smoke");
}

#[tokio::test]
async fn test_switch_to_unknown_model_is_rejected() {
    let state = test_state(None);
    let app = create_router(state.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/models/switch")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("model_name=person"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Invalid model name. Use 'weapon' or 'fire_smoke'");

    // Selection is unchanged
    assert_eq!(state.registry.current_name().await.as_str(), "weapon");
}

#[tokio::test]
async fn test_detect_without_file_is_422() {
    let app = create_router(test_state(None));
    let (content_type, body) = multipart_body(&[("camera_id", b"CAM_001")]);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/detect")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = json_body(response).await;
    assert_eq!(json["error"], "file is required");
}

#[tokio::test]
async fn test_detect_without_model_reports_in_band() {
    let app = create_router(test_state(None));
    let (content_type, body) = multipart_body(&[("file", b"not-really-an-image")]);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/detect")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    // Upload shape was fine, so the missing model rides on a 200
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Model not loaded");
}

#[tokio::test]
async fn test_detect_both_without_models_reports_in_band() {
    let app = create_router(test_state(None));
    let (content_type, body) = multipart_body(&[("file", b"bytes")]);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/detect/both")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Weapon model not loaded");
}

#[tokio::test]
async fn test_recent_detections_returns_rows() {
    let store = FakeStore::with_rows(vec![sample_row(1, "weapon"), sample_row(2, "fire")]);
    let app = create_router(test_state(Some(Arc::new(store))));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/detections/recent?limit=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["period_hours"], 24);
    // Newest first
    assert_eq!(json["detections"][0]["id"], 2);
}

#[tokio::test]
async fn test_recent_detections_category_filter() {
    let store = FakeStore::with_rows(vec![sample_row(1, "weapon"), sample_row(2, "fire")]);
    let app = create_router(test_state(Some(Arc::new(store))));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/detections/recent?detection_type=fire")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = json_body(response).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["detections"][0]["category"], "fire");
}

#[tokio::test]
async fn test_recent_detections_without_store() {
    let app = create_router(test_state(None));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/detections/recent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Database not available");
}

#[tokio::test]
async fn test_statistics_aggregates_by_category() {
    let store = FakeStore::with_rows(vec![
        sample_row(1, "weapon"),
        sample_row(2, "weapon"),
        sample_row(3, "smoke"),
    ]);
    let app = create_router(test_state(Some(Arc::new(store))));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/statistics?hours=48")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["period_hours"], 48);
    let stats = json["statistics"].as_array().unwrap();
    assert_eq!(stats.len(), 2);
}

#[tokio::test]
async fn test_update_status_success() {
    let store = FakeStore::with_rows(vec![sample_row(1, "weapon")]);
    let app = create_router(test_state(Some(Arc::new(store))));

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/detections/1/status")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("status=reviewed&notes=checked"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["detection_id"], 1);
    assert_eq!(json["new_status"], "reviewed");
}

#[tokio::test]
async fn test_update_status_missing_row() {
    let store = FakeStore::default();
    let app = create_router(test_state(Some(Arc::new(store))));

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/detections/99/status")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("status=reviewed"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Update failed");
}
