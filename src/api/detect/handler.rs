// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handlers

use std::io::Cursor;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use tracing::{error, info, warn};

use super::response::{DetectBothResponse, DetectResponse};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::detect::{
    annotate, decode_image_bytes, CategoryMap, Detection, COLOR_DEFAULT, COLOR_FIRE_SMOKE,
    COLOR_WEAPON,
};
use crate::registry::ModelName;
use crate::store::{DetectionStore, NewDetection};

/// Parsed multipart upload for the detect endpoints
struct DetectUpload {
    file: Vec<u8>,
    camera_id: String,
}

/// Read the multipart form. A missing `file` part is a validation error
/// (422) before any model is consulted.
async fn read_upload(mut multipart: Multipart) -> Result<DetectUpload, ApiError> {
    let mut file = None;
    let mut camera_id = "default".to_string();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::ValidationError {
            field: "multipart".to_string(),
            message: format!("Malformed multipart body: {}", e),
        }
    })? {
        match field.name() {
            Some("file") => {
                let bytes = field.bytes().await.map_err(|e| ApiError::ValidationError {
                    field: "file".to_string(),
                    message: format!("Failed to read file: {}", e),
                })?;
                file = Some(bytes.to_vec());
            }
            Some("camera_id") => {
                if let Ok(text) = field.text().await {
                    if !text.is_empty() {
                        camera_id = text;
                    }
                }
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::ValidationError {
        field: "file".to_string(),
        message: "file is required".to_string(),
    })?;

    Ok(DetectUpload { file, camera_id })
}

/// POST /detect - Run the currently selected model on an uploaded image
///
/// The selection is resolved once at the start of the request; a
/// concurrent switch does not affect a request already in flight.
pub async fn detect_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    // 1. Validate the upload shape
    let upload = read_upload(multipart).await?;

    // 2. Resolve the current model
    let model_name = state.registry.current_name().await;
    let model = state
        .registry
        .by_name(model_name)
        .ok_or_else(|| ApiError::ModelNotLoaded("Model not loaded".to_string()))?;

    // 3. Decode the image
    let (image, image_info) = decode_image_bytes(&upload.file).map_err(|e| {
        warn!("Failed to decode upload: {}", e);
        ApiError::InvalidImage
    })?;

    // 4. Run inference
    let detections = model.detect(&image).map_err(|e| {
        warn!("Detection failed: {}", e);
        ApiError::DetectionFailed(e.to_string())
    })?;

    info!(
        "Detected {} objects with {} model ({}x{} image)",
        detections.len(),
        model_name,
        image_info.width,
        image_info.height
    );

    // 5. Best-effort persistence, one attempt per detection
    let detection_ids = persist_detections(
        state.store.as_ref(),
        &state.categories,
        &upload.camera_id,
        model_name,
        &detections,
    )
    .await;

    // 6. Journal the call
    if let Some(journal) = &state.event_log {
        journal.append(model_name.as_str(), &detections);
    }

    // 7. Annotate and re-encode
    let annotated = annotate(&image, &detections, COLOR_DEFAULT, state.font.as_deref());
    let encoded = encode_jpeg_base64(&annotated)
        .map_err(|e| ApiError::InternalError(format!("Failed to encode image: {}", e)))?;

    Ok(Json(DetectResponse {
        detections,
        image: encoded,
        model_used: model_name.to_string(),
        saved_to_db: detection_ids.len(),
        detection_ids,
    }))
}

/// POST /detect/both - Run both models against the uploaded image
///
/// Either model being absent is a hard error for the whole call.
pub async fn detect_both_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DetectBothResponse>, ApiError> {
    let upload = read_upload(multipart).await?;

    let weapon_model = state
        .registry
        .by_name(ModelName::Weapon)
        .ok_or_else(|| ApiError::ModelNotLoaded("Weapon model not loaded".to_string()))?;
    let fire_smoke_model = state
        .registry
        .by_name(ModelName::FireSmoke)
        .ok_or_else(|| ApiError::ModelNotLoaded("Fire/Smoke model not loaded".to_string()))?;

    let (image, _) = decode_image_bytes(&upload.file).map_err(|e| {
        warn!("Failed to decode upload: {}", e);
        ApiError::InvalidImage
    })?;

    let weapon_detections = weapon_model.detect(&image).map_err(|e| {
        warn!("Weapon detection failed: {}", e);
        ApiError::DetectionFailed(e.to_string())
    })?;
    let fire_smoke_detections = fire_smoke_model.detect(&image).map_err(|e| {
        warn!("Fire/smoke detection failed: {}", e);
        ApiError::DetectionFailed(e.to_string())
    })?;

    let weapon_db_ids = persist_detections(
        state.store.as_ref(),
        &state.categories,
        &upload.camera_id,
        ModelName::Weapon,
        &weapon_detections,
    )
    .await;
    let fire_smoke_db_ids = persist_detections(
        state.store.as_ref(),
        &state.categories,
        &upload.camera_id,
        ModelName::FireSmoke,
        &fire_smoke_detections,
    )
    .await;

    let weapon_image = encode_jpeg_base64(&annotate(
        &image,
        &weapon_detections,
        COLOR_WEAPON,
        state.font.as_deref(),
    ))
    .map_err(|e| ApiError::InternalError(format!("Failed to encode image: {}", e)))?;

    let fire_smoke_image = encode_jpeg_base64(&annotate(
        &image,
        &fire_smoke_detections,
        COLOR_FIRE_SMOKE,
        state.font.as_deref(),
    ))
    .map_err(|e| ApiError::InternalError(format!("Failed to encode image: {}", e)))?;

    Ok(Json(DetectBothResponse {
        weapon_detections,
        fire_smoke_detections,
        weapon_image,
        fire_smoke_image,
        weapon_db_ids,
        fire_smoke_db_ids,
    }))
}

/// Forward each detection to the store, at most one attempt per record.
/// Failures are logged and skipped; they never abort the response.
async fn persist_detections(
    store: Option<&Arc<dyn DetectionStore>>,
    categories: &CategoryMap,
    camera_id: &str,
    model_name: ModelName,
    detections: &[Detection],
) -> Vec<i64> {
    let Some(store) = store else {
        return Vec::new();
    };

    let mut ids = Vec::new();
    for detection in detections {
        let record = NewDetection {
            camera_id: camera_id.to_string(),
            object_label: detection.class.clone(),
            category: categories.category_for(&detection.class),
            confidence: detection.confidence,
            bbox: detection.bbox,
            model_name: format!("yolov8-{}", model_name),
        };

        match store.insert_detection(&record).await {
            Ok(id) => {
                info!("✓ Saved {} detection (ID: {})", record.category, id);
                ids.push(id);
            }
            Err(e) => {
                error!("✗ Failed to save detection to database: {}", e);
            }
        }
    }

    ids
}

/// Encode an annotated image as base64 JPEG
fn encode_jpeg_base64(image: &DynamicImage) -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    image
        .to_rgb8()
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Jpeg)?;
    Ok(STANDARD.encode(&buffer))
}
