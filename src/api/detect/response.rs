// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint response types

use serde::{Deserialize, Serialize};

use crate::detect::Detection;

/// Response for POST /detect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    /// Detections above the configured confidence threshold
    pub detections: Vec<Detection>,
    /// Base64-encoded JPEG with boxes drawn
    pub image: String,
    /// Name of the model that served the request
    pub model_used: String,
    /// How many detections were persisted
    pub saved_to_db: usize,
    /// Ids of the persisted records
    pub detection_ids: Vec<i64>,
}

/// Response for POST /detect/both
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectBothResponse {
    pub weapon_detections: Vec<Detection>,
    pub fire_smoke_detections: Vec<Detection>,
    /// Base64-encoded JPEG annotated with the weapon model's boxes
    pub weapon_image: String,
    /// Base64-encoded JPEG annotated with the fire/smoke model's boxes
    pub fire_smoke_image: String,
    pub weapon_db_ids: Vec<i64>,
    pub fire_smoke_db_ids: Vec<i64>,
}
