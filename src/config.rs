// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration, assembled once from the environment in `main`

use std::env;
use std::path::PathBuf;

use crate::registry::RegistryConfig;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// HTTP listen address
    pub listen_addr: String,
    /// Path to the weapon detection model (ONNX)
    pub weapon_model_path: PathBuf,
    /// Path to the fire/smoke detection model (ONNX)
    pub fire_smoke_model_path: PathBuf,
    /// Detections below this confidence are dropped
    pub confidence_threshold: f32,
    /// NMS overlap threshold
    pub iou_threshold: f32,
    /// PostgreSQL connection string; None runs without persistence
    pub database_url: Option<String>,
    /// Optional label -> category override file (TOML)
    pub category_map_path: Option<PathBuf>,
    /// Optional JSONL detection journal path
    pub event_log_path: Option<PathBuf>,
    /// Optional TTF/OTF font for box label text
    pub label_font_path: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            weapon_model_path: PathBuf::from("models/weapon.onnx"),
            fire_smoke_model_path: PathBuf::from("models/fire_smoke.onnx"),
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
            database_url: None,
            category_map_path: None,
            event_log_path: None,
            label_font_path: None,
        }
    }
}

impl NodeConfig {
    /// Read configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: env::var("API_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            weapon_model_path: env::var("MODEL_WEAPON_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.weapon_model_path),
            fire_smoke_model_path: env::var("MODEL_FIRE_SMOKE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.fire_smoke_model_path),
            confidence_threshold: env::var("CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(defaults.confidence_threshold),
            iou_threshold: env::var("IOU_THRESHOLD")
                .ok()
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(defaults.iou_threshold),
            database_url: env::var("DATABASE_URL").ok(),
            category_map_path: env::var("CATEGORY_MAP_PATH").ok().map(PathBuf::from),
            event_log_path: env::var("DETECTION_LOG_PATH").ok().map(PathBuf::from),
            label_font_path: env::var("LABEL_FONT_PATH").ok().map(PathBuf::from),
        }
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            weapon_model_path: self.weapon_model_path.clone(),
            fire_smoke_model_path: self.fire_smoke_model_path.clone(),
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
        }
    }
}
