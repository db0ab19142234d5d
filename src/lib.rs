// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fabstir Vision Node
//!
//! HTTP object-detection service: image uploads go through YOLOv8 ONNX
//! models (weapon, fire/smoke), results come back as bounding boxes plus
//! an annotated image, and detections are optionally persisted to
//! PostgreSQL.

pub mod api;
pub mod config;
pub mod detect;
pub mod eventlog;
pub mod registry;
pub mod store;
pub mod version;

pub use api::{create_router, serve, AppState};
pub use config::NodeConfig;
pub use detect::{BoundingBox, Detection, YoloModel};
pub use registry::{ModelName, ModelRegistry};
pub use store::{DetectionStore, PostgresStore};
