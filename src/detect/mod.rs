// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inference adapter: image decoding, YOLO detection, box rendering

pub mod annotate;
pub mod categories;
pub mod image_utils;
pub mod types;
pub mod yolo;

pub use annotate::{annotate, COLOR_DEFAULT, COLOR_FIRE_SMOKE, COLOR_WEAPON};
pub use categories::CategoryMap;
pub use image_utils::{decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use types::{BoundingBox, Detection};
pub use yolo::{YoloModel, YOLO_INPUT_SIZE};
