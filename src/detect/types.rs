// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection result types shared by the inference adapter and the API

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in source-image pixel coordinates.
///
/// Invariant: `x1 <= x2` and `y1 <= y2`, all coordinates within the
/// source image bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

/// One labeled, confidence-scored box produced by a model for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label from the model's label table
    pub class: String,
    /// Confidence score, already filtered to >= the configured threshold
    pub confidence: f32,
    /// Box in source-image pixel coordinates
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}
