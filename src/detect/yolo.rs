// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 ONNX detector
//!
//! Wraps an ONNX Runtime session around an exported YOLOv8 model and turns
//! its raw output into pixel-space detections. Runs on CPU only.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array4, ArrayViewD, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info};

use super::types::{BoundingBox, Detection};

/// Input resolution the stock YOLOv8 exports expect
pub const YOLO_INPUT_SIZE: u32 = 640;

/// Letterbox padding fill value (gray), normalized
const PAD_VALUE: f32 = 114.0 / 255.0;

/// Raw candidate box in source-image coordinates, pre-NMS
#[derive(Debug, Clone, Copy)]
struct Candidate {
    class_id: usize,
    confidence: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

/// A loaded YOLOv8 detection model bound to a label table
pub struct YoloModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Class index -> label
    labels: Vec<String>,
    /// Detections below this confidence are dropped
    confidence_threshold: f32,
    /// Class-wise NMS overlap threshold
    iou_threshold: f32,
}

impl std::fmt::Debug for YoloModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloModel")
            .field("input_name", &self.input_name)
            .field("labels", &self.labels)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .finish_non_exhaustive()
    }
}

impl YoloModel {
    /// Load a YOLOv8 model from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(
        model_path: P,
        labels: Vec<String>,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        // CPU-only execution: detection shares the host with other workloads
        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!(
            "Detection model loaded - input: {}, {} classes",
            input_name,
            labels.len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            labels,
            confidence_threshold: confidence_threshold.clamp(0.0, 1.0),
            iou_threshold: iou_threshold.clamp(0.0, 1.0),
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Run detection on an image
    ///
    /// Returns detections above the confidence threshold with boxes clamped
    /// to the source image bounds, or an error if the session run fails.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let (input, scale, pad_x, pad_y) = self.preprocess(image);

        let input_value =
            Value::from_array(input).context("Failed to create input tensor")?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let candidates = decode_output(
            output_tensor.view(),
            self.confidence_threshold,
            scale,
            pad_x as f32,
            pad_y as f32,
        )?;

        let kept = nms(candidates, self.iou_threshold);

        let detections = kept
            .into_iter()
            .map(|c| to_detection(c, &self.labels, image.width(), image.height()))
            .collect::<Vec<_>>();

        debug!("Detected {} objects", detections.len());

        Ok(detections)
    }

    /// Letterbox-resize to the model input size and build an NCHW tensor
    fn preprocess(&self, image: &DynamicImage) -> (Array4<f32>, f32, u32, u32) {
        let size = YOLO_INPUT_SIZE;
        let (w, h) = (image.width(), image.height());
        let scale = (size as f32 / w as f32).min(size as f32 / h as f32);

        let nw = ((w as f32 * scale).round() as u32).clamp(1, size);
        let nh = ((h as f32 * scale).round() as u32).clamp(1, size);
        let pad_x = (size - nw) / 2;
        let pad_y = (size - nh) / 2;

        let resized = image.resize_exact(nw, nh, FilterType::Triangle).to_rgb8();

        let mut input = Array4::<f32>::from_elem(
            (1, 3, size as usize, size as usize),
            PAD_VALUE,
        );
        for (x, y, pixel) in resized.enumerate_pixels() {
            let ix = (x + pad_x) as usize;
            let iy = (y + pad_y) as usize;
            input[[0, 0, iy, ix]] = pixel[0] as f32 / 255.0;
            input[[0, 1, iy, ix]] = pixel[1] as f32 / 255.0;
            input[[0, 2, iy, ix]] = pixel[2] as f32 / 255.0;
        }

        (input, scale, pad_x, pad_y)
    }
}

/// Decode YOLOv8 output `[1, 4+nc, anchors]` into threshold-filtered
/// candidates in source-image coordinates.
fn decode_output(
    output: ArrayViewD<f32>,
    confidence_threshold: f32,
    scale: f32,
    pad_x: f32,
    pad_y: f32,
) -> Result<Vec<Candidate>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!("Unexpected output shape: {:?}, expected [1, 4+nc, N]", shape);
    }

    // Stock exports are [1, 4+nc, anchors]; some converters transpose
    let transposed = shape[1] > shape[2];
    let (attrs, anchors) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };

    if attrs < 5 {
        anyhow::bail!("Output has {} attributes per anchor, expected >= 5", attrs);
    }

    let at = |attr: usize, anchor: usize| -> f32 {
        if transposed {
            output[IxDyn(&[0, anchor, attr])]
        } else {
            output[IxDyn(&[0, attr, anchor])]
        }
    };

    let mut candidates = Vec::new();
    for n in 0..anchors {
        let mut best_class = 0usize;
        let mut best_score = 0.0f32;
        for c in 4..attrs {
            let score = at(c, n);
            if score > best_score {
                best_score = score;
                best_class = c - 4;
            }
        }

        if best_score < confidence_threshold {
            continue;
        }

        // xywh in letterbox space -> xyxy in source-image space
        let cx = at(0, n);
        let cy = at(1, n);
        let bw = at(2, n);
        let bh = at(3, n);

        candidates.push(Candidate {
            class_id: best_class,
            confidence: best_score,
            x1: (cx - bw / 2.0 - pad_x) / scale,
            y1: (cy - bh / 2.0 - pad_y) / scale,
            x2: (cx + bw / 2.0 - pad_x) / scale,
            y2: (cy + bh / 2.0 - pad_y) / scale,
        });
    }

    Ok(candidates)
}

/// Clamp a candidate to the image bounds and attach its label
fn to_detection(c: Candidate, labels: &[String], width: u32, height: u32) -> Detection {
    let max_x = (width.saturating_sub(1)) as f32;
    let max_y = (height.saturating_sub(1)) as f32;

    let x1 = c.x1.clamp(0.0, max_x);
    let y1 = c.y1.clamp(0.0, max_y);
    let x2 = c.x2.clamp(0.0, max_x).max(x1);
    let y2 = c.y2.clamp(0.0, max_y).max(y1);

    let class = labels
        .get(c.class_id)
        .cloned()
        .unwrap_or_else(|| format!("class_{}", c.class_id));

    Detection {
        class,
        confidence: c.confidence,
        bbox: BoundingBox {
            x1: x1.round() as u32,
            y1: y1.round() as u32,
            x2: x2.round() as u32,
            y2: y2.round() as u32,
        },
    }
}

/// Intersection over union of two candidates
fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let inter_x1 = a.x1.max(b.x1);
    let inter_y1 = a.y1.max(b.y1);
    let inter_x2 = a.x2.min(b.x2);
    let inter_y2 = a.y2.min(b.y2);

    let inter_area = (inter_x2 - inter_x1).max(0.0) * (inter_y2 - inter_y1).max(0.0);
    let area_a = (a.x2 - a.x1).max(0.0) * (a.y2 - a.y1).max(0.0);
    let area_b = (b.x2 - b.x1).max(0.0) * (b.y2 - b.y1).max(0.0);
    let union_area = area_a + area_b - inter_area;

    if union_area <= 0.0 {
        0.0
    } else {
        inter_area / union_area
    }
}

/// Class-wise non-maximum suppression, highest confidence first
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(k, &candidate) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}
