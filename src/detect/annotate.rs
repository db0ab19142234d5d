// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bounding-box overlay rendering
//!
//! Draws detection rectangles and label tags onto a copy of the source
//! image. Rendering is best-effort by construction: degenerate boxes are
//! skipped and the input image is never mutated.

use ab_glyph::FontVec;
use image::{DynamicImage, Rgb};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use super::types::Detection;

/// Box color for single-model detection responses
pub const COLOR_DEFAULT: Rgb<u8> = Rgb([0, 255, 0]);
/// Box color for weapon-model results in dual-model responses
pub const COLOR_WEAPON: Rgb<u8> = Rgb([255, 0, 0]);
/// Box color for fire/smoke-model results in dual-model responses
pub const COLOR_FIRE_SMOKE: Rgb<u8> = Rgb([0, 0, 255]);

const LABEL_SCALE: f32 = 16.0;

/// Render detections onto a copy of the image.
///
/// Each detection gets a 2px hollow rectangle and, when a font is
/// available, a `label confidence` tag above the box. Returns a new image;
/// the input is untouched.
pub fn annotate(
    image: &DynamicImage,
    detections: &[Detection],
    color: Rgb<u8>,
    font: Option<&FontVec>,
) -> DynamicImage {
    let mut canvas = image.to_rgb8();

    for detection in detections {
        let bbox = &detection.bbox;
        let (w, h) = (bbox.width(), bbox.height());
        if w == 0 || h == 0 {
            continue;
        }

        let rect = Rect::at(bbox.x1 as i32, bbox.y1 as i32).of_size(w, h);
        draw_hollow_rect_mut(&mut canvas, rect, color);

        // Second rect for 2px stroke
        if w > 2 && h > 2 {
            let inner = Rect::at(bbox.x1 as i32 + 1, bbox.y1 as i32 + 1).of_size(w - 2, h - 2);
            draw_hollow_rect_mut(&mut canvas, inner, color);
        }

        if let Some(font) = font {
            let label = format!("{} {:.2}", detection.class, detection.confidence);
            let text_y = bbox.y1.saturating_sub(LABEL_SCALE as u32 + 2) as i32;
            draw_text_mut(
                &mut canvas,
                color,
                bbox.x1 as i32,
                text_y,
                LABEL_SCALE,
                font,
                &label,
            );
        }
    }

    DynamicImage::ImageRgb8(canvas)
}
