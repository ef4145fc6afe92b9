//! Raster drawing primitives and per-category overlay styles
//!
//! All colours are BGR triples, matching the pipeline's working format. The
//! canvas is an `image` buffer whose `Rgb` channels carry that BGR order.

use image::Rgb;

use crate::landmark::topology;
use crate::landmark::types::{Landmark, LandmarkCategory};
use crate::video::Canvas;

pub type Color = [u8; 3];

/// How a landmark or connection is painted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawingSpec {
    pub color: Color,
    pub thickness: u32,
    pub circle_radius: u32,
}

impl DrawingSpec {
    pub const fn new(color: Color, thickness: u32, circle_radius: u32) -> Self {
        Self {
            color,
            thickness,
            circle_radius,
        }
    }
}

const WHITE: Color = [224, 224, 224];
const POSE_LEFT: Color = [0, 138, 255];
const POSE_RIGHT: Color = [231, 217, 0];
const FACE_TESSELATION: Color = [192, 192, 192];

const HAND_PALM: Color = [48, 48, 255];
const HAND_THUMB: Color = [180, 229, 255];
const HAND_INDEX: Color = [128, 64, 128];
const HAND_MIDDLE: Color = [0, 204, 255];
const HAND_RING: Color = [48, 255, 48];
const HAND_PINKY: Color = [192, 101, 21];

const POSE_LEFT_INDICES: &[usize] = &[1, 2, 3, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 27, 29, 31];
const POSE_RIGHT_INDICES: &[usize] = &[4, 5, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24, 26, 28, 30, 32];

/// Style of the edges for a category
pub fn connection_style(category: LandmarkCategory) -> DrawingSpec {
    match category {
        LandmarkCategory::Pose => DrawingSpec::new(WHITE, 2, 0),
        LandmarkCategory::FaceMesh => DrawingSpec::new(FACE_TESSELATION, 1, 0),
        LandmarkCategory::LeftHand | LandmarkCategory::RightHand => DrawingSpec::new(WHITE, 2, 0),
    }
}

/// Style of the dot for landmark `index`, `None` when the category draws no dots
pub fn landmark_style(category: LandmarkCategory, index: usize) -> Option<DrawingSpec> {
    match category {
        LandmarkCategory::FaceMesh => None,
        LandmarkCategory::Pose => {
            let color = if POSE_LEFT_INDICES.contains(&index) {
                POSE_LEFT
            } else if POSE_RIGHT_INDICES.contains(&index) {
                POSE_RIGHT
            } else {
                WHITE
            };
            Some(DrawingSpec::new(color, 2, 2))
        }
        LandmarkCategory::LeftHand | LandmarkCategory::RightHand => {
            let color = match index {
                0 | 1 | 5 | 9 | 13 | 17 => HAND_PALM,
                2..=4 => HAND_THUMB,
                6..=8 => HAND_INDEX,
                10..=12 => HAND_MIDDLE,
                14..=16 => HAND_RING,
                _ => HAND_PINKY,
            };
            Some(DrawingSpec::new(color, 1, 4))
        }
    }
}

/// Set one pixel, ignoring coordinates outside the canvas
fn paint(canvas: &mut Canvas, x: i32, y: i32, color: Color) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        *canvas.get_pixel_mut(x as u32, y as u32) = Rgb(color);
    }
}

/// Filled disc centred on (cx, cy)
pub fn fill_circle(canvas: &mut Canvas, cx: i32, cy: i32, radius: u32, color: Color) {
    let r = radius as i32;
    let r2 = r * r;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r2 {
                paint(canvas, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Bresenham line, widened by stamping a disc when thickness > 1
pub fn draw_line(canvas: &mut Canvas, from: (i32, i32), to: (i32, i32), thickness: u32, color: Color) {
    let radius = thickness / 2;
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if radius == 0 {
            paint(canvas, x0, y0, color);
        } else {
            fill_circle(canvas, x0, y0, radius, color);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Draw one landmark set: edges first, then dots on top.
///
/// Points that are out of frame or below the confidence thresholds are not
/// drawn, and neither is any edge touching them. Edges referencing indices
/// the set does not contain are skipped. The face mesh is drawn as a
/// triangulated mesh over its drawable points with the feature contours
/// traced on top in the same style.
pub fn draw_landmarks(canvas: &mut Canvas, category: LandmarkCategory, landmarks: &[Landmark]) {
    let (w, h) = (canvas.width(), canvas.height());
    let points: Vec<Option<(i32, i32)>> = landmarks
        .iter()
        .map(|lm| if lm.is_drawable() { lm.to_pixel(w, h) } else { None })
        .collect();

    let edge = connection_style(category);
    let mesh = match category {
        LandmarkCategory::FaceMesh => topology::triangulate(&points),
        _ => Vec::new(),
    };
    for (a, b) in mesh.into_iter().chain(topology::connections(category)) {
        if let (Some(Some(p)), Some(Some(q))) = (points.get(a), points.get(b)) {
            draw_line(canvas, *p, *q, edge.thickness, edge.color);
        }
    }

    for (index, point) in points.iter().enumerate() {
        let (Some((x, y)), Some(spec)) = (point, landmark_style(category, index)) else {
            continue;
        };
        fill_circle(canvas, *x, *y, spec.circle_radius, spec.color);
    }
}
