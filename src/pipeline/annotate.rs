//! Annotation stage: detector invocation, overlay drawing, border

use tracing::trace;

use super::draw;
use super::mode::RenderMode;
use crate::error::{AppError, Result};
use crate::landmark::LandmarkDetector;
use crate::video::convert::{bgr_to_rgb, copy_make_border};
use crate::video::{PackedImage, PixelFormat, VideoFrame};

/// Border width added on every side of an annotated frame
pub const BORDER_SIZE: u32 = 3;

/// Border colour (BGR green)
pub const BORDER_COLOR: [u8; 3] = [0, 255, 0];

/// Annotate one BGR24 frame.
///
/// The detector runs exactly once, on an RGB copy of the input. Overlays are
/// drawn on the input image (`Normal`) or on a black canvas of the same size
/// (`Isolated`), then a green border of [`BORDER_SIZE`] pixels is added, so
/// the result is `(w + 6) x (h + 6)` BGR24.
///
/// Every failure (malformed buffer, detector error) is reported as
/// [`AppError::DetectionFailure`].
pub fn annotate(
    frame: &VideoFrame,
    mode: RenderMode,
    detector: &mut dyn LandmarkDetector,
) -> Result<PackedImage> {
    if frame.format != PixelFormat::Bgr24 {
        return Err(AppError::DetectionFailure(format!(
            "unsupported input format {}",
            frame.format
        )));
    }
    if !frame.is_well_formed() {
        return Err(AppError::DetectionFailure(format!(
            "malformed frame: {} bytes for {}",
            frame.len(),
            frame.resolution
        )));
    }

    let image = PackedImage::from_vec(frame.data().to_vec(), frame.resolution, PixelFormat::Bgr24)
        .map_err(detection_failure)?;
    annotate_image(image, mode, detector)
}

/// Annotate an owned BGR24 image, see [`annotate`]
pub fn annotate_image(
    image: PackedImage,
    mode: RenderMode,
    detector: &mut dyn LandmarkDetector,
) -> Result<PackedImage> {
    let rgb = bgr_to_rgb(&image).map_err(detection_failure)?;
    let landmarks = detector.process(&rgb).map_err(detection_failure)?;

    let mut overlay = match mode {
        RenderMode::Normal => image,
        RenderMode::Isolated => PackedImage::zeroed(image.resolution(), PixelFormat::Bgr24),
    };

    for category in landmarks.categories() {
        if let Some(set) = landmarks.get(category) {
            trace!("Drawing {} {} landmarks", set.len(), category);
            draw::draw_landmarks(overlay.canvas_mut(), category, set);
        }
    }

    Ok(copy_make_border(&overlay, BORDER_SIZE, BORDER_COLOR))
}

fn detection_failure(err: AppError) -> AppError {
    match err {
        AppError::DetectionFailure(_) => err,
        other => AppError::DetectionFailure(other.to_string()),
    }
}
