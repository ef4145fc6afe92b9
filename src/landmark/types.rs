//! Landmark result types produced by detector backends

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum visibility / presence for a landmark to be drawn
pub const VISIBILITY_THRESHOLD: f32 = 0.5;
pub const PRESENCE_THRESHOLD: f32 = 0.5;

/// Single keypoint in normalized image coordinates
///
/// `x` and `y` are in `[0, 1]` relative to image width/height when the point
/// lies inside the image. `z` is relative depth and unused for drawing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Whether the detector is confident enough to render this point
    pub fn is_drawable(&self) -> bool {
        self.visibility.map_or(true, |v| v >= VISIBILITY_THRESHOLD)
            && self.presence.map_or(true, |p| p >= PRESENCE_THRESHOLD)
    }

    /// Map to pixel coordinates, `None` if outside the normalized range
    pub fn to_pixel(&self, width: u32, height: u32) -> Option<(i32, i32)> {
        if !(0.0..=1.0).contains(&self.x) || !(0.0..=1.0).contains(&self.y) {
            return None;
        }
        let px = (self.x * width as f32).floor().min(width.saturating_sub(1) as f32) as i32;
        let py = (self.y * height as f32).floor().min(height.saturating_sub(1) as f32) as i32;
        Some((px, py))
    }
}

/// Landmark set categories reported by a holistic detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkCategory {
    Pose,
    FaceMesh,
    LeftHand,
    RightHand,
}

impl LandmarkCategory {
    /// Drawing order
    pub const ALL: [LandmarkCategory; 4] = [
        LandmarkCategory::Pose,
        LandmarkCategory::FaceMesh,
        LandmarkCategory::LeftHand,
        LandmarkCategory::RightHand,
    ];
}

impl fmt::Display for LandmarkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LandmarkCategory::Pose => "pose",
            LandmarkCategory::FaceMesh => "face_mesh",
            LandmarkCategory::LeftHand => "left_hand",
            LandmarkCategory::RightHand => "right_hand",
        };
        write!(f, "{}", name)
    }
}

/// Result of one detector invocation; each category may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HolisticLandmarks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<Vec<Landmark>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<Vec<Landmark>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_hand: Option<Vec<Landmark>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_hand: Option<Vec<Landmark>>,
}

impl HolisticLandmarks {
    /// Landmark set for a category, if detected
    pub fn get(&self, category: LandmarkCategory) -> Option<&[Landmark]> {
        let set = match category {
            LandmarkCategory::Pose => &self.pose,
            LandmarkCategory::FaceMesh => &self.face,
            LandmarkCategory::LeftHand => &self.left_hand,
            LandmarkCategory::RightHand => &self.right_hand,
        };
        set.as_deref()
    }

    pub fn set(&mut self, category: LandmarkCategory, landmarks: Vec<Landmark>) {
        let slot = match category {
            LandmarkCategory::Pose => &mut self.pose,
            LandmarkCategory::FaceMesh => &mut self.face,
            LandmarkCategory::LeftHand => &mut self.left_hand,
            LandmarkCategory::RightHand => &mut self.right_hand,
        };
        *slot = Some(landmarks);
    }

    /// Categories present in this result
    pub fn categories(&self) -> impl Iterator<Item = LandmarkCategory> + '_ {
        LandmarkCategory::ALL
            .into_iter()
            .filter(|c| self.get(*c).is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.categories().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pixel() {
        assert_eq!(Landmark::new(0.5, 0.5).to_pixel(100, 50), Some((50, 25)));
        assert_eq!(Landmark::new(1.0, 1.0).to_pixel(100, 50), Some((99, 49)));
        assert_eq!(Landmark::new(0.0, 0.0).to_pixel(100, 50), Some((0, 0)));
        assert_eq!(Landmark::new(-0.1, 0.5).to_pixel(100, 50), None);
        assert_eq!(Landmark::new(0.5, 1.2).to_pixel(100, 50), None);
    }

    #[test]
    fn test_is_drawable() {
        assert!(Landmark::new(0.1, 0.1).is_drawable());
        assert!(Landmark::new(0.1, 0.1).with_visibility(0.9).is_drawable());
        assert!(!Landmark::new(0.1, 0.1).with_visibility(0.2).is_drawable());
    }

    #[test]
    fn test_holistic_categories() {
        let mut result = HolisticLandmarks::default();
        assert!(result.is_empty());

        result.set(LandmarkCategory::RightHand, vec![Landmark::new(0.2, 0.2)]);
        let cats: Vec<_> = result.categories().collect();
        assert_eq!(cats, vec![LandmarkCategory::RightHand]);
        assert!(result.get(LandmarkCategory::Pose).is_none());
        assert_eq!(result.get(LandmarkCategory::RightHand).map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_landmarks_deserialize() {
        let json = r#"{"pose":[{"x":0.1,"y":0.2,"visibility":0.9}]}"#;
        let result: HolisticLandmarks = serde_json::from_str(json).unwrap();
        let pose = result.get(LandmarkCategory::Pose).unwrap();
        assert_eq!(pose[0].visibility, Some(0.9));
        assert!(result.face.is_none());
    }
}
