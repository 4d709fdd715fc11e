//! Monocular distance estimation with a pinhole camera model

use wayfinder_core::{BoundingBox, Position, SafetyLevel, Settings};

/// Typical real-world heights in metres, keyed by detector class name.
pub const OBJECT_HEIGHTS: &[(&str, f32)] = &[
    ("person", 1.7),
    ("car", 1.5),
    ("chair", 0.9),
    ("bottle", 0.25),
    ("cup", 0.12),
    ("laptop", 0.02),
    ("cell phone", 0.15),
    ("door", 2.0),
    ("bicycle", 1.1),
    ("dog", 0.6),
    ("cat", 0.25),
    ("couch", 0.8),
    ("table", 0.75),
    ("bed", 0.6),
    ("tv", 0.5),
    ("potted plant", 0.5),
    ("backpack", 0.5),
    ("handbag", 0.3),
    ("suitcase", 0.7),
    ("book", 0.25),
    ("clock", 0.3),
    ("vase", 0.3),
    ("scissors", 0.2),
    ("teddy bear", 0.3),
    ("hair drier", 0.25),
    ("toothbrush", 0.2),
];

/// Height assumed for classes missing from [`OBJECT_HEIGHTS`].
pub const DEFAULT_OBJECT_HEIGHT_M: f32 = 1.0;

/// Estimates distance from the pixel height of a bounding box.
#[derive(Debug, Clone)]
pub struct DistanceEstimator {
    image_height: u32,
    focal_length_px: f32,
    person_height_m: f32,
}

impl DistanceEstimator {
    /// Focal length in pixels is derived as `focal_mm / sensor_mm * image_height`.
    pub fn new(image_height: u32, focal_length_mm: f32, sensor_height_mm: f32) -> Self {
        let focal_length_px = if sensor_height_mm > 0.0 {
            focal_length_mm / sensor_height_mm * image_height as f32
        } else {
            0.0
        };
        Self {
            image_height,
            focal_length_px,
            person_height_m: 1.7,
        }
    }

    pub fn from_settings(settings: &Settings, image_height: u32) -> Self {
        Self::new(image_height, settings.focal_length_mm, settings.sensor_height_mm)
            .with_person_height(settings.avg_person_height_m)
    }

    /// Use a calibrated focal length instead of the sensor approximation.
    pub fn with_focal_length_px(mut self, focal_length_px: f32) -> Self {
        self.focal_length_px = focal_length_px;
        self
    }

    pub fn with_person_height(mut self, height_m: f32) -> Self {
        self.person_height_m = height_m;
        self
    }

    pub fn image_height(&self) -> u32 {
        self.image_height
    }

    pub fn focal_length_px(&self) -> f32 {
        self.focal_length_px
    }

    /// Real-world height for a class, case-insensitive.
    pub fn object_height(&self, class_name: &str) -> f32 {
        let class_name = class_name.to_lowercase();
        if class_name == "person" {
            return self.person_height_m;
        }
        OBJECT_HEIGHTS
            .iter()
            .find(|(name, _)| *name == class_name)
            .map(|(_, h)| *h)
            .unwrap_or(DEFAULT_OBJECT_HEIGHT_M)
    }

    /// Distance in metres rounded to centimetres; `None` for a zero-height box.
    pub fn estimate_distance(&self, bbox: &BoundingBox, class_name: &str) -> Option<f32> {
        let pixel_height = bbox.height();
        if pixel_height <= 0.0 || !pixel_height.is_finite() {
            return None;
        }
        let distance = self.object_height(class_name) * self.focal_length_px / pixel_height;
        if !distance.is_finite() {
            return None;
        }
        Some((distance * 100.0).round() / 100.0)
    }

    /// Which horizontal third of the frame the box centre falls in.
    pub fn relative_position(bbox: &BoundingBox, image_width: u32) -> Position {
        let width = image_width as f32;
        let center = bbox.center_x();
        if center < width / 3.0 {
            Position::Left
        } else if center > 2.0 * width / 3.0 {
            Position::Right
        } else {
            Position::Center
        }
    }

    pub fn safety_level(distance_m: Option<f32>) -> SafetyLevel {
        SafetyLevel::from_distance(distance_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focal_length_from_sensor() {
        let estimator = DistanceEstimator::new(480, 4.0, 6.0);
        assert!((estimator.focal_length_px() - 320.0).abs() < 1e-3);
    }

    #[test]
    fn test_person_distance() {
        // 1.7 m * 320 px / 272 px = 2.0 m
        let estimator = DistanceEstimator::new(480, 4.0, 6.0);
        let bbox = BoundingBox::new(100.0, 100.0, 200.0, 372.0);
        assert_eq!(estimator.estimate_distance(&bbox, "person"), Some(2.0));
    }

    #[test]
    fn test_unknown_class_uses_default_height() {
        let estimator = DistanceEstimator::new(480, 4.0, 6.0);
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 160.0);
        assert_eq!(estimator.estimate_distance(&bbox, "giraffe"), Some(2.0));
    }

    #[test]
    fn test_class_lookup_is_case_insensitive() {
        let estimator = DistanceEstimator::new(480, 4.0, 6.0);
        assert_eq!(estimator.object_height("Cell Phone"), 0.15);
        assert_eq!(estimator.object_height("CUP"), 0.12);
    }

    #[test]
    fn test_zero_height_box_has_no_distance() {
        let estimator = DistanceEstimator::new(480, 4.0, 6.0);
        let bbox = BoundingBox::new(10.0, 50.0, 40.0, 50.0);
        assert_eq!(estimator.estimate_distance(&bbox, "cup"), None);
    }

    #[test]
    fn test_distance_rounded_to_centimetres() {
        let estimator = DistanceEstimator::new(480, 4.0, 6.0).with_focal_length_px(300.0);
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 70.0);
        // 0.25 * 300 / 70 = 1.0714...
        assert_eq!(estimator.estimate_distance(&bbox, "bottle"), Some(1.07));
    }

    #[test]
    fn test_person_height_override() {
        let estimator = DistanceEstimator::new(480, 4.0, 6.0).with_person_height(1.6);
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 320.0);
        assert_eq!(estimator.estimate_distance(&bbox, "person"), Some(1.6));
    }

    #[test]
    fn test_relative_position_thirds() {
        let left = BoundingBox::new(0.0, 0.0, 100.0, 10.0);
        let center = BoundingBox::new(250.0, 0.0, 390.0, 10.0);
        let right = BoundingBox::new(500.0, 0.0, 640.0, 10.0);
        assert_eq!(DistanceEstimator::relative_position(&left, 640), Position::Left);
        assert_eq!(DistanceEstimator::relative_position(&center, 640), Position::Center);
        assert_eq!(DistanceEstimator::relative_position(&right, 640), Position::Right);
    }
}
