//! Detection models and weight management

pub mod manager;
pub mod yolo;

pub use manager::ModelManager;
pub use yolo::{YoloDetector, COCO_CLASSES};

use crate::processing::{ObjectDetector, UnavailableDetector};
use std::sync::Arc;
use tracing::warn;
use wayfinder_core::Settings;

/// Load the configured YOLO model, or a detector that reports nothing.
pub fn load_detector(settings: &Settings) -> Arc<dyn ObjectDetector> {
    match YoloDetector::new(
        &settings.yolo_model_path,
        settings.confidence_threshold,
        settings.iou_threshold,
    ) {
        Ok(detector) => Arc::new(detector),
        Err(e) => {
            warn!("Object detection disabled: {}", e);
            Arc::new(UnavailableDetector::new(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_falls_back() {
        let mut settings = Settings::default();
        settings.yolo_model_path = "/nonexistent/yolov8n.onnx".into();
        let detector = load_detector(&settings);
        assert!(!detector.is_loaded());
        assert_eq!(detector.backend(), "unavailable");
    }
}
