//! Object detector abstraction

use crate::error::Result;
use image::RgbImage;
use wayfinder_core::BoundingBox;

/// Detector output before distance estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// A model that finds objects in a frame.
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<RawDetection>>;

    /// False when no model weights are loaded and `detect` returns nothing.
    fn is_loaded(&self) -> bool {
        true
    }

    /// Labels indexed by class id.
    fn class_names(&self) -> &'static [&'static str] {
        &[]
    }

    fn backend(&self) -> &'static str;
}

/// Stand-in used when the model could not be loaded.
#[derive(Debug, Default)]
pub struct UnavailableDetector {
    reason: String,
}

impl UnavailableDetector {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl ObjectDetector for UnavailableDetector {
    fn detect(&self, _frame: &RgbImage) -> Result<Vec<RawDetection>> {
        Ok(Vec::new())
    }

    fn is_loaded(&self) -> bool {
        false
    }

    fn backend(&self) -> &'static str {
        "unavailable"
    }
}

/// Greedy per-class non-maximum suppression, highest confidence first.
pub fn non_max_suppression(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    detections.retain(|d| d.confidence.is_finite());
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<RawDetection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let overlaps = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id && kept.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !overlaps {
            keep.push(candidate);
        }
    }
    keep
}
