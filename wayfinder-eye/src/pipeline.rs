//! Frame analysis: detection, distance estimation, overlay and scene report

use crate::error::Result;
use crate::overlay;
use crate::processing::{DistanceEstimator, ObjectDetector, RawDetection};
use image::RgbImage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use wayfinder_core::{Detection, SafetyLevel, SceneReport, Settings};

/// Result of analysing one frame.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    pub report: SceneReport,
    pub annotated: RgbImage,
    pub latency_ms: f64,
}

/// Running latency statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerStats {
    pub frames: u64,
    pub average_latency_ms: f64,
    pub last_latency_ms: f64,
    pub last_fps: f64,
}

#[derive(Debug, Default)]
struct StatsAccumulator {
    frames: u64,
    total_latency_ms: f64,
    last_latency_ms: f64,
}

/// Turns frames into scene reports with the configured detector.
pub struct FrameAnalyzer {
    detector: Arc<dyn ObjectDetector>,
    focal_length_mm: f32,
    sensor_height_mm: f32,
    person_height_m: f32,
    max_latency_ms: u64,
    stats: Mutex<StatsAccumulator>,
}

impl FrameAnalyzer {
    pub fn new(detector: Arc<dyn ObjectDetector>, settings: &Settings) -> Self {
        Self {
            detector,
            focal_length_mm: settings.focal_length_mm,
            sensor_height_mm: settings.sensor_height_mm,
            person_height_m: settings.avg_person_height_m,
            max_latency_ms: settings.max_detection_latency_ms,
            stats: Mutex::new(StatsAccumulator::default()),
        }
    }

    pub fn detector(&self) -> &Arc<dyn ObjectDetector> {
        &self.detector
    }

    pub fn is_model_loaded(&self) -> bool {
        self.detector.is_loaded()
    }

    /// Estimator calibrated for frames of the given height.
    pub fn estimator_for(&self, image_height: u32) -> DistanceEstimator {
        DistanceEstimator::new(image_height, self.focal_length_mm, self.sensor_height_mm)
            .with_person_height(self.person_height_m)
    }

    pub fn analyze(&self, frame: &RgbImage) -> Result<FrameAnalysis> {
        let start = Instant::now();

        let raw = self.detector.detect(frame)?;
        let estimator = self.estimator_for(frame.height());
        let detections: Vec<Detection> = raw
            .into_iter()
            .map(|r| self.to_detection(r, &estimator, frame.width()))
            .collect();

        let loaded = self.detector.is_loaded();
        let mut annotated = frame.clone();
        if loaded {
            overlay::draw_detections(&mut annotated, &detections);
        } else {
            overlay::draw_model_missing(&mut annotated);
        }

        let report = if detections.is_empty() {
            SceneReport::empty()
        } else {
            SceneReport::from_detections(detections)
        };

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.record(latency_ms);
        if loaded {
            overlay::draw_hud(&mut annotated, latency_ms, report.num_objects);
        }
        debug!(
            "Analyzed frame: {} objects, {} in {:.1}ms",
            report.num_objects,
            report.safety_status.label(),
            latency_ms
        );

        Ok(FrameAnalysis {
            report,
            annotated,
            latency_ms,
        })
    }

    fn to_detection(&self, raw: RawDetection, estimator: &DistanceEstimator, width: u32) -> Detection {
        let distance_m = estimator.estimate_distance(&raw.bbox, &raw.class_name);
        Detection {
            position: DistanceEstimator::relative_position(&raw.bbox, width),
            safety_level: SafetyLevel::from_distance(distance_m),
            class_name: raw.class_name,
            class_id: raw.class_id,
            confidence: (raw.confidence * 100.0).round() / 100.0,
            bbox: raw.bbox,
            distance_m,
        }
    }

    fn record(&self, latency_ms: f64) {
        if latency_ms > self.max_latency_ms as f64 {
            warn!(
                "Detection latency {:.1}ms exceeds limit of {}ms",
                latency_ms, self.max_latency_ms
            );
        }
        let mut stats = self.stats.lock();
        stats.frames += 1;
        stats.total_latency_ms += latency_ms;
        stats.last_latency_ms = latency_ms;
    }

    pub fn stats(&self) -> AnalyzerStats {
        let stats = self.stats.lock();
        if stats.frames == 0 {
            return AnalyzerStats::default();
        }
        AnalyzerStats {
            frames: stats.frames,
            average_latency_ms: stats.total_latency_ms / stats.frames as f64,
            last_latency_ms: stats.last_latency_ms,
            last_fps: if stats.last_latency_ms > 0.0 {
                1000.0 / stats.last_latency_ms
            } else {
                0.0
            },
        }
    }
}
