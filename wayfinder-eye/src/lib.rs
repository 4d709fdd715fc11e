//! wayfinder-eye: vision pipeline for the navigation assistant
//!
//! Runs an object detector over camera or uploaded frames, estimates the
//! distance to every object with a monocular pinhole model, and turns the
//! result into a [`SceneReport`](wayfinder_core::SceneReport) with an
//! annotated copy of the frame.

#[cfg(feature = "camera")]
pub mod camera;
pub mod error;
pub mod models;
pub mod overlay;
pub mod pipeline;
pub mod processing;
mod utils;

pub use error::VisionError;
pub use models::{load_detector, ModelManager, YoloDetector, COCO_CLASSES};
pub use pipeline::{AnalyzerStats, FrameAnalysis, FrameAnalyzer};
pub use processing::{DistanceEstimator, ObjectDetector, RawDetection, UnavailableDetector};
pub use utils::{decode_image, encode_jpeg};

/// Whether this build can capture from a local webcam.
pub const CAMERA_SUPPORTED: bool = cfg!(feature = "camera");
