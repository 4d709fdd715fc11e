//! Detection post-processing and distance estimation

pub mod detection;
pub mod distance;

pub use detection::{non_max_suppression, ObjectDetector, RawDetection, UnavailableDetector};
pub use distance::DistanceEstimator;
