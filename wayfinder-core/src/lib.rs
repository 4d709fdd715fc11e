//! wayfinder-core: settings and scene types shared by every Wayfinder crate.

pub mod config;
pub mod error;
pub mod scene;

pub use config::{FeatureStatus, Settings};
pub use error::{Error, Result};
pub use scene::{
    BoundingBox, Detection, Position, SafetyLevel, SafetyStatus, SceneReport, ALERT_DISTANCE_M,
    CAUTION_DISTANCE_M, DANGER_DISTANCE_M,
};
