//! Detection and scene types passed between the vision pipeline and agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Objects closer than this (metres) are reported as critical alerts.
pub const ALERT_DISTANCE_M: f32 = 1.5;
/// Objects closer than this (metres) put the scene in danger.
pub const DANGER_DISTANCE_M: f32 = 1.0;
pub const CAUTION_DISTANCE_M: f32 = 3.0;

/// Axis-aligned box in image pixels, corner form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).abs()
    }

    pub fn center_x(&self) -> f32 {
        (self.x1 + self.x2) / 2.0
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union; 0.0 for degenerate or non-finite boxes.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        if ix2 <= ix1 || iy2 <= iy1 {
            return 0.0;
        }

        let inter = (ix2 - ix1) * (iy2 - iy1);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 || !union.is_finite() {
            return 0.0;
        }
        let iou = inter / union;
        if iou.is_finite() {
            iou.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Horizontal third of the frame an object sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Center,
    Right,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Left => "left",
            Position::Center => "center",
            Position::Right => "right",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-object proximity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Unknown,
    Critical,
    Warning,
    Caution,
    Safe,
}

impl SafetyLevel {
    pub fn from_distance(distance_m: Option<f32>) -> Self {
        match distance_m {
            None => SafetyLevel::Unknown,
            Some(d) if d < DANGER_DISTANCE_M => SafetyLevel::Critical,
            Some(d) if d < ALERT_DISTANCE_M => SafetyLevel::Warning,
            Some(d) if d < CAUTION_DISTANCE_M => SafetyLevel::Caution,
            Some(_) => SafetyLevel::Safe,
        }
    }
}

/// One detected object with its estimated distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class_name: String,
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
    /// `None` when the box has no height to measure.
    pub distance_m: Option<f32>,
    pub position: Position,
    pub safety_level: SafetyLevel,
}

impl Detection {
    pub fn is_alert(&self) -> bool {
        self.distance_m.map_or(false, |d| d < ALERT_DISTANCE_M)
    }
}

/// Overall scene verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SafetyStatus {
    #[serde(rename = "DANGER - Immediate obstacles detected")]
    Danger,
    #[serde(rename = "WARNING - Close obstacles detected")]
    Warning,
    #[serde(rename = "CAUTION - Objects present, path negotiable")]
    Caution,
    #[serde(rename = "CLEAR - No obstacles detected")]
    Clear,
}

impl SafetyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyStatus::Danger => "DANGER - Immediate obstacles detected",
            SafetyStatus::Warning => "WARNING - Close obstacles detected",
            SafetyStatus::Caution => "CAUTION - Objects present, path negotiable",
            SafetyStatus::Clear => "CLEAR - No obstacles detected",
        }
    }

    /// Short label: `DANGER`, `WARNING`, `CAUTION` or `CLEAR`.
    pub fn label(&self) -> &'static str {
        match self {
            SafetyStatus::Danger => "DANGER",
            SafetyStatus::Warning => "WARNING",
            SafetyStatus::Caution => "CAUTION",
            SafetyStatus::Clear => "CLEAR",
        }
    }

    /// Verdict for a scene given its alerts (closest first) and object count.
    pub fn assess(critical_alerts: &[Detection], num_objects: usize) -> Self {
        if !critical_alerts.is_empty() {
            let danger = critical_alerts
                .iter()
                .any(|d| d.distance_m.map_or(false, |m| m < DANGER_DISTANCE_M));
            if danger {
                SafetyStatus::Danger
            } else {
                SafetyStatus::Warning
            }
        } else if num_objects == 0 {
            SafetyStatus::Clear
        } else {
            SafetyStatus::Caution
        }
    }
}

impl fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured output of one analyzed frame, closest objects first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneReport {
    pub timestamp: DateTime<Utc>,
    pub num_objects: usize,
    pub objects: Vec<Detection>,
    pub critical_alerts: Vec<Detection>,
    pub safety_status: SafetyStatus,
}

impl SceneReport {
    pub fn from_detections(mut detections: Vec<Detection>) -> Self {
        // Stable sort keeps detector order among equal or unknown distances.
        detections.sort_by(|a, b| {
            let da = a.distance_m.unwrap_or(f32::INFINITY);
            let db = b.distance_m.unwrap_or(f32::INFINITY);
            da.total_cmp(&db)
        });

        let critical_alerts: Vec<Detection> =
            detections.iter().filter(|d| d.is_alert()).cloned().collect();
        let safety_status = SafetyStatus::assess(&critical_alerts, detections.len());

        Self {
            timestamp: Utc::now(),
            num_objects: detections.len(),
            objects: detections,
            critical_alerts,
            safety_status,
        }
    }

    pub fn empty() -> Self {
        Self::from_detections(Vec::new())
    }

    pub fn closest(&self) -> Option<&Detection> {
        self.objects.first()
    }

    /// Class names grouped by horizontal position.
    pub fn classes_at(&self, position: Position) -> Vec<&str> {
        self.objects
            .iter()
            .filter(|d| d.position == position)
            .map(|d| d.class_name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(class: &str, distance: Option<f32>, position: Position) -> Detection {
        Detection {
            class_name: class.to_string(),
            class_id: 0,
            confidence: 0.9,
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            distance_m: distance,
            position,
            safety_level: SafetyLevel::from_distance(distance),
        }
    }

    #[test]
    fn test_safety_level_bands() {
        assert_eq!(SafetyLevel::from_distance(None), SafetyLevel::Unknown);
        assert_eq!(SafetyLevel::from_distance(Some(0.4)), SafetyLevel::Critical);
        assert_eq!(SafetyLevel::from_distance(Some(1.0)), SafetyLevel::Warning);
        assert_eq!(SafetyLevel::from_distance(Some(1.49)), SafetyLevel::Warning);
        assert_eq!(SafetyLevel::from_distance(Some(1.5)), SafetyLevel::Caution);
        assert_eq!(SafetyLevel::from_distance(Some(3.0)), SafetyLevel::Safe);
    }

    #[test]
    fn test_report_sorts_closest_first_unknown_last() {
        let report = SceneReport::from_detections(vec![
            detection("unknown", None, Position::Left),
            detection("far", Some(5.0), Position::Right),
            detection("near", Some(2.0), Position::Center),
        ]);
        let order: Vec<&str> = report.objects.iter().map(|d| d.class_name.as_str()).collect();
        assert_eq!(order, vec!["near", "far", "unknown"]);
        assert_eq!(report.num_objects, 3);
        assert_eq!(report.safety_status, SafetyStatus::Caution);
    }

    #[test]
    fn test_report_danger_and_warning() {
        let danger = SceneReport::from_detections(vec![
            detection("chair", Some(1.2), Position::Left),
            detection("person", Some(0.8), Position::Center),
        ]);
        assert_eq!(danger.safety_status, SafetyStatus::Danger);
        assert_eq!(danger.critical_alerts.len(), 2);
        assert_eq!(danger.critical_alerts[0].class_name, "person");

        let warning = SceneReport::from_detections(vec![detection("chair", Some(1.2), Position::Left)]);
        assert_eq!(warning.safety_status, SafetyStatus::Warning);
    }

    #[test]
    fn test_empty_report_is_clear() {
        let report = SceneReport::empty();
        assert_eq!(report.safety_status, SafetyStatus::Clear);
        assert!(report.closest().is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let report =
            SceneReport::from_detections(vec![detection("cup", None, Position::Right)]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["objects"][0]["class"], "cup");
        assert_eq!(json["objects"][0]["position"], "right");
        assert!(json["objects"][0]["distance_m"].is_null());
        assert_eq!(json["safety_status"], "CAUTION - Objects present, path negotiable");
    }

    #[test]
    fn test_iou() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(a.iou(&c), 0.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_classes_at() {
        let report = SceneReport::from_detections(vec![
            detection("cup", Some(1.0), Position::Left),
            detection("dog", Some(2.0), Position::Left),
            detection("tv", Some(2.0), Position::Right),
        ]);
        assert_eq!(report.classes_at(Position::Left), vec!["cup", "dog"]);
        assert!(report.classes_at(Position::Center).is_empty());
    }
}
