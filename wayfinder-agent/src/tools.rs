//! Navigation tools the agents call: perception validation, haptics and
//! a few placeholders for localization, routing and object memory.

use crate::error::{AgentError, Result};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use wayfinder_core::{
    BoundingBox, Detection, Position, SafetyLevel, SafetyStatus, SceneReport, ALERT_DISTANCE_M,
};

/// Haptics stay off at or beyond this distance.
pub const HAPTIC_RANGE_M: f32 = ALERT_DISTANCE_M;
pub const HAPTIC_DURATION_MS: u32 = 500;

/// One object as sent by a client; only `class` is mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadObject {
    #[serde(rename = "class")]
    pub class_name: String,
    #[serde(default)]
    pub class_id: usize,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    /// Negative values mean unknown.
    #[serde(default)]
    pub distance_m: Option<f32>,
    #[serde(default = "default_position")]
    pub position: Position,
}

fn default_position() -> Position {
    Position::Center
}

impl PayloadObject {
    fn into_detection(self) -> Detection {
        let distance_m = self.distance_m.filter(|d| d.is_finite() && *d >= 0.0);
        Detection {
            class_name: self.class_name,
            class_id: self.class_id,
            confidence: self.confidence,
            bbox: self.bbox.unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0)),
            distance_m,
            position: self.position,
            safety_level: SafetyLevel::from_distance(distance_m),
        }
    }
}

impl From<&Detection> for PayloadObject {
    fn from(d: &Detection) -> Self {
        Self {
            class_name: d.class_name.clone(),
            class_id: d.class_id,
            confidence: d.confidence,
            bbox: Some(d.bbox),
            distance_m: d.distance_m,
            position: d.position,
        }
    }
}

/// Loosely-typed computer-vision payload, as received over the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvPayload {
    /// Unix seconds or an RFC 3339 string.
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub num_objects: Option<usize>,
    #[serde(default)]
    pub objects: Option<Vec<PayloadObject>>,
    #[serde(default)]
    pub critical_alerts: Option<Vec<PayloadObject>>,
    #[serde(default)]
    pub safety_status: Option<String>,
}

impl From<&SceneReport> for CvPayload {
    fn from(report: &SceneReport) -> Self {
        Self {
            timestamp: Some(Value::String(report.timestamp.to_rfc3339())),
            num_objects: Some(report.num_objects),
            objects: Some(report.objects.iter().map(PayloadObject::from).collect()),
            critical_alerts: Some(report.critical_alerts.iter().map(PayloadObject::from).collect()),
            safety_status: Some(report.safety_status.as_str().to_string()),
        }
    }
}

/// Vibration pattern for an obstacle, or `{"enabled": false}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HapticFeedback {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<HapticPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_hz: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HapticPattern {
    RapidPulse,
    FastPulse,
    MediumPulse,
}

impl HapticFeedback {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            pattern: None,
            intensity: None,
            frequency_hz: None,
            direction: None,
            duration_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub coordinates: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizationReport {
    pub mode: String,
    pub location: LocationInfo,
    pub orientation: String,
    pub confidence: f32,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub status: String,
    pub message: String,
    pub start: String,
    pub destination: String,
    pub maps_configured: bool,
    pub estimated_distance_m: Option<f64>,
    pub estimated_duration_s: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMemoryReport {
    pub stored_objects: usize,
    pub distinct_classes: usize,
    pub storage_type: String,
}

/// Tools shared by the local and Bedrock agents.
#[derive(Debug, Default)]
pub struct NavigationTools {
    maps_configured: bool,
    memory: Mutex<HashMap<String, usize>>,
}

impl NavigationTools {
    pub fn new(maps_api_key: Option<&str>) -> Self {
        Self {
            maps_configured: maps_api_key.map_or(false, |k| !k.is_empty()),
            memory: Mutex::new(HashMap::new()),
        }
    }

    /// Validate a payload and complete it into a [`SceneReport`].
    ///
    /// `timestamp`, `num_objects` and `objects` must be present and the
    /// count must match. Missing alerts and status are derived; a
    /// supplied status string is kept as long as it parses.
    pub fn perceive(&self, payload: &CvPayload) -> Result<SceneReport> {
        let timestamp = payload
            .timestamp
            .as_ref()
            .ok_or_else(|| missing("timestamp"))
            .and_then(parse_timestamp)?;
        let num_objects = payload.num_objects.ok_or_else(|| missing("num_objects"))?;
        let objects = payload.objects.as_ref().ok_or_else(|| missing("objects"))?;
        if objects.len() != num_objects {
            return Err(AgentError::Perception(format!(
                "num_objects is {} but {} objects were given",
                num_objects,
                objects.len()
            )));
        }

        let mut report =
            SceneReport::from_detections(objects.iter().cloned().map(PayloadObject::into_detection).collect());
        report.timestamp = timestamp;

        if let Some(alerts) = &payload.critical_alerts {
            report.critical_alerts = alerts.iter().cloned().map(PayloadObject::into_detection).collect();
            report.safety_status = SafetyStatus::assess(&report.critical_alerts, report.num_objects);
        }
        if let Some(status) = &payload.safety_status {
            report.safety_status = parse_safety_status(status)?;
        }
        Ok(report)
    }

    /// Pulse pattern for an obstacle at `distance_m` in `direction`.
    pub fn haptic_feedback(distance_m: Option<f32>, direction: Position) -> HapticFeedback {
        let (pattern, intensity, frequency_hz) = match distance_m {
            Some(d) if d < 0.0 || !d.is_finite() => return HapticFeedback::disabled(),
            Some(d) if d < 0.5 => (HapticPattern::RapidPulse, 1.0, 30),
            Some(d) if d < 1.0 => (HapticPattern::FastPulse, 0.8, 20),
            Some(d) if d < HAPTIC_RANGE_M => (HapticPattern::MediumPulse, 0.5, 10),
            _ => return HapticFeedback::disabled(),
        };
        HapticFeedback {
            enabled: true,
            pattern: Some(pattern),
            intensity: Some(intensity),
            frequency_hz: Some(frequency_hz),
            direction: Some(direction),
            duration_ms: Some(HAPTIC_DURATION_MS),
        }
    }

    /// Haptics for the closest critical alert, if any.
    pub fn haptic_for_report(report: &SceneReport) -> HapticFeedback {
        report
            .critical_alerts
            .first()
            .map(|closest| Self::haptic_feedback(closest.distance_m, closest.position))
            .unwrap_or_else(HapticFeedback::disabled)
    }

    /// Simulated indoor position; no VIO/GPS source is wired in.
    pub fn localization(&self) -> LocalizationReport {
        LocalizationReport {
            mode: "simulated".to_string(),
            location: LocationInfo {
                kind: "indoor".to_string(),
                description: "Demo environment".to_string(),
                coordinates: None,
            },
            orientation: "north".to_string(),
            confidence: 0.95,
            note: "Localization requires VIO/GPS integration".to_string(),
        }
    }

    pub fn plan_route(&self, start: &str, destination: &str) -> RoutePlan {
        RoutePlan {
            status: "not_implemented".to_string(),
            message: "Route planning requires Google Maps API integration".to_string(),
            start: start.to_string(),
            destination: destination.to_string(),
            maps_configured: self.maps_configured,
            estimated_distance_m: None,
            estimated_duration_s: None,
        }
    }

    /// Remember class counts for the objects seen.
    pub fn object_memory(&self, objects: &[Detection]) -> ObjectMemoryReport {
        let mut memory = self.memory.lock();
        for object in objects {
            *memory.entry(object.class_name.clone()).or_insert(0) += 1;
        }
        ObjectMemoryReport {
            stored_objects: objects.len(),
            distinct_classes: memory.len(),
            storage_type: "in_memory".to_string(),
        }
    }
}

fn missing(key: &str) -> AgentError {
    AgentError::Perception(format!("Missing required key: {}", key))
}

fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>> {
    let parsed = match value {
        Value::Number(n) => n.as_f64().and_then(|secs| {
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9) as u32;
            Utc.timestamp_opt(whole as i64, nanos).single()
        }),
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc)),
        _ => None,
    };
    parsed.ok_or_else(|| AgentError::Perception(format!("Invalid timestamp: {}", value)))
}

/// Accepts the full status text or just its label, any case.
pub fn parse_safety_status(text: &str) -> Result<SafetyStatus> {
    let label = text.split_whitespace().next().unwrap_or("").to_ascii_uppercase();
    match label.as_str() {
        "DANGER" => Ok(SafetyStatus::Danger),
        "WARNING" => Ok(SafetyStatus::Warning),
        "CAUTION" => Ok(SafetyStatus::Caution),
        "CLEAR" => Ok(SafetyStatus::Clear),
        _ => Err(AgentError::Perception(format!("Unknown safety status: {}", text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> CvPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_perceive_fills_status_and_alerts() {
        let tools = NavigationTools::default();
        let report = tools
            .perceive(&payload(json!({
                "timestamp": 1700000000.5,
                "num_objects": 2,
                "objects": [
                    {"class": "table", "distance_m": 2.5, "position": "left"},
                    {"class": "person", "distance_m": 0.7, "position": "center"}
                ]
            })))
            .unwrap();
        assert_eq!(report.objects[0].class_name, "person");
        assert_eq!(report.critical_alerts.len(), 1);
        assert_eq!(report.safety_status, SafetyStatus::Danger);
        assert_eq!(report.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_perceive_missing_keys() {
        let tools = NavigationTools::default();
        for (value, key) in [
            (json!({"num_objects": 0, "objects": []}), "timestamp"),
            (json!({"timestamp": 1.0, "objects": []}), "num_objects"),
            (json!({"timestamp": 1.0, "num_objects": 0}), "objects"),
        ] {
            let err = tools.perceive(&payload(value)).unwrap_err();
            assert!(err.to_string().contains(key), "{}", err);
        }
    }

    #[test]
    fn test_perceive_count_mismatch() {
        let tools = NavigationTools::default();
        let result = tools.perceive(&payload(json!({
            "timestamp": 1.0, "num_objects": 3, "objects": [{"class": "cup"}]
        })));
        assert!(matches!(result, Err(AgentError::Perception(_))));
    }

    #[test]
    fn test_perceive_keeps_supplied_status() {
        let tools = NavigationTools::default();
        let report = tools
            .perceive(&payload(json!({
                "timestamp": "2024-05-01T10:00:00Z",
                "num_objects": 0,
                "objects": [],
                "safety_status": "WARNING - Close obstacles detected"
            })))
            .unwrap();
        assert_eq!(report.safety_status, SafetyStatus::Warning);
    }

    #[test]
    fn test_negative_distance_is_unknown() {
        let tools = NavigationTools::default();
        let report = tools
            .perceive(&payload(json!({
                "timestamp": 1.0, "num_objects": 1,
                "objects": [{"class": "dog", "distance_m": -1.0, "position": "right"}]
            })))
            .unwrap();
        assert_eq!(report.objects[0].distance_m, None);
        assert_eq!(report.objects[0].safety_level, SafetyLevel::Unknown);
        assert_eq!(report.safety_status, SafetyStatus::Caution);
    }

    #[test]
    fn test_report_payload_round_trip() {
        let tools = NavigationTools::default();
        let original = tools
            .perceive(&payload(json!({
                "timestamp": 5.0, "num_objects": 1,
                "objects": [{"class": "chair", "distance_m": 1.2, "position": "left"}]
            })))
            .unwrap();
        let again = tools.perceive(&CvPayload::from(&original)).unwrap();
        assert_eq!(again.objects, original.objects);
        assert_eq!(again.safety_status, SafetyStatus::Warning);
    }

    #[test]
    fn test_haptic_bands() {
        let rapid = NavigationTools::haptic_feedback(Some(0.3), Position::Left);
        assert_eq!(rapid.pattern, Some(HapticPattern::RapidPulse));
        assert_eq!(rapid.intensity, Some(1.0));
        assert_eq!(rapid.frequency_hz, Some(30));
        assert_eq!(rapid.duration_ms, Some(500));

        let fast = NavigationTools::haptic_feedback(Some(0.5), Position::Center);
        assert_eq!(fast.pattern, Some(HapticPattern::FastPulse));
        assert_eq!(fast.frequency_hz, Some(20));

        let medium = NavigationTools::haptic_feedback(Some(1.4), Position::Right);
        assert_eq!(medium.pattern, Some(HapticPattern::MediumPulse));
        assert_eq!(medium.direction, Some(Position::Right));

        assert!(!NavigationTools::haptic_feedback(Some(1.5), Position::Left).enabled);
        assert!(!NavigationTools::haptic_feedback(None, Position::Left).enabled);
        assert!(!NavigationTools::haptic_feedback(Some(-1.0), Position::Left).enabled);
    }

    #[test]
    fn test_disabled_haptic_serializes_compactly() {
        let json = serde_json::to_value(HapticFeedback::disabled()).unwrap();
        assert_eq!(json, json!({"enabled": false}));
        let on = serde_json::to_value(NavigationTools::haptic_feedback(Some(0.2), Position::Left)).unwrap();
        assert_eq!(on["pattern"], "rapid_pulse");
    }

    #[test]
    fn test_placeholders() {
        let tools = NavigationTools::new(Some("maps-key"));
        assert_eq!(tools.localization().mode, "simulated");
        let route = tools.plan_route("lobby", "exit");
        assert_eq!(route.status, "not_implemented");
        assert!(route.maps_configured);
        assert!(!NavigationTools::new(None).plan_route("a", "b").maps_configured);
    }

    #[test]
    fn test_object_memory_counts_classes() {
        let tools = NavigationTools::default();
        let report = SceneReport::from_detections(vec![
            PayloadObject { class_name: "cup".into(), class_id: 0, confidence: 0.9, bbox: None, distance_m: Some(1.0), position: Position::Left }.into_detection(),
            PayloadObject { class_name: "cup".into(), class_id: 0, confidence: 0.9, bbox: None, distance_m: Some(2.0), position: Position::Right }.into_detection(),
        ]);
        let stats = tools.object_memory(&report.objects);
        assert_eq!(stats.stored_objects, 2);
        assert_eq!(stats.distinct_classes, 1);
        assert_eq!(stats.storage_type, "in_memory");
    }

    #[test]
    fn test_parse_safety_status() {
        assert_eq!(parse_safety_status("clear").unwrap(), SafetyStatus::Clear);
        assert_eq!(
            parse_safety_status("DANGER - Immediate obstacles detected").unwrap(),
            SafetyStatus::Danger
        );
        assert!(parse_safety_status("UNKNOWN").is_err());
    }
}
