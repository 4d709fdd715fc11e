//! Rule-based answers used when no hosted model is available

use wayfinder_core::{Detection, Position, SceneReport};

const SAFETY_WORDS: &[&str] = &["safe", "clear", "walk", "move"];
const DESCRIBE_WORDS: &[&str] = &["describe", "what", "see", "scene"];
const LOCATE_WORDS: &[&str] = &["where", "find", "locate"];

/// Query words shorter than this never match a class name by substring.
const MIN_MATCH_WORD_LEN: usize = 3;

pub struct MockResponder;

impl MockResponder {
    /// Answer `query` from the scene alone. Keyword groups are checked in
    /// order: safety, description, location, then a brief summary.
    pub fn describe(report: &SceneReport, query: &str) -> String {
        let query_lower = query.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| query_lower.contains(w));

        if mentions(SAFETY_WORDS) {
            Self::safety_response(report)
        } else if mentions(DESCRIBE_WORDS) {
            Self::scene_description(report)
        } else if mentions(LOCATE_WORDS) {
            Self::location_response(report, &query_lower)
        } else {
            Self::brief_summary(report)
        }
    }

    pub fn safety_response(report: &SceneReport) -> String {
        if let Some(closest) = report.critical_alerts.first() {
            return format!(
                "Caution! There is a {} only {} away on your {}. Please move carefully.",
                closest.class_name,
                meters(closest.distance_m),
                closest.position
            );
        }
        match report.closest() {
            None => "The path ahead appears clear. No obstacles detected within range.".to_string(),
            Some(closest) => format!(
                "The path is generally clear. The nearest object is a {} {} away on your {}.",
                closest.class_name,
                about(closest.distance_m),
                closest.position
            ),
        }
    }

    pub fn scene_description(report: &SceneReport) -> String {
        if report.objects.is_empty() {
            return "I don't see any objects in the current view. The area appears open.".to_string();
        }

        let first_at = |position: Position| report.objects.iter().find(|d| d.position == position);
        let mut parts = Vec::new();
        if let Some(obj) = first_at(Position::Center) {
            parts.push(format!("Directly ahead, there's a {} {}", obj.class_name, at(obj.distance_m)));
        }
        if let Some(obj) = first_at(Position::Left) {
            parts.push(format!("on your left, a {} {}", obj.class_name, at(obj.distance_m)));
        }
        if let Some(obj) = first_at(Position::Right) {
            parts.push(format!("on your right, a {} {}", obj.class_name, at(obj.distance_m)));
        }

        let mut description = format!("I can see: {}.", parts.join(", "));
        if report.num_objects > 3 {
            description.push_str(&format!(
                " There are {} more objects in the scene.",
                report.num_objects - 3
            ));
        }
        description
    }

    pub fn location_response(report: &SceneReport, query: &str) -> String {
        if report.objects.is_empty() {
            return "I don't see any objects matching your query in the current view.".to_string();
        }

        let query = query.to_lowercase();
        let words: Vec<&str> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        if let Some(obj) = report.objects.iter().find(|d| mentions_class(&query, &words, d)) {
            return format!(
                "I found a {} {} on your {}.",
                obj.class_name,
                at(obj.distance_m),
                obj.position
            );
        }

        let closest = &report.objects[0];
        format!(
            "The nearest object is a {} {} on your {}.",
            closest.class_name,
            at(closest.distance_m),
            closest.position
        )
    }

    pub fn brief_summary(report: &SceneReport) -> String {
        match report.closest() {
            None => "No objects detected in the current view.".to_string(),
            Some(closest) => format!(
                "I detect {} object(s). Closest is a {} {}. Status: {}",
                report.num_objects,
                closest.class_name,
                at(closest.distance_m),
                report.safety_status
            ),
        }
    }
}

/// Class named in full (multi-word classes included) or containing a
/// query word of useful length.
fn mentions_class(query: &str, words: &[&str], detection: &Detection) -> bool {
    let class = detection.class_name.to_lowercase();
    query.contains(&class)
        || words
            .iter()
            .any(|w| w.len() >= MIN_MATCH_WORD_LEN && class.contains(w))
}

fn meters(distance_m: Option<f32>) -> String {
    match distance_m {
        Some(d) => format!("{:.1} meters", d),
        None => "an unknown distance".to_string(),
    }
}

fn at(distance_m: Option<f32>) -> String {
    match distance_m {
        Some(d) => format!("at {:.1} meters", d),
        None => "at an unknown distance".to_string(),
    }
}

fn about(distance_m: Option<f32>) -> String {
    match distance_m {
        Some(d) => format!("about {:.1} meters", d),
        None => "an unknown distance".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfinder_core::{BoundingBox, SafetyLevel};

    fn obj(class: &str, distance: Option<f32>, position: Position) -> Detection {
        Detection {
            class_name: class.to_string(),
            class_id: 0,
            confidence: 0.9,
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            distance_m: distance,
            position,
            safety_level: SafetyLevel::from_distance(distance),
        }
    }

    fn scene(objects: Vec<Detection>) -> SceneReport {
        SceneReport::from_detections(objects)
    }

    #[test]
    fn test_safety_with_alert() {
        let report = scene(vec![obj("chair", Some(0.8), Position::Left)]);
        assert_eq!(
            MockResponder::describe(&report, "Is it safe to walk?"),
            "Caution! There is a chair only 0.8 meters away on your left. Please move carefully."
        );
    }

    #[test]
    fn test_safety_clear_and_nearest() {
        assert_eq!(
            MockResponder::describe(&SceneReport::empty(), "can I move"),
            "The path ahead appears clear. No obstacles detected within range."
        );
        let report = scene(vec![obj("table", Some(2.5), Position::Right)]);
        assert_eq!(
            MockResponder::describe(&report, "is the path clear"),
            "The path is generally clear. The nearest object is a table about 2.5 meters away on your right."
        );
    }

    #[test]
    fn test_scene_description_groups_positions() {
        let report = scene(vec![
            obj("person", Some(2.0), Position::Center),
            obj("chair", Some(1.8), Position::Left),
            obj("tv", Some(4.0), Position::Right),
            obj("cup", Some(3.0), Position::Left),
            obj("book", Some(5.0), Position::Right),
        ]);
        assert_eq!(
            MockResponder::describe(&report, "Describe the room"),
            "I can see: Directly ahead, there's a person at 2.0 meters, \
             on your left, a chair at 1.8 meters, on your right, a tv at 4.0 meters. \
             There are 2 more objects in the scene."
        );
    }

    #[test]
    fn test_scene_description_empty() {
        assert_eq!(
            MockResponder::describe(&SceneReport::empty(), "what do you see"),
            "I don't see any objects in the current view. The area appears open."
        );
    }

    #[test]
    fn test_location_matches_class() {
        let report = scene(vec![
            obj("person", Some(1.9), Position::Center),
            obj("cell phone", Some(2.4), Position::Right),
        ]);
        assert_eq!(
            MockResponder::describe(&report, "Where is my phone?"),
            "I found a cell phone at 2.4 meters on your right."
        );
    }

    #[test]
    fn test_location_short_words_do_not_match() {
        let report = scene(vec![obj("chair", Some(2.0), Position::Left)]);
        // "a" and "is" are substrings of "chair" but too short to count
        assert_eq!(
            MockResponder::describe(&report, "where is a dog"),
            "The nearest object is a chair at 2.0 meters on your left."
        );
    }

    #[test]
    fn test_brief_summary() {
        let report = scene(vec![obj("bottle", None, Position::Center)]);
        assert_eq!(
            MockResponder::describe(&report, "hello"),
            "I detect 1 object(s). Closest is a bottle at an unknown distance. \
             Status: CAUTION - Objects present, path negotiable"
        );
        assert_eq!(
            MockResponder::describe(&SceneReport::empty(), "hello"),
            "No objects detected in the current view."
        );
    }}
