//! Annotated-frame overlays: distance-coloured boxes, labels and the HUD line

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::sync::OnceLock;
use tracing::warn;
use wayfinder_core::{Detection, ALERT_DISTANCE_M, CAUTION_DISTANCE_M, DANGER_DISTANCE_M};

pub const COLOR_UNKNOWN: Rgb<u8> = Rgb([128, 128, 128]);
pub const COLOR_DANGER: Rgb<u8> = Rgb([255, 0, 0]);
pub const COLOR_ALERT: Rgb<u8> = Rgb([255, 69, 0]);
pub const COLOR_CAUTION: Rgb<u8> = Rgb([255, 165, 0]);
pub const COLOR_CLEAR: Rgb<u8> = Rgb([0, 255, 0]);
pub const COLOR_LABEL_TEXT: Rgb<u8> = Rgb([255, 255, 255]);
pub const COLOR_HUD: Rgb<u8> = COLOR_CLEAR;

pub const MODEL_MISSING_BANNER: &str = "YOLO Model Not Loaded - Install dependencies";

const BOX_THICKNESS: u32 = 2;
const BORDER_THICKNESS: u32 = 6;
const LABEL_SCALE: f32 = 14.0;
const HUD_SCALE: f32 = 16.0;
const LABEL_PADDING: u32 = 2;
/// Top-left corner of the HUD line and the missing-model banner.
const HUD_ORIGIN: (i32, i32) = (10, 10);

static FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");
static FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();

fn font() -> Option<&'static FontRef<'static>> {
    FONT.get_or_init(|| match FontRef::try_from_slice(FONT_BYTES) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("Overlay font unusable, annotations will have no text: {}", e);
            None
        }
    })
    .as_ref()
}

/// Box colour for an object at the given distance.
pub fn distance_color(distance_m: Option<f32>) -> Rgb<u8> {
    match distance_m {
        None => COLOR_UNKNOWN,
        Some(d) if d < DANGER_DISTANCE_M => COLOR_DANGER,
        Some(d) if d < ALERT_DISTANCE_M => COLOR_ALERT,
        Some(d) if d < CAUTION_DISTANCE_M => COLOR_CAUTION,
        Some(_) => COLOR_CLEAR,
    }
}

/// `person 2.0m (center)`; unknown distances print as `?m`.
pub fn detection_label(detection: &Detection) -> String {
    let distance = detection
        .distance_m
        .map(|d| format!("{:.1}", d))
        .unwrap_or_else(|| "?".to_string());
    format!("{} {}m ({})", detection.class_name, distance, detection.position)
}

/// `Latency: 12.3ms | FPS: 81.3 | Objects: 2`
pub fn hud_text(latency_ms: f64, objects: usize) -> String {
    let fps = if latency_ms > 0.0 { 1000.0 / latency_ms } else { 0.0 };
    format!(
        "Latency: {:.1}ms | FPS: {:.1} | Objects: {}",
        latency_ms, fps, objects
    )
}

/// Outline every detection and put a filled, captioned tab above it.
pub fn draw_detections(frame: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
        let color = distance_color(detection.distance_m);
        let Some([x1, y1, x2, y2]) = clamp_box(frame, detection) else {
            continue;
        };
        draw_rect(frame, [x1, y1, x2, y2], color, BOX_THICKNESS);
        draw_label(frame, &detection_label(detection), x1, y1, color);
    }
}

/// Performance line in the top-left corner.
pub fn draw_hud(frame: &mut RgbImage, latency_ms: f64, objects: usize) {
    draw_plain_text(frame, &hud_text(latency_ms, objects), HUD_SCALE, COLOR_HUD);
}

/// Red border plus banner marking that no detector model is loaded.
pub fn draw_model_missing(frame: &mut RgbImage) {
    if frame.width() == 0 || frame.height() == 0 {
        return;
    }
    let (x2, y2) = (frame.width() - 1, frame.height() - 1);
    draw_rect(frame, [0, 0, x2, y2], COLOR_DANGER, BORDER_THICKNESS);
    draw_plain_text(frame, MODEL_MISSING_BANNER, HUD_SCALE, COLOR_DANGER);
}

fn draw_plain_text(frame: &mut RgbImage, text: &str, scale: f32, color: Rgb<u8>) {
    if let Some(font) = font() {
        let (x, y) = HUD_ORIGIN;
        draw_text_mut(frame, color, x, y, PxScale::from(scale), font, text);
    }
}

fn draw_label(frame: &mut RgbImage, label: &str, x1: u32, y1: u32, color: Rgb<u8>) {
    let Some(font) = font() else {
        return;
    };
    let scale = PxScale::from(LABEL_SCALE);
    let (text_w, text_h) = text_size(scale, font, label);
    let tab_w = text_w + 2 * LABEL_PADDING;
    let tab_h = text_h + 2 * LABEL_PADDING;

    // Above the box when there is room, otherwise just inside its top edge.
    let tab_y = if y1 >= tab_h { y1 - tab_h } else { y1 };
    draw_filled_rect_mut(
        frame,
        Rect::at(x1 as i32, tab_y as i32).of_size(tab_w.max(1), tab_h.max(1)),
        color,
    );
    draw_text_mut(
        frame,
        COLOR_LABEL_TEXT,
        (x1 + LABEL_PADDING) as i32,
        (tab_y + LABEL_PADDING) as i32,
        scale,
        font,
        label,
    );
}

/// Pixel box inside the frame, or `None` for an empty frame.
fn clamp_box(frame: &RgbImage, detection: &Detection) -> Option<[u32; 4]> {
    if frame.width() == 0 || frame.height() == 0 {
        return None;
    }
    let max_x = (frame.width() - 1) as f32;
    let max_y = (frame.height() - 1) as f32;
    let b = &detection.bbox;
    let clamp = |v: f32, max: f32| if v.is_finite() { v.clamp(0.0, max) as u32 } else { 0 };
    let (x1, x2) = (clamp(b.x1.min(b.x2), max_x), clamp(b.x1.max(b.x2), max_x));
    let (y1, y2) = (clamp(b.y1.min(b.y2), max_y), clamp(b.y1.max(b.y2), max_y));
    Some([x1, y1, x2, y2])
}

/// Border of `thickness` pixels growing inwards from the box edges.
fn draw_rect(frame: &mut RgbImage, bbox: [u32; 4], color: Rgb<u8>, thickness: u32) {
    let [x1, y1, x2, y2] = bbox;
    for t in 0..thickness {
        let (xx1, yy1) = (x1 + t, y1 + t);
        let (xx2, yy2) = (x2.saturating_sub(t), y2.saturating_sub(t));
        if xx1 > xx2 || yy1 > yy2 {
            break;
        }
        let rect = Rect::at(xx1 as i32, yy1 as i32).of_size(xx2 - xx1 + 1, yy2 - yy1 + 1);
        draw_hollow_rect_mut(frame, rect, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfinder_core::{BoundingBox, Position, SafetyLevel};

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn detection(bbox: BoundingBox, distance: Option<f32>) -> Detection {
        Detection {
            class_name: "chair".to_string(),
            class_id: 56,
            confidence: 0.8,
            bbox,
            distance_m: distance,
            position: Position::Center,
            safety_level: SafetyLevel::from_distance(distance),
        }
    }

    fn count_pixels(frame: &RgbImage, x: std::ops::Range<u32>, y: std::ops::Range<u32>, pred: impl Fn(&Rgb<u8>) -> bool) -> usize {
        y.flat_map(|yy| x.clone().map(move |xx| (xx, yy)))
            .filter(|&(xx, yy)| pred(frame.get_pixel(xx, yy)))
            .count()
    }

    #[test]
    fn test_distance_colors() {
        assert_eq!(distance_color(None), COLOR_UNKNOWN);
        assert_eq!(distance_color(Some(0.5)), COLOR_DANGER);
        assert_eq!(distance_color(Some(1.2)), COLOR_ALERT);
        assert_eq!(distance_color(Some(2.5)), COLOR_CAUTION);
        assert_eq!(distance_color(Some(8.0)), COLOR_CLEAR);
    }

    #[test]
    fn test_label_and_hud_text() {
        let det = detection(BoundingBox::new(0.0, 0.0, 10.0, 10.0), Some(2.04));
        assert_eq!(detection_label(&det), "chair 2.0m (center)");
        let unknown = detection(BoundingBox::new(0.0, 0.0, 10.0, 10.0), None);
        assert_eq!(detection_label(&unknown), "chair ?m (center)");
        assert_eq!(hud_text(20.0, 3), "Latency: 20.0ms | FPS: 50.0 | Objects: 3");
        assert_eq!(hud_text(0.0, 0), "Latency: 0.0ms | FPS: 0.0 | Objects: 0");
    }

    #[test]
    fn test_box_outline_drawn() {
        let mut frame = RgbImage::new(200, 200);
        let det = detection(BoundingBox::new(20.0, 80.0, 60.0, 120.0), Some(0.5));
        draw_detections(&mut frame, &[det]);
        assert_eq!(*frame.get_pixel(20, 100), COLOR_DANGER);
        assert_eq!(*frame.get_pixel(21, 100), COLOR_DANGER);
        assert_eq!(*frame.get_pixel(60, 100), COLOR_DANGER);
        assert_eq!(*frame.get_pixel(40, 120), COLOR_DANGER);
        // Interior untouched
        assert_eq!(*frame.get_pixel(40, 100), BLACK);
    }

    #[test]
    fn test_label_tab_carries_text() {
        let mut frame = RgbImage::new(300, 200);
        let det = detection(BoundingBox::new(20.0, 80.0, 60.0, 120.0), Some(0.5));
        draw_detections(&mut frame, &[det]);

        // The tab sits above the box and is wider than the box itself.
        let fill = count_pixels(&frame, 20..200, 55..80, |p| *p == COLOR_DANGER);
        assert!(fill > 100, "only {} fill pixels in label tab", fill);
        // Glyphs are blended towards white over the red fill.
        let glyphs = count_pixels(&frame, 20..200, 55..80, |p| p[1] > 100 && p[2] > 100);
        assert!(glyphs > 20, "only {} text pixels in label tab", glyphs);
        // Nothing is drawn right of the tab.
        assert_eq!(count_pixels(&frame, 250..300, 0..200, |p| *p != BLACK), 0);
    }

    #[test]
    fn test_label_moves_inside_box_at_top_edge() {
        let mut frame = RgbImage::new(300, 120);
        let det = detection(BoundingBox::new(10.0, 0.0, 100.0, 100.0), Some(4.0));
        draw_detections(&mut frame, &[det]);
        let glyphs = count_pixels(&frame, 10..250, 0..24, |p| p[0] > 100 && p[2] > 100);
        assert!(glyphs > 20);
    }

    #[test]
    fn test_hud_draws_in_top_left_corner() {
        let mut frame = RgbImage::new(480, 120);
        draw_hud(&mut frame, 25.0, 2);
        let hud = count_pixels(&frame, 0..480, 0..40, |p| p[1] > 0);
        assert!(hud > 50, "only {} HUD pixels", hud);
        assert!(count_pixels(&frame, 0..480, 0..40, |p| p[0] > 0 || p[2] > 0) == 0);
        assert_eq!(count_pixels(&frame, 0..480, 60..120, |p| *p != BLACK), 0);
    }

    #[test]
    fn test_out_of_frame_box_is_clamped() {
        let mut frame = RgbImage::new(50, 50);
        let det = detection(BoundingBox::new(-10.0, -10.0, 500.0, 500.0), None);
        draw_detections(&mut frame, &[det]);
        assert_eq!(*frame.get_pixel(49, 49), COLOR_UNKNOWN);
    }

    #[test]
    fn test_model_missing_border_and_banner() {
        let mut frame = RgbImage::new(480, 120);
        draw_model_missing(&mut frame);
        assert_eq!(*frame.get_pixel(0, 0), COLOR_DANGER);
        assert_eq!(*frame.get_pixel(479, 119), COLOR_DANGER);
        assert_eq!(*frame.get_pixel(240, 90), BLACK);
        let banner = count_pixels(&frame, 10..470, 10..34, |p| p[0] > 0 && p[1] == 0);
        assert!(banner > 50, "only {} banner pixels", banner);
    }

    #[test]
    fn test_empty_frame_is_left_alone() {
        let mut frame = RgbImage::new(0, 0);
        let det = detection(BoundingBox::new(0.0, 0.0, 5.0, 5.0), Some(1.0));
        draw_detections(&mut frame, &[det]);
        draw_model_missing(&mut frame);
    }
}
