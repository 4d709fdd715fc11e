//! YOLOv8 object detection over ONNX Runtime

use crate::error::{Result, VisionError};
use crate::processing::{non_max_suppression, ObjectDetector, RawDetection};
use crate::utils::rgb_to_chw_tensor;
use image::RgbImage;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info};
use wayfinder_core::BoundingBox;

/// COCO class names (80 classes)
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Square input edge used by the exported YOLOv8 models.
pub const YOLO_INPUT_SIZE: u32 = 640;

/// YOLOv8 detector; one session shared behind a lock since `run` needs `&mut`.
pub struct YoloDetector {
    session: Mutex<Session>,
    input_size: (u32, u32),
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl YoloDetector {
    pub fn new(model_path: &Path, confidence_threshold: f32, iou_threshold: f32) -> Result<Self> {
        if !model_path.exists() {
            return Err(VisionError::Model(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| VisionError::Ort(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VisionError::Ort(format!("Failed to set optimization level: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Ort(format!("Failed to load YOLO model: {}", e)))?;

        info!("YOLO model loaded from {:?}", model_path);

        Ok(Self {
            session: Mutex::new(session),
            input_size: (YOLO_INPUT_SIZE, YOLO_INPUT_SIZE),
            confidence_threshold,
            iou_threshold,
        })
    }

    fn preprocess(&self, frame: &RgbImage) -> Result<Tensor<f32>> {
        let (w, h) = self.input_size;
        let data = rgb_to_chw_tensor(frame, w, h)?;
        Tensor::from_array(([1usize, 3, h as usize, w as usize], data))
            .map_err(|e| VisionError::Ort(format!("Failed to create input tensor: {}", e)))
    }
}

impl ObjectDetector for YoloDetector {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<RawDetection>> {
        debug!("Running YOLO detection on {}x{} frame", frame.width(), frame.height());
        let input = self.preprocess(frame)?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::Ort(format!("YOLO inference failed: {}", e)))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Ort(format!("Failed to extract output tensor: {}", e)))?;
        let dims: Vec<i64> = shape.iter().copied().collect();

        let candidates = decode_output(
            &dims,
            data,
            self.input_size,
            frame.dimensions(),
            self.confidence_threshold,
        )?;
        let detections = non_max_suppression(candidates, self.iou_threshold);
        debug!("YOLO detected {} objects", detections.len());
        Ok(detections)
    }

    fn class_names(&self) -> &'static [&'static str] {
        COCO_CLASSES
    }

    fn backend(&self) -> &'static str {
        "yolov8-onnx"
    }
}

/// Decode a YOLOv8 head into candidate boxes in source-image pixels.
///
/// Accepts `[1, 4 + C, N]` (the default export) or the transposed
/// `[1, N, 4 + C]`. Rows are `cx, cy, w, h` in model-input pixels followed by
/// one score per class.
pub fn decode_output(
    dims: &[i64],
    data: &[f32],
    input_size: (u32, u32),
    frame_size: (u32, u32),
    confidence_threshold: f32,
) -> Result<Vec<RawDetection>> {
    if dims.len() != 3 || dims[0] != 1 {
        return Err(VisionError::Processing(format!("Unexpected YOLO output shape {:?}", dims)));
    }
    let (a, b) = (dims[1] as usize, dims[2] as usize);
    if a.checked_mul(b) != Some(data.len()) {
        return Err(VisionError::Processing(format!(
            "YOLO output has {} values, shape {:?}",
            data.len(),
            dims
        )));
    }
    // No candidate anchors at all is a valid, empty result.
    if data.is_empty() {
        return Ok(Vec::new());
    }

    // The attribute axis is the short one: 84 vs 8400 for COCO.
    let channels_first = a <= b;
    let (num_attrs, num_anchors) = if channels_first { (a, b) } else { (b, a) };
    if num_attrs <= 4 {
        return Err(VisionError::Processing("YOLO output has no class scores".to_string()));
    }
    let value = |anchor: usize, attr: usize| -> f32 {
        if channels_first {
            data[attr * num_anchors + anchor]
        } else {
            data[anchor * num_attrs + attr]
        }
    };

    let (frame_w, frame_h) = (frame_size.0 as f32, frame_size.1 as f32);
    let scale_x = frame_w / input_size.0 as f32;
    let scale_y = frame_h / input_size.1 as f32;
    let num_classes = num_attrs - 4;

    let mut detections = Vec::new();
    for anchor in 0..num_anchors {
        let (class_id, score) = (0..num_classes)
            .map(|c| (c, value(anchor, 4 + c)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if !score.is_finite() || score < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (value(anchor, 0), value(anchor, 1), value(anchor, 2), value(anchor, 3));
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
            continue;
        }

        let bbox = BoundingBox::new(
            ((cx - w / 2.0) * scale_x).clamp(0.0, frame_w),
            ((cy - h / 2.0) * scale_y).clamp(0.0, frame_h),
            ((cx + w / 2.0) * scale_x).clamp(0.0, frame_w),
            ((cy + h / 2.0) * scale_y).clamp(0.0, frame_h),
        );
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            continue;
        }

        detections.push(RawDetection {
            class_id,
            class_name: COCO_CLASSES
                .get(class_id)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("class_{}", class_id)),
            confidence: score,
            bbox,
        });
    }
    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a channels-first head with `classes` scores per anchor.
    fn head(anchors: &[([f32; 4], usize, f32)], classes: usize) -> (Vec<i64>, Vec<f32>) {
        let attrs = 4 + classes;
        let n = anchors.len();
        let mut data = vec![0.0f32; attrs * n];
        for (i, (bbox, class, score)) in anchors.iter().enumerate() {
            for k in 0..4 {
                data[k * n + i] = bbox[k];
            }
            data[(4 + class) * n + i] = *score;
        }
        (vec![1, attrs as i64, n as i64], data)
    }

    #[test]
    fn test_decode_scales_to_frame() {
        let (dims, data) = head(&[([320.0, 320.0, 64.0, 128.0], 0, 0.9)], 80);
        let dets = decode_output(&dims, &data, (640, 640), (1280, 720), 0.5).unwrap();
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert_eq!(d.class_name, "person");
        assert!((d.bbox.x1 - 576.0).abs() < 1e-3);
        assert!((d.bbox.x2 - 704.0).abs() < 1e-3);
        assert!((d.bbox.y1 - 288.0).abs() < 1e-3);
        assert!((d.bbox.y2 - 432.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_filters_low_confidence() {
        let (dims, data) = head(
            &[([100.0, 100.0, 20.0, 20.0], 41, 0.3), ([200.0, 200.0, 20.0, 20.0], 56, 0.7)],
            80,
        );
        let dets = decode_output(&dims, &data, (640, 640), (640, 640), 0.5).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_name, "chair");
    }

    #[test]
    fn test_decode_transposed_layout() {
        // [1, N, 4 + C] with N = 100 anchors and 2 classes
        let n = 100;
        let attrs = 6;
        let mut data = vec![0.0f32; n * attrs];
        let row = 7;
        data[row * attrs..row * attrs + 6].copy_from_slice(&[50.0, 50.0, 10.0, 10.0, 0.1, 0.8]);
        let dets = decode_output(&[1, n as i64, attrs as i64], &data, (640, 640), (640, 640), 0.5).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
        assert_eq!(dets[0].class_name, "bicycle");
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        assert!(decode_output(&[84, 8400], &[], (640, 640), (640, 640), 0.5).is_err());
        assert!(decode_output(&[1, 84, 10], &[0.0; 5], (640, 640), (640, 640), 0.5).is_err());
    }

    #[test]
    fn test_decode_zero_candidates_is_empty() {
        let dets = decode_output(&[1, 84, 0], &[], (640, 640), (640, 480), 0.5).unwrap();
        assert!(dets.is_empty());
        let dets = decode_output(&[1, 0, 84], &[], (640, 640), (640, 480), 0.5).unwrap();
        assert!(dets.is_empty());
    }

    #[test]
    fn test_missing_model_file() {
        let result = YoloDetector::new(Path::new("/nonexistent/yolov8n.onnx"), 0.5, 0.45);
        assert!(matches!(result, Err(VisionError::Model(_))));
    }
}
