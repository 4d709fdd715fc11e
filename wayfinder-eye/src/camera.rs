//! USB webcam capture

use crate::error::VisionError;
use image::RgbImage;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use parking_lot::Mutex;
use tracing::{info, warn};
use wayfinder_core::Settings;

pub const CAPTURE_WIDTH: u32 = 640;
pub const CAPTURE_HEIGHT: u32 = 480;

/// Owns an OpenCV capture device and hands out RGB frames.
pub struct CameraManager {
    camera_id: u32,
    frame_rate: u32,
    capture: Mutex<Option<VideoCapture>>,
}

impl CameraManager {
    pub fn new(camera_id: u32, frame_rate: u32) -> Self {
        Self {
            camera_id,
            frame_rate: frame_rate.max(1),
            capture: Mutex::new(None),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.camera_id, settings.target_fps)
    }

    /// Open the device; a no-op when it is already open.
    pub fn initialize(&self) -> Result<(), VisionError> {
        let mut guard = self.capture.lock();
        if guard.is_some() {
            return Ok(());
        }

        let mut capture = VideoCapture::new(self.camera_id as i32, CAP_ANY).map_err(|e| {
            VisionError::Camera(format!("Failed to open camera {}: {}", self.camera_id, e))
        })?;
        if !capture.is_opened()? {
            return Err(VisionError::Camera(format!(
                "Camera {} failed to open",
                self.camera_id
            )));
        }

        // Drivers may ignore these; the frame size is read back per frame.
        for (prop, value) in [
            (CAP_PROP_FRAME_WIDTH, CAPTURE_WIDTH as f64),
            (CAP_PROP_FRAME_HEIGHT, CAPTURE_HEIGHT as f64),
            (CAP_PROP_FPS, self.frame_rate as f64),
        ] {
            if !capture.set(prop, value)? {
                warn!("Camera {} rejected property {} = {}", self.camera_id, prop, value);
            }
        }

        *guard = Some(capture);
        info!(
            "Camera {} initialized at {}x{} @ {}fps",
            self.camera_id, CAPTURE_WIDTH, CAPTURE_HEIGHT, self.frame_rate
        );
        Ok(())
    }

    /// Grab one frame, converting OpenCV's BGR to RGB.
    pub fn capture_frame(&self) -> Result<RgbImage, VisionError> {
        let mut guard = self.capture.lock();
        let capture = guard
            .as_mut()
            .ok_or_else(|| VisionError::Camera("Camera not initialized".to_string()))?;

        let mut bgr = Mat::default();
        if !capture.read(&mut bgr)? || bgr.empty() {
            return Err(VisionError::Camera("Failed to read frame".to_string()));
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
        let data = rgb.data_bytes()?.to_vec();
        RgbImage::from_raw(width, height, data).ok_or_else(|| {
            VisionError::Camera(format!("Frame buffer does not match {}x{}", width, height))
        })
    }

    /// Release the device.
    pub fn stop(&self) {
        if let Some(mut capture) = self.capture.lock().take() {
            if let Err(e) = capture.release() {
                warn!("Failed to release camera {}: {}", self.camera_id, e);
            }
            info!("Camera {} stopped", self.camera_id);
        }
    }

    pub fn is_running(&self) -> bool {
        self.capture.lock().is_some()
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        self.stop();
    }
}
