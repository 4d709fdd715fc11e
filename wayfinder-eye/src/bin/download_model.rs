//! Fetch the YOLOv8n ONNX weights into a model directory

use std::env;
use std::path::PathBuf;
use wayfinder_eye::error::VisionError;
use wayfinder_eye::models::ModelManager;

#[tokio::main]
async fn main() -> Result<(), VisionError> {
    let dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("models"));

    let manager = ModelManager::new(dir);
    println!("Downloading YOLOv8n model into {:?}...", manager.model_dir());
    let path = manager.get_yolo_model().await?;
    println!("YOLO model available at: {:?}", path);
    Ok(())
}
