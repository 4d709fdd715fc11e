// Wayfinder server: load settings, build the pipeline and agent, serve.

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wayfinder_core::Settings;
use wayfinder_server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loaded = Settings::load(None);
    let log_level = loaded
        .as_ref()
        .map(|s| s.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_target(false)
        .init();

    let settings = loaded.unwrap_or_else(|e| {
        warn!("Failed to load settings: {}. Using mock-mode defaults.", e);
        Settings::fallback()
    });
    info!("Starting Wayfinder server");

    let bind = settings.bind_address.clone();
    #[allow(unused_mut)]
    let mut state = AppState::from_settings(settings);

    #[cfg(feature = "camera")]
    {
        use std::sync::Arc;
        use wayfinder_eye::camera::CameraManager;
        let camera = Arc::new(CameraManager::from_settings(&state.settings));
        state = state.with_camera(camera);
    }

    wayfinder_server::serve(state, &bind).await
}
