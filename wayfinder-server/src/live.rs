//! Continuous webcam analysis for `serve --live`

#[cfg(feature = "camera")]
use crate::state::AppState;
#[cfg(feature = "camera")]
use std::time::Duration;
#[cfg(feature = "camera")]
use tokio::task::JoinHandle;
#[cfg(feature = "camera")]
use tokio::time::MissedTickBehavior;
#[cfg(feature = "camera")]
use tracing::{debug, error, info, warn};

/// Frames between progress log lines.
#[cfg(feature = "camera")]
const LOG_EVERY: u64 = 30;

/// Consecutive failed frames; only the first failure and the recovery get logged.
#[derive(Debug, Default)]
#[cfg_attr(not(feature = "camera"), allow(dead_code))]
pub(crate) struct FailureStreak {
    count: u64,
}

#[cfg_attr(not(feature = "camera"), allow(dead_code))]
impl FailureStreak {
    /// Count a failure; true when it starts a new streak.
    pub(crate) fn fail(&mut self) -> bool {
        self.count += 1;
        self.count == 1
    }

    /// End the streak, returning its length if there was one.
    pub(crate) fn recover(&mut self) -> Option<u64> {
        (self.count > 0).then(|| std::mem::take(&mut self.count))
    }
}

/// Capture at `target_fps`, analyze and publish until the camera fails to open.
#[cfg(feature = "camera")]
pub fn spawn_live_capture(state: AppState) -> Option<JoinHandle<()>> {
    let camera = state.camera().cloned()?;
    let fps = state.settings.target_fps.max(1);

    Some(tokio::spawn(async move {
        let opener = camera.clone();
        match tokio::task::spawn_blocking(move || opener.initialize()).await {
            Ok(Ok(())) => info!("Live capture started at {} FPS", fps),
            Ok(Err(e)) => {
                error!("Live capture disabled: {}", e);
                return;
            }
            Err(e) => {
                error!("Live capture disabled: {}", e);
                return;
            }
        }

        let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frames: u64 = 0;
        let mut failures = FailureStreak::default();

        while camera.is_running() {
            ticker.tick().await;

            let cam = camera.clone();
            let analyzer = state.analyzer.clone();
            let result = tokio::task::spawn_blocking(move || {
                let frame = cam.capture_frame()?;
                let analysis = analyzer.analyze(&frame)?;
                Ok::<_, wayfinder_eye::VisionError>((frame, analysis))
            })
            .await;

            match result {
                Ok(Ok((frame, analysis))) => {
                    if let Some(failed) = failures.recover() {
                        info!("Live capture recovered after {} failed frames", failed);
                    }
                    let report = state.publish(frame, analysis);
                    frames += 1;
                    if frames % LOG_EVERY == 0 {
                        let stats = state.analyzer.stats();
                        info!(
                            "Live frame {}: {} objects, {} ({:.1} FPS)",
                            frames,
                            report.num_objects,
                            report.safety_status.label(),
                            stats.last_fps
                        );
                    }
                }
                Ok(Err(e)) => {
                    if failures.fail() {
                        warn!("Live frames failing: {}", e);
                    } else {
                        debug!("Live frame skipped: {}", e);
                    }
                }
                Err(e) => {
                    error!("Live capture task failed: {}", e);
                    break;
                }
            }
        }
        camera.stop();
        info!("Live capture stopped after {} frames", frames);
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_streak_reports_start_and_end_once() {
        let mut streak = FailureStreak::default();
        assert_eq!(streak.recover(), None);

        assert!(streak.fail());
        assert!(!streak.fail());
        assert!(!streak.fail());
        assert_eq!(streak.recover(), Some(3));
        assert_eq!(streak.recover(), None);

        assert!(streak.fail());
    }
}
