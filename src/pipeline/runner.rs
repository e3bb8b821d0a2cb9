//! Capture pipeline — drives one camera → generation → printer run.
//!
//! [`CapturePipeline::try_begin`] is the only way in.  It wins the
//! `Idle → Capturing` swap or returns `None`; there is no queue.  The
//! returned [`RunGuard`] owns the run and finalizes it when dropped, so the
//! indicator goes back to ready and the state back to `Idle` on every exit
//! path, panics included.
//!
//! # Run flow
//!
//! ```text
//! try_begin ──▶ RunGuard                                    [Capturing]
//!   └─▶ spawn_blocking(power_on → warm-up → capture → power_off)
//!         ├─ Err / timeout → failure text (camera) → dispatch [Error]
//!         └─ Ok  → FallbackGenerator::compose               [Composing]
//!                    └─▶ PrintDispatcher::dispatch           [Printing]
//! drop(RunGuard) ──▶ indicator ready, state Idle
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::camera::{Camera, CameraError, CaptureArtifact};
use crate::config::{CameraConfig, ConfigSource};
use crate::generate::{failure_text, FailureKind, FallbackGenerator, PoemGenerator};
use crate::indicator::{LedMode, StatusIndicator};
use crate::printer::PrintDispatcher;

use super::state::{DeviceState, DeviceStateCell};

/// File name of the working frame inside `camera.image_dir`.
pub const IMAGE_FILE: &str = "image.jpg";

// ---------------------------------------------------------------------------
// CapturePipeline
// ---------------------------------------------------------------------------

pub struct CapturePipeline {
    state: Arc<DeviceStateCell>,
    camera: Arc<dyn Camera>,
    generator: Arc<dyn PoemGenerator>,
    dispatcher: Arc<PrintDispatcher>,
    indicator: Arc<StatusIndicator>,
    config: Arc<dyn ConfigSource>,
    runs: AtomicU64,
}

impl CapturePipeline {
    /// `state` is shared with readers such as the connectivity monitor;
    /// only the pipeline writes to it.
    pub fn new(
        state: Arc<DeviceStateCell>,
        camera: Arc<dyn Camera>,
        generator: Arc<dyn PoemGenerator>,
        dispatcher: Arc<PrintDispatcher>,
        indicator: Arc<StatusIndicator>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            state,
            camera,
            generator,
            dispatcher,
            indicator,
            config,
            runs: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state.get()
    }

    /// Number of runs that have finalized.
    pub fn run_count(&self) -> u64 {
        self.runs.load(Ordering::Acquire)
    }

    /// Claim the pipeline.  `None` means a run is already in flight.
    pub fn try_begin(self: &Arc<Self>) -> Option<RunGuard> {
        if !self.state.try_begin() {
            return None;
        }
        log::debug!("pipeline: Idle → Capturing");
        self.indicator.set_mode(LedMode::WORKING);
        Some(RunGuard {
            pipeline: Arc::clone(self),
        })
    }

    /// Claim the pipeline and run it on `handle`.  Returns whether a run
    /// was started.
    pub fn trigger(self: &Arc<Self>, handle: &tokio::runtime::Handle) -> bool {
        match self.try_begin() {
            Some(guard) => {
                handle.spawn(guard.run());
                true
            }
            None => false,
        }
    }

    async fn execute(&self) {
        let cfg = self.config.snapshot();
        let max_chars = cfg.fallback.diagnostic_max_chars;

        let artifact = match self.capture(&cfg.camera).await {
            Ok(artifact) => artifact,
            Err(e) => {
                log::error!("pipeline: camera fault: {e}");
                self.state.advance(DeviceState::Error);
                let text = failure_text(FailureKind::Camera, &e.to_string(), max_chars);
                if self.dispatcher.dispatch(&text).await.is_err() {
                    log::warn!("pipeline: camera fault notice was not printed");
                }
                return;
            }
        };
        log::info!("pipeline: captured {} bytes", artifact.bytes.len());

        self.state.advance(DeviceState::Composing);
        let composed = FallbackGenerator::new(Arc::clone(&self.generator), max_chars)
            .compose(&artifact)
            .await;
        drop(artifact);
        log::info!("pipeline: composed {:?} text", composed.origin);

        self.state.advance(DeviceState::Printing);
        if self.dispatcher.dispatch(&composed.text).await.is_err() {
            log::warn!("pipeline: print failed, finishing run anyway");
        }
    }

    async fn capture(&self, cfg: &CameraConfig) -> Result<CaptureArtifact, CameraError> {
        let camera = Arc::clone(&self.camera);
        let dir = cfg.image_dir.clone();
        let warmup = Duration::from_millis(cfg.warmup_ms);
        let limit = warmup + Duration::from_secs(cfg.capture_timeout_secs);

        let task = tokio::task::spawn_blocking(move || capture_frame(camera.as_ref(), &dir, warmup));
        match tokio::time::timeout(limit, task).await {
            Ok(joined) => {
                joined.map_err(|e| CameraError::Capture(format!("capture task failed: {e}")))?
            }
            // The blocking call is abandoned; it powers the camera off
            // whenever it returns.
            Err(_) => Err(CameraError::Timeout(limit)),
        }
    }

    fn finalize(&self) {
        self.indicator.set_mode(LedMode::READY);
        self.state.force(DeviceState::Idle);
        let n = self.runs.fetch_add(1, Ordering::AcqRel) + 1;
        log::info!("pipeline: run {n} finished, ready");
    }
}

/// Power the camera, take one frame, and release the camera on every path.
fn capture_frame(
    camera: &dyn Camera,
    dir: &Path,
    warmup: Duration,
) -> Result<CaptureArtifact, CameraError> {
    let result = camera.power_on().and_then(|()| {
        std::thread::sleep(warmup);
        std::fs::create_dir_all(dir)?;
        let path = dir.join(IMAGE_FILE);
        camera.capture_to(&path)?;
        CaptureArtifact::read_from(&path)
    });
    camera.power_off();
    result
}

// ---------------------------------------------------------------------------
// RunGuard
// ---------------------------------------------------------------------------

/// Proof that this caller owns the one in-flight run.
///
/// Dropping it (normally, on error, or while unwinding) finalizes the run.
#[must_use = "dropping a RunGuard immediately finalizes the run"]
pub struct RunGuard {
    pipeline: Arc<CapturePipeline>,
}

impl RunGuard {
    /// Execute the run to completion, then finalize.
    pub async fn run(self) {
        self.pipeline.execute().await;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.pipeline.finalize();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
