//! Press timing and dispatch.
//!
//! [`ShutterMonitor`] is called from the listener thread on every edge.  It
//! never blocks on the work a press triggers: capture runs and AP
//! activation are spawned onto the runtime and the call returns.
//!
//! Until the monitor is [armed](ShutterMonitor::arm) clicks are refused
//! with [`PressOutcome::NotReady`]; holds still reach the AP controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::runtime::Handle;

use crate::config::ConfigSource;
use crate::indicator::{LedMode, StatusIndicator};
use crate::network::ApModeController;
use crate::pipeline::{CapturePipeline, DeviceState};

use super::{classify, PressEvent, PressKind, PressOutcome};

/// A press that has gone down but not come up yet.
#[derive(Debug, Clone, Copy)]
struct OpenPress {
    start: Instant,
    /// The ready light was switched off for this press.
    dimmed: bool,
}

pub struct ShutterMonitor {
    pipeline: Arc<CapturePipeline>,
    ap_mode: Arc<ApModeController>,
    indicator: Arc<StatusIndicator>,
    config: Arc<dyn ConfigSource>,
    runtime: Handle,
    open: Mutex<Option<OpenPress>>,
    armed: AtomicBool,
}

impl ShutterMonitor {
    pub fn new(
        pipeline: Arc<CapturePipeline>,
        ap_mode: Arc<ApModeController>,
        indicator: Arc<StatusIndicator>,
        config: Arc<dyn ConfigSource>,
        runtime: Handle,
    ) -> Self {
        Self {
            pipeline,
            ap_mode,
            indicator,
            config,
            runtime,
            open: Mutex::new(None),
            armed: AtomicBool::new(true),
        }
    }

    /// Accept clicks.  A new monitor starts armed.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Refuse clicks until [`arm`](Self::arm) is called again.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn on_edge_down(&self) {
        self.on_edge_down_at(Instant::now());
    }

    pub fn on_edge_up(&self) -> PressOutcome {
        self.on_edge_up_at(Instant::now())
    }

    /// Record a press starting at `at`.  Key auto-repeat delivers repeated
    /// downs while the button is held; only the first one counts.
    pub fn on_edge_down_at(&self, at: Instant) {
        let mut open = self.lock_open();
        if open.is_some() {
            return;
        }

        let dimmed = self.is_armed() && self.pipeline.state() == DeviceState::Idle;
        if dimmed {
            self.indicator.set_mode(LedMode::Off);
        }
        *open = Some(OpenPress { start: at, dimmed });
        log::debug!("shutter: down");
    }

    /// Close the open press at `at`, classify it and dispatch.
    pub fn on_edge_up_at(&self, at: Instant) -> PressOutcome {
        let Some(press) = self.lock_open().take() else {
            log::debug!("shutter: release without press, ignored");
            return PressOutcome::Discarded;
        };

        let event = PressEvent::new(press.start, at);
        let cfg = self.config.snapshot().shutter;
        let kind = classify(event.duration, &cfg);
        log::debug!("shutter: {kind:?} after {:?}", event.duration);

        let outcome = match kind {
            PressKind::Noise => PressOutcome::Discarded,
            PressKind::Click if !self.is_armed() => {
                log::info!("shutter: still starting up, press ignored");
                PressOutcome::NotReady
            }
            PressKind::Click => {
                if self.pipeline.trigger(&self.runtime) {
                    log::info!("shutter: click, capture started");
                    PressOutcome::CaptureStarted
                } else {
                    log::info!(
                        "shutter: busy ({}), press ignored",
                        self.pipeline.state()
                    );
                    PressOutcome::Busy
                }
            }
            PressKind::Unassigned => {
                log::debug!("shutter: press length has no action");
                PressOutcome::Unassigned
            }
            PressKind::Hold => {
                log::info!("shutter: hold, requesting AP mode");
                self.ap_mode.activate(&self.runtime);
                PressOutcome::ApActivation
            }
        };

        if press.dimmed && outcome != PressOutcome::CaptureStarted {
            self.indicator.set_mode(LedMode::READY);
        }
        outcome
    }

    fn lock_open(&self) -> std::sync::MutexGuard<'_, Option<OpenPress>> {
        match self.open.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
