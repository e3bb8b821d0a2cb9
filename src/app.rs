//! Appliance assembly and task ownership.
//!
//! # Architecture
//!
//! [`Appliance`] wires the components together and owns the long-lived
//! background work:
//!
//! ```text
//! ShutterListener (OS thread) ──▶ ShutterMonitor
//!                                   ├─ click → CapturePipeline (task per run)
//!                                   └─ hold  → ApModeController (task per activation)
//!
//! startup task: wait for printer ready ─▶ arm shutter ─▶ ConnectivityMonitor::run
//!                                                      └─ banners ──▶ PrintDispatcher ◀── pipeline poems
//! ```
//!
//! Until the printer service answers (or `printer.ready_wait_secs` runs out)
//! the status LED blinks [`LedMode::STARTING`] and clicks are refused.
//!
//! The hardware and service edges come in through [`Components`], so the
//! whole appliance can be exercised with in-memory doubles.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::camera::{Camera, CommandCamera};
use crate::config::{AppConfig, ConfigSource};
use crate::connectivity::{ConnectivityMonitor, HttpProbe, ReachabilityProbe};
use crate::generate::{ConfiguredGenerator, PoemGenerator};
use crate::indicator::{open_or_null, LedMode, StatusIndicator};
use crate::network::{ApModeController, NetworkManager, NmcliNetworkManager};
use crate::pipeline::{CapturePipeline, DeviceState, DeviceStateCell};
use crate::printer::{HttpPrinter, PrintDispatcher, Printer};
use crate::shutter::ShutterMonitor;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Everything the appliance talks to outside its own process.
pub struct Components {
    pub camera: Arc<dyn Camera>,
    pub generator: Arc<dyn PoemGenerator>,
    pub printer: Arc<dyn Printer>,
    pub probe: Arc<dyn ReachabilityProbe>,
    pub network: Arc<dyn NetworkManager>,
    pub status_led: Arc<StatusIndicator>,
    /// `None` when no network LED is fitted.
    pub network_led: Option<Arc<StatusIndicator>>,
}

impl Components {
    /// Production components: `rpicam-still`, the configured generation
    /// service, the local printer service, HTTP probes, `nmcli`, sysfs LEDs.
    pub fn from_config(cfg: &AppConfig, source: Arc<dyn ConfigSource>) -> Self {
        let network_led = cfg
            .indicator
            .network_led
            .as_deref()
            .map(|name| Arc::new(StatusIndicator::new(open_or_null(Some(name)))));

        Self {
            camera: Arc::new(
                CommandCamera::new(cfg.camera.command.clone())
                    .with_timeout(Duration::from_secs(cfg.camera.capture_timeout_secs)),
            ),
            generator: Arc::new(ConfiguredGenerator::new(Arc::clone(&source))),
            printer: Arc::new(HttpPrinter::from_config(source)),
            probe: Arc::new(HttpProbe::new()),
            network: Arc::new(NmcliNetworkManager::new(cfg.ap_mode.profile.clone())),
            status_led: Arc::new(StatusIndicator::new(open_or_null(
                cfg.indicator.status_led.as_deref(),
            ))),
            network_led,
        }
    }
}

// ---------------------------------------------------------------------------
// Appliance
// ---------------------------------------------------------------------------

pub struct Appliance {
    config: Arc<dyn ConfigSource>,
    state: Arc<DeviceStateCell>,
    indicator: Arc<StatusIndicator>,
    dispatcher: Arc<PrintDispatcher>,
    pipeline: Arc<CapturePipeline>,
    ap_mode: Arc<ApModeController>,
    connectivity: Arc<ConnectivityMonitor>,
    shutter: Arc<ShutterMonitor>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Appliance {
    /// Build every component and start the background tasks on `runtime`.
    ///
    /// The shutter stays disarmed until the startup task has seen the
    /// printer service come up.
    pub fn start(config: Arc<dyn ConfigSource>, parts: Components, runtime: Handle) -> Self {
        let mut appliance = Self::assemble(config, parts, runtime.clone());

        appliance.shutter.disarm();
        appliance.indicator.set_mode(LedMode::STARTING);
        let startup = appliance.startup(appliance.cancel.clone());
        appliance.tasks.push(runtime.spawn(startup));

        appliance
    }

    fn startup(&self, cancel: CancellationToken) -> impl Future<Output = ()> + Send + 'static {
        let printer = self.config.snapshot().printer;
        let dispatcher = Arc::clone(&self.dispatcher);
        let indicator = Arc::clone(&self.indicator);
        let shutter = Arc::clone(&self.shutter);
        let connectivity = Arc::clone(&self.connectivity);

        async move {
            let limit = Duration::from_secs(printer.ready_wait_secs);
            let poll = Duration::from_millis(printer.ready_poll_ms);
            log::info!("appliance: waiting up to {limit:?} for the printer service");

            tokio::select! {
                _ = cancel.cancelled() => return,
                ready = dispatcher.wait_ready(limit, poll) => {
                    if !ready {
                        log::warn!("appliance: printer service not ready after {limit:?}, starting anyway");
                    }
                }
            }

            indicator.set_mode(LedMode::READY);
            shutter.arm();
            log::info!("appliance: ready");

            connectivity.run(cancel).await;
        }
    }

    /// Build every component without starting any task.
    pub fn assemble(config: Arc<dyn ConfigSource>, parts: Components, runtime: Handle) -> Self {
        let state = Arc::new(DeviceStateCell::new());
        let dispatcher = Arc::new(PrintDispatcher::new(parts.printer, Arc::clone(&config)));

        let pipeline = Arc::new(CapturePipeline::new(
            Arc::clone(&state),
            parts.camera,
            parts.generator,
            Arc::clone(&dispatcher),
            Arc::clone(&parts.status_led),
            Arc::clone(&config),
        ));

        let ap_mode = Arc::new(ApModeController::new(parts.network, Arc::clone(&config)));

        let mut connectivity = ConnectivityMonitor::new(
            parts.probe,
            Arc::clone(&dispatcher),
            Arc::clone(&state),
            Arc::clone(&config),
        );
        if let Some(led) = parts.network_led {
            connectivity = connectivity.with_network_led(led);
        }

        let shutter = Arc::new(ShutterMonitor::new(
            Arc::clone(&pipeline),
            Arc::clone(&ap_mode),
            Arc::clone(&parts.status_led),
            Arc::clone(&config),
            runtime,
        ));

        Self {
            config,
            state,
            indicator: parts.status_led,
            dispatcher,
            pipeline,
            ap_mode,
            connectivity: Arc::new(connectivity),
            shutter,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Edge callbacks for the shutter listener.
    pub fn shutter(&self) -> Arc<ShutterMonitor> {
        Arc::clone(&self.shutter)
    }

    pub fn pipeline(&self) -> &Arc<CapturePipeline> {
        &self.pipeline
    }

    pub fn ap_mode(&self) -> &Arc<ApModeController> {
        &self.ap_mode
    }

    pub fn connectivity(&self) -> &Arc<ConnectivityMonitor> {
        &self.connectivity
    }

    pub fn dispatcher(&self) -> &Arc<PrintDispatcher> {
        &self.dispatcher
    }

    pub fn indicator(&self) -> &Arc<StatusIndicator> {
        &self.indicator
    }

    pub fn state(&self) -> DeviceState {
        self.state.get()
    }

    /// Stop the background tasks and wait for them.  An in-flight capture
    /// run is not cancelled; it finishes on its own.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                log::warn!("appliance: background task ended abnormally: {e}");
            }
        }
        log::info!("appliance: stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticConfigSource;
    use crate::connectivity::ProbeError;
    use crate::shutter::PressOutcome;
    use crate::testing::{FakeNetwork, GatedGenerator, RecordingPrinter, StillCamera};
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;
    use std::time::Instant;

    struct AlwaysUp;

    #[async_trait]
    impl ReachabilityProbe for AlwaysUp {
        async fn probe(&self, _: &[String], _: Duration) -> Result<(), ProbeError> {
            Ok(())
        }
    }

    fn parts(printer: Arc<RecordingPrinter>) -> Components {
        Components {
            camera: Arc::new(StillCamera),
            generator: Arc::new(GatedGenerator::open("Leaves fall softly")),
            printer,
            probe: Arc::new(AlwaysUp),
            network: Arc::new(FakeNetwork::default()),
            status_led: Arc::new(StatusIndicator::disabled()),
            network_led: None,
        }
    }

    fn config(dir: &std::path::Path, startup_banner: bool) -> Arc<dyn ConfigSource> {
        let mut cfg = AppConfig::default();
        cfg.camera.warmup_ms = 0;
        cfg.camera.image_dir = dir.to_path_buf();
        cfg.connectivity.startup_banner = startup_banner;
        cfg.printer.ready_poll_ms = 10;
        Arc::new(StaticConfigSource(cfg))
    }

    fn click(appliance: &Appliance) -> PressOutcome {
        let shutter = appliance.shutter();
        let t0 = Instant::now();
        shutter.on_edge_down_at(t0);
        shutter.on_edge_up_at(t0 + Duration::from_millis(300))
    }

    async fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if done() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        done()
    }

    #[tokio::test]
    async fn start_prints_greeting_and_goes_ready() {
        let dir = tempfile::tempdir().unwrap();
        let printer = Arc::new(RecordingPrinter::default());
        let appliance = Appliance::start(
            config(dir.path(), true),
            parts(printer.clone()),
            Handle::current(),
        );
        assert!(wait_until(|| appliance.indicator().mode() == LedMode::READY).await);

        assert!(wait_until(|| !printer.jobs().is_empty()).await);
        assert!(printer.jobs()[0].contains("and i am ONLINE!"));
        appliance.shutdown().await;
    }

    #[tokio::test]
    async fn clicks_wait_for_printer_service() {
        let dir = tempfile::tempdir().unwrap();
        let printer = Arc::new(RecordingPrinter::default());
        printer.not_ready.store(true, Ordering::SeqCst);
        let appliance = Appliance::start(
            config(dir.path(), true),
            parts(printer.clone()),
            Handle::current(),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(appliance.indicator().mode(), LedMode::STARTING);
        assert_eq!(click(&appliance), PressOutcome::NotReady);
        assert_eq!(appliance.pipeline().run_count(), 0);
        assert!(printer.jobs().is_empty());

        printer.not_ready.store(false, Ordering::SeqCst);
        assert!(wait_until(|| appliance.indicator().mode() == LedMode::READY).await);
        assert!(wait_until(|| !printer.jobs().is_empty()).await);
        assert!(printer.jobs()[0].contains("and i am ONLINE!"));

        assert_eq!(click(&appliance), PressOutcome::CaptureStarted);
        assert!(wait_until(|| appliance.pipeline().run_count() == 1).await);
        appliance.shutdown().await;
    }

    #[tokio::test]
    async fn printer_that_never_answers_does_not_block_startup_forever() {
        let dir = tempfile::tempdir().unwrap();
        let printer = Arc::new(RecordingPrinter::default());
        printer.not_ready.store(true, Ordering::SeqCst);

        let mut cfg = AppConfig::default();
        cfg.camera.warmup_ms = 0;
        cfg.camera.image_dir = dir.path().to_path_buf();
        cfg.connectivity.startup_banner = false;
        cfg.printer.ready_wait_secs = 0;
        cfg.printer.ready_poll_ms = 10;
        let appliance = Appliance::start(
            Arc::new(StaticConfigSource(cfg)),
            parts(printer.clone()),
            Handle::current(),
        );

        assert!(wait_until(|| appliance.indicator().mode() == LedMode::READY).await);
        assert!(appliance.shutter().is_armed());
        appliance.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_during_startup_wait_returns() {
        let dir = tempfile::tempdir().unwrap();
        let printer = Arc::new(RecordingPrinter::default());
        printer.not_ready.store(true, Ordering::SeqCst);
        let appliance = Appliance::start(
            config(dir.path(), true),
            parts(printer.clone()),
            Handle::current(),
        );

        tokio::time::timeout(Duration::from_secs(2), appliance.shutdown())
            .await
            .expect("shutdown should not wait for the printer");
        assert!(printer.jobs().is_empty());
    }

    #[tokio::test]
    async fn click_through_shutter_prints_a_poem() {
        let dir = tempfile::tempdir().unwrap();
        let printer = Arc::new(RecordingPrinter::default());
        let appliance = Appliance::assemble(
            config(dir.path(), false),
            parts(printer.clone()),
            Handle::current(),
        );

        let shutter = appliance.shutter();
        let t0 = Instant::now();
        shutter.on_edge_down_at(t0);
        assert_eq!(
            shutter.on_edge_up_at(t0 + Duration::from_millis(300)),
            PressOutcome::CaptureStarted
        );

        for _ in 0..200 {
            if appliance.pipeline().run_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(appliance.state(), DeviceState::Idle);
        assert!(printer.jobs()[0].starts_with("Leaves fall softly"));
    }

    #[test]
    fn production_components_build_without_hardware() {
        let mut cfg = AppConfig::default();
        cfg.indicator.status_led = Some("definitely-not-a-led".into());
        cfg.indicator.network_led = Some("also-missing".into());
        let source: Arc<dyn ConfigSource> = Arc::new(StaticConfigSource(cfg.clone()));

        let parts = Components::from_config(&cfg, source);
        assert!(parts.network_led.is_some());
    }
}
