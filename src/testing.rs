//! Test doubles shared by unit tests across modules.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use crate::camera::{Camera, CameraError, CaptureArtifact};
use crate::config::{AppConfig, ConfigSource, StaticConfigSource};
use crate::generate::{GenerationError, PoemGenerator};
use crate::indicator::StatusIndicator;
use crate::network::{ApModeController, NetworkError, NetworkManager, VisibleNetwork};
use crate::pipeline::{CapturePipeline, DeviceStateCell};
use crate::printer::{PrintDispatcher, PrintError, Printer};

/// Writes a three-byte JPEG header.
pub struct StillCamera;

impl Camera for StillCamera {
    fn power_on(&self) -> Result<(), CameraError> {
        Ok(())
    }
    fn capture_to(&self, path: &Path) -> Result<(), CameraError> {
        std::fs::write(path, [0xFF, 0xD8, 0xFF])?;
        Ok(())
    }
    fn power_off(&self) {}
}

/// Replies with fixed text; optionally waits for [`release`](Self::release).
pub struct GatedGenerator {
    reply: String,
    gate: Option<Semaphore>,
    pub calls: AtomicUsize,
}

impl GatedGenerator {
    pub fn open(reply: &str) -> Self {
        Self {
            reply: reply.into(),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn closed(reply: &str) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::open(reply)
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }
}

#[async_trait]
impl PoemGenerator for GatedGenerator {
    async fn generate(&self, _image: &CaptureArtifact) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| GenerationError::Request(e.to_string()))?
                .forget();
        }
        Ok(self.reply.clone())
    }
}

/// Records every body it is asked to print.
#[derive(Default)]
pub struct RecordingPrinter {
    pub jobs: Mutex<Vec<String>>,
    pub not_ready: AtomicBool,
}

impl RecordingPrinter {
    pub fn jobs(&self) -> Vec<String> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Printer for RecordingPrinter {
    async fn print(&self, text: &str) -> Result<(), PrintError> {
        self.jobs.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn ready(&self) -> Result<bool, PrintError> {
        Ok(!self.not_ready.load(Ordering::SeqCst))
    }
}

/// Network manager whose AP profile comes up instantly.
#[derive(Default)]
pub struct FakeNetwork {
    pub active: Mutex<Vec<String>>,
    pub ups: AtomicUsize,
    pub lists: AtomicUsize,
    pub fail_lists: AtomicBool,
}

#[async_trait]
impl NetworkManager for FakeNetwork {
    async fn connection_up(&self, name: &str) -> Result<(), NetworkError> {
        self.ups.fetch_add(1, Ordering::SeqCst);
        self.active.lock().unwrap().push(name.to_string());
        Ok(())
    }
    async fn connection_down(&self, name: &str) -> Result<(), NetworkError> {
        self.active.lock().unwrap().retain(|n| n != name);
        Ok(())
    }
    async fn active_connections(&self) -> Result<Vec<String>, NetworkError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(NetworkError::Failed {
                command: "list".into(),
                stderr: "unavailable".into(),
            });
        }
        Ok(self.active.lock().unwrap().clone())
    }
    async fn scan_networks(&self) -> Result<Vec<VisibleNetwork>, NetworkError> {
        Ok(Vec::new())
    }
    async fn add_profile(&self, ssid: &str, _: &str) -> Result<String, NetworkError> {
        Ok(ssid.to_string())
    }
    async fn remove_profile(&self, _: &str) -> Result<(), NetworkError> {
        Ok(())
    }
    async fn modify_credentials(&self, _: &str, _: &str) -> Result<(), NetworkError> {
        Ok(())
    }
}

/// A full appliance wired to in-memory doubles.
pub struct Rig {
    pub config: Arc<dyn ConfigSource>,
    pub state: Arc<DeviceStateCell>,
    pub generator: Arc<GatedGenerator>,
    pub printer: Arc<RecordingPrinter>,
    pub network: Arc<FakeNetwork>,
    pub indicator: Arc<StatusIndicator>,
    pub dispatcher: Arc<PrintDispatcher>,
    pub pipeline: Arc<CapturePipeline>,
    pub ap_mode: Arc<ApModeController>,
    _dir: TempDir,
}

impl Rig {
    pub fn new(generator: GatedGenerator) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.camera.warmup_ms = 0;
        cfg.camera.image_dir = dir.path().to_path_buf();
        let config: Arc<dyn ConfigSource> = Arc::new(StaticConfigSource(cfg));

        let state = Arc::new(DeviceStateCell::new());
        let generator = Arc::new(generator);
        let printer = Arc::new(RecordingPrinter::default());
        let network = Arc::new(FakeNetwork::default());
        let indicator = Arc::new(StatusIndicator::disabled());
        let dispatcher = Arc::new(PrintDispatcher::new(printer.clone(), Arc::clone(&config)));
        let pipeline = Arc::new(CapturePipeline::new(
            Arc::clone(&state),
            Arc::new(StillCamera),
            generator.clone(),
            Arc::clone(&dispatcher),
            Arc::clone(&indicator),
            Arc::clone(&config),
        ));
        let ap_mode = Arc::new(ApModeController::new(network.clone(), Arc::clone(&config)));

        Self {
            config,
            state,
            generator,
            printer,
            network,
            indicator,
            dispatcher,
            pipeline,
            ap_mode,
            _dir: dir,
        }
    }

    /// Poll until `cond` holds or two seconds pass.
    pub async fn wait_for(&self, cond: impl Fn(&Self) -> bool) -> bool {
        for _ in 0..200 {
            if cond(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cond(self)
    }
}
