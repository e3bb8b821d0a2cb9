//! Capture pipeline — the press → camera → poem → printer state machine.
//!
//! # Architecture
//!
//! ```text
//! ShutterMonitor (edge thread)
//!        │  CapturePipeline::trigger(handle)
//!        ▼
//! DeviceStateCell::try_begin   ← atomic Idle → Capturing, or rejected
//!        │
//!        ▼
//! RunGuard::run()  ← tokio task, one per accepted press
//!        ├─ spawn_blocking(camera)          → Capturing
//!        ├─ FallbackGenerator::compose      → Composing
//!        ├─ PrintDispatcher::dispatch       → Printing
//!        └─ drop(RunGuard)                  → indicator ready, Idle
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use poetry_camera::camera::CommandCamera;
//! use poetry_camera::config::{AppConfig, ConfigSource, StaticConfigSource};
//! use poetry_camera::generate::ConfiguredGenerator;
//! use poetry_camera::indicator::StatusIndicator;
//! use poetry_camera::pipeline::{CapturePipeline, DeviceStateCell};
//! use poetry_camera::printer::{HttpPrinter, PrintDispatcher};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config: Arc<dyn ConfigSource> = Arc::new(StaticConfigSource(AppConfig::default()));
//!     let pipeline = Arc::new(CapturePipeline::new(
//!         Arc::new(DeviceStateCell::new()),
//!         Arc::new(CommandCamera::new("rpicam-still")),
//!         Arc::new(ConfiguredGenerator::new(Arc::clone(&config))),
//!         Arc::new(PrintDispatcher::new(
//!             Arc::new(HttpPrinter::from_config(Arc::clone(&config))),
//!             Arc::clone(&config),
//!         )),
//!         Arc::new(StatusIndicator::disabled()),
//!         config,
//!     ));
//!
//!     if let Some(run) = pipeline.try_begin() {
//!         run.run().await;
//!     }
//! }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{CapturePipeline, RunGuard, IMAGE_FILE};
pub use state::{DeviceState, DeviceStateCell};
