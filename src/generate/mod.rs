//! Generation client — turns a captured frame into a short poem.
//!
//! This module provides:
//! * [`PoemGenerator`] — async trait implemented by every strategy.
//! * [`VisionGenerator`] — canonical single-request strategy.
//! * [`CaptionThenPoemGenerator`] — legacy caption-then-poem strategy.
//! * [`ConfiguredGenerator`] — picks a strategy from config on every call.
//! * [`FallbackGenerator`] — never fails; substitutes notice text on error.
//! * [`PromptBuilder`] — interpolates the configured templates.
//! * [`GenerationError`] — timeout / transport / service / parse variants.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use poetry_camera::camera::CaptureArtifact;
//! use poetry_camera::config::{AppConfig, StaticConfigSource};
//! use poetry_camera::generate::{ConfiguredGenerator, FallbackGenerator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Arc::new(StaticConfigSource(AppConfig::default()));
//!     let generator = FallbackGenerator::new(Arc::new(ConfiguredGenerator::new(config)), 50);
//!
//!     let image = CaptureArtifact::read_from("image.jpg".as_ref()).unwrap();
//!     let result = generator.compose(&image).await;
//!     println!("{}", result.text);
//! }
//! ```

pub mod client;
pub mod fallback;
pub mod prompt;
pub mod select;
pub mod two_stage;
pub mod vision;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{ChatClient, GenerationError, PoemGenerator};
pub use fallback::{
    failure_text, truncate_diagnostic, ComposedResult, FailureKind, FallbackGenerator, Origin,
};
pub use prompt::PromptBuilder;
pub use select::ConfiguredGenerator;
pub use two_stage::CaptionThenPoemGenerator;
pub use vision::VisionGenerator;
