//! Configuration module for the poetry camera.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for data directories, TOML persistence via `AppConfig::load` /
//! `AppConfig::save`, and the per-operation [`ConfigSource`] seam.

pub mod paths;
pub mod settings;
pub mod source;

pub use paths::AppPaths;
pub use settings::{
    ApModeConfig, AppConfig, CameraConfig, ConfigError, ConnectivityConfig, FallbackConfig,
    GenerationConfig, GenerationStrategy, IndicatorConfig, PrinterConfig, PromptConfig,
    ShutterConfig, API_KEY_ENV,
};
pub use source::{ConfigSource, FileConfigSource, StaticConfigSource};
