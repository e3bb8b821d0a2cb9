//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every section is `#[serde(default)]`, so a partial `settings.toml` written
//! by the dashboard still loads.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;

/// Environment variable that overrides `generation.api_key`.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Configuration problems detected at startup.
///
/// These are the only fatal errors in the appliance: `main` refuses to start
/// the input loop while any of them is present.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// No API key in the file and none in `OPENAI_API_KEY`.
    #[error("no generation API key configured (set OPENAI_API_KEY or generation.api_key)")]
    MissingApiKey,

    /// `generation.model` is empty.
    #[error("no generation model configured (generation.model)")]
    MissingModel,

    /// A value is present but unusable.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// GenerationStrategy
// ---------------------------------------------------------------------------

/// Which request shape the generation client uses.
///
/// | Variant       | Round trips                                   |
/// |---------------|-----------------------------------------------|
/// | `SingleStage` | image + instructions in one vision request     |
/// | `TwoStage`    | caption the image, then write from the caption |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStrategy {
    SingleStage,
    /// Older caption-then-poem flow, kept behind the same client contract.
    TwoStage,
}

impl Default for GenerationStrategy {
    fn default() -> Self {
        Self::SingleStage
    }
}

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

/// Settings for the external generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible endpoint (no trailing `/v1`).
    pub base_url: String,
    /// API key — usually supplied through `OPENAI_API_KEY` instead.
    pub api_key: Option<String>,
    /// Model identifier sent with every request (must accept images).
    pub model: String,
    /// Upper bound for each individual request, in seconds.
    pub timeout_secs: u64,
    /// Request shape.
    pub strategy: GenerationStrategy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            timeout_secs: 30,
            strategy: GenerationStrategy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// PromptConfig
// ---------------------------------------------------------------------------

/// Prompt templates edited from the management dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// System prompt for the captioning call (two-stage only).
    pub caption_system_prompt: String,
    /// User prompt for the captioning call (two-stage only).
    pub caption_prompt: String,
    /// System prompt for the poem call (two-stage only).
    pub poem_system_prompt: String,
    /// Base poem prompt, used by both strategies.
    pub poem_prompt: String,
    /// Form / style tag, e.g. `"couplet"`, `"haiku"`, `"limerick"`.
    pub poem_format: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            caption_system_prompt: "You are an image captioner. \
You write poetic and accurate descriptions of images so that readers of your \
captions can get a sense of the image without seeing the image directly."
                .into(),
            caption_prompt: "Describe what is happening in this image. \
What is the subject of this image? Are there any people in it? \
What do they look like and what are they doing? \
If their gender is not clear, use gender-neutral pronouns like \"they\". \
What is the setting? What time of day or year is it, if you can tell? \
What emotions might this image evoke? \
Don't mention if the image is blurry, just give your best guess. Be concise."
                .into(),
            poem_system_prompt: "You are a highly-gifted creative poet. \
You specialize in elegant and emotionally impactful poems. \
You use subtlety and write in a modern vernacular style. \
You focus on specific and personal truth, and use specific and concrete \
details to show, not tell."
                .into(),
            poem_prompt: "Write a poem using the details, atmosphere, and emotion of this scene. \
Create a unique and elegant poem using specific details from the scene. \
Make sure to use the specified poem format. \
If there are people where gender is uncertain, use gender-neutral pronouns \
like 'they' or 'you'."
                .into(),
            poem_format: "couplet".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// PrinterConfig
// ---------------------------------------------------------------------------

/// Settings for the co-resident printer service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// URL that accepts `POST {"text": ...}`.
    pub url: String,
    /// Seconds to wait for the printer service before giving up.
    pub timeout_secs: u64,
    /// First half of the footer line; the date is appended after a comma.
    pub footer_signature: String,
    /// How long startup waits for the service to report `"ready": true`
    /// before arming the shutter anyway.
    pub ready_wait_secs: u64,
    /// Interval between readiness checks during startup.
    pub ready_poll_ms: u64,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5002".into(),
            timeout_secs: 5,
            footer_signature: "Written by The Poeteer".into(),
            ready_wait_secs: 60,
            ready_poll_ms: 1_000,
        }
    }
}

// ---------------------------------------------------------------------------
// CameraConfig
// ---------------------------------------------------------------------------

/// Settings for the still camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Still-capture executable (`rpicam-still`, `libcamera-still`, …).
    pub command: String,
    /// Sensor warm-up after power-on, in milliseconds.
    pub warmup_ms: u64,
    /// Directory that receives the working JPEG for each run.
    pub image_dir: std::path::PathBuf,
    /// Upper bound on one capture, warm-up excluded.  A camera that has not
    /// answered by then is treated as faulty.
    pub capture_timeout_secs: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            command: "rpicam-still".into(),
            warmup_ms: 1_000,
            image_dir: AppPaths::new().image_dir,
            capture_timeout_secs: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// ShutterConfig
// ---------------------------------------------------------------------------

/// Shutter button binding and press classification thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutterConfig {
    /// Key name the gpio-key overlay emits for the shutter (e.g. `"F9"`).
    pub key: String,
    /// Presses at or below this length are contact bounce.
    pub noise_ms: u64,
    /// Presses shorter than this (and above `noise_ms`) are clicks.
    pub click_max_ms: u64,
    /// Presses at least this long request AP mode.
    pub hold_min_ms: u64,
}

impl Default for ShutterConfig {
    fn default() -> Self {
        Self {
            key: "F9".into(),
            noise_ms: 50,
            click_max_ms: 2_000,
            hold_min_ms: 9_000,
        }
    }
}

// ---------------------------------------------------------------------------
// IndicatorConfig
// ---------------------------------------------------------------------------

/// LED class device names under `/sys/class/leds`.  `None` disables the LED.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub status_led: Option<String>,
    pub network_led: Option<String>,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            status_led: Some("status".into()),
            network_led: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectivityConfig
// ---------------------------------------------------------------------------

/// Reachability polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Seconds between polls.
    pub interval_secs: u64,
    /// Probe attempts per poll before the poll counts as offline.
    pub attempts: u32,
    /// Pause between attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Per-request timeout for each host check, in seconds.
    pub request_timeout_secs: u64,
    /// Hosts checked by logical OR.
    pub hosts: Vec<String>,
    /// Print a greeting with the initial online/offline state.
    pub startup_banner: bool,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            attempts: 3,
            retry_delay_ms: 3_000,
            request_timeout_secs: 5,
            hosts: vec![
                "https://www.google.com".into(),
                "https://www.example.com".into(),
            ],
            startup_banner: true,
        }
    }
}

// ---------------------------------------------------------------------------
// ApModeConfig
// ---------------------------------------------------------------------------

/// Access-point (setup network) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApModeConfig {
    /// Pre-provisioned NetworkManager connection profile.
    pub profile: String,
    /// Validity window of the cached `is_active` answer, in seconds.
    pub cache_ttl_secs: u64,
    /// Where the dashboard is reachable once the AP is up.
    pub dashboard_url: String,
}

impl Default for ApModeConfig {
    fn default() -> Self {
        Self {
            profile: "PoetCam".into(),
            cache_ttl_secs: 30,
            dashboard_url: "http://10.42.0.1:8000".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// FallbackConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Maximum characters of an error message embedded in printed text.
    pub diagnostic_max_chars: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            diagnostic_max_chars: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use poetry_camera::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub prompts: PromptConfig,
    pub printer: PrinterConfig,
    pub camera: CameraConfig,
    pub shutter: ShutterConfig,
    pub indicator: IndicatorConfig,
    pub connectivity: ConnectivityConfig,
    pub ap_mode: ApModeConfig,
    pub fallback: FallbackConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill `generation.api_key` from `OPENAI_API_KEY` when it is set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.generation.api_key = Some(key);
            }
        }
        self
    }

    /// Check everything the appliance cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let key = self.generation.api_key.as_deref().unwrap_or("");
        if key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "generation.timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }
        let s = &self.shutter;
        if !(s.noise_ms < s.click_max_ms && s.click_max_ms <= s.hold_min_ms) {
            return Err(ConfigError::InvalidValue {
                field: "shutter",
                reason: format!(
                    "thresholds must satisfy noise_ms < click_max_ms <= hold_min_ms \
                     (got {} / {} / {})",
                    s.noise_ms, s.click_max_ms, s.hold_min_ms
                ),
            });
        }
        if self.connectivity.hosts.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "connectivity.hosts",
                reason: "at least one host is required".into(),
            });
        }
        if self.camera.capture_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "camera.capture_timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }
        if self.printer.ready_poll_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "printer.ready_poll_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.connectivity.attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connectivity.attempts",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
