//! Per-operation access to configuration.
//!
//! The dashboard edits `settings.toml` while the appliance is running, so
//! components never hold on to an [`AppConfig`] for longer than one
//! operation.  They ask a [`ConfigSource`] for a fresh snapshot instead.

use std::path::PathBuf;
use std::sync::Mutex;

use super::AppConfig;

/// Read-mostly configuration collaborator.
pub trait ConfigSource: Send + Sync {
    /// Current configuration.  Called once per pipeline run / generation
    /// call / print, never cached by the caller.
    fn snapshot(&self) -> AppConfig;
}

// ---------------------------------------------------------------------------
// FileConfigSource
// ---------------------------------------------------------------------------

/// Re-reads `settings.toml` on every snapshot.
///
/// A file that fails to parse (e.g. caught mid-write) or fails
/// [`AppConfig::validate`] yields the last good configuration.  Environment
/// overrides are re-applied on each read, before validation.
pub struct FileConfigSource {
    path: PathBuf,
    last_good: Mutex<AppConfig>,
}

impl FileConfigSource {
    /// `initial` is returned until the file yields something parseable.
    pub fn new(path: impl Into<PathBuf>, initial: AppConfig) -> Self {
        Self {
            path: path.into(),
            last_good: Mutex::new(initial),
        }
    }
}

impl ConfigSource for FileConfigSource {
    fn snapshot(&self) -> AppConfig {
        let mut last = match self.last_good.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match AppConfig::load_from(&self.path) {
            Ok(cfg) => {
                let cfg = cfg.with_env_overrides();
                match cfg.validate() {
                    Ok(()) => *last = cfg,
                    Err(e) => log::warn!(
                        "config: rejecting edited {} ({e}); using last good settings",
                        self.path.display()
                    ),
                }
            }
            Err(e) => {
                log::warn!(
                    "config: could not re-read {} ({e}); using last good settings",
                    self.path.display()
                );
            }
        }
        last.clone()
    }
}

// ---------------------------------------------------------------------------
// StaticConfigSource
// ---------------------------------------------------------------------------

/// Fixed configuration, for tests and for running without a settings file.
pub struct StaticConfigSource(pub AppConfig);

impl ConfigSource for StaticConfigSource {
    fn snapshot(&self) -> AppConfig {
        self.0.clone()
    }
}
