//! LED drivers backed by the Linux LED class (`/sys/class/leds/<name>`).
//!
//! Blinking is delegated to the kernel `timer` trigger, so no thread of ours
//! has to toggle the pin.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised by an LED driver.  [`StatusIndicator`](super::StatusIndicator)
/// swallows all of them.
#[derive(Debug, Error)]
pub enum LedError {
    #[error("LED device not found: {0}")]
    NotFound(String),

    #[error("LED write failed ({attribute}): {source}")]
    Write {
        attribute: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Raw on / off / blink primitives of one physical LED.
pub trait LedDriver: Send + Sync {
    fn on(&self) -> Result<(), LedError>;
    fn off(&self) -> Result<(), LedError>;
    fn blink(&self, on_ms: u32, off_ms: u32) -> Result<(), LedError>;
}

// ---------------------------------------------------------------------------
// SysfsLed
// ---------------------------------------------------------------------------

/// One entry under `/sys/class/leds`.
#[derive(Debug, Clone)]
pub struct SysfsLed {
    dir: PathBuf,
}

impl SysfsLed {
    const CLASS_DIR: &'static str = "/sys/class/leds";

    /// Open the LED called `name` (e.g. the label given in the device tree).
    pub fn open(name: &str) -> Result<Self, LedError> {
        Self::open_in(Path::new(Self::CLASS_DIR), name)
    }

    /// Open `name` below an explicit class directory (used by tests).
    pub fn open_in(class_dir: &Path, name: &str) -> Result<Self, LedError> {
        let dir = class_dir.join(name);
        if !dir.join("brightness").exists() {
            return Err(LedError::NotFound(dir.display().to_string()));
        }
        Ok(Self { dir })
    }

    fn write(&self, attribute: &'static str, value: &str) -> Result<(), LedError> {
        std::fs::write(self.dir.join(attribute), value)
            .map_err(|source| LedError::Write { attribute, source })
    }
}

impl LedDriver for SysfsLed {
    fn on(&self) -> Result<(), LedError> {
        self.write("trigger", "none")?;
        self.write("brightness", "1")
    }

    fn off(&self) -> Result<(), LedError> {
        self.write("trigger", "none")?;
        self.write("brightness", "0")
    }

    fn blink(&self, on_ms: u32, off_ms: u32) -> Result<(), LedError> {
        // delay_on/delay_off only appear once the timer trigger is active.
        self.write("trigger", "timer")?;
        self.write("delay_on", &on_ms.to_string())?;
        self.write("delay_off", &off_ms.to_string())
    }
}

// ---------------------------------------------------------------------------
// NullLed
// ---------------------------------------------------------------------------

/// Driver used when no LED is configured or the device is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLed;

impl LedDriver for NullLed {
    fn on(&self) -> Result<(), LedError> {
        Ok(())
    }

    fn off(&self) -> Result<(), LedError> {
        Ok(())
    }

    fn blink(&self, _on_ms: u32, _off_ms: u32) -> Result<(), LedError> {
        Ok(())
    }
}

/// Open the named sysfs LED, or fall back to [`NullLed`] with a warning.
pub fn open_or_null(name: Option<&str>) -> Box<dyn LedDriver> {
    match name {
        Some(name) => match SysfsLed::open(name) {
            Ok(led) => Box::new(led),
            Err(e) => {
                log::warn!("indicator: {e}; LED output disabled");
                Box::new(NullLed)
            }
        },
        None => Box::new(NullLed),
    }
}
