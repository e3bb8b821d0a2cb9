//! Status LED.
//!
//! [`StatusIndicator`] maps a [`LedMode`] onto an [`LedDriver`].  Driver
//! failures are logged at debug level and dropped: a broken LED must never
//! take the appliance down.
//!
//! Mode changes are serialised behind one mutex.  The driver call happens
//! while the lock is held, so the mode recorded last is also the mode the
//! hardware shows last.

pub mod led;

pub use led::{open_or_null, LedDriver, LedError, NullLed, SysfsLed};

use std::sync::Mutex;

// ---------------------------------------------------------------------------
// LedMode
// ---------------------------------------------------------------------------

/// Light pattern shown by an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    SolidOn,
    Blinking { on_ms: u32, off_ms: u32 },
    Off,
}

impl LedMode {
    /// Shown while the appliance is ready for a press.
    pub const READY: LedMode = LedMode::SolidOn;
    /// Shown while a capture run is in flight.
    pub const WORKING: LedMode = LedMode::Blinking {
        on_ms: 200,
        off_ms: 200,
    };
    /// Shown while waiting for the printer service after boot.
    pub const STARTING: LedMode = LedMode::Blinking {
        on_ms: 500,
        off_ms: 500,
    };
    /// Shown on the network LED while offline.
    pub const SEARCHING: LedMode = LedMode::Blinking {
        on_ms: 1_000,
        off_ms: 1_000,
    };
}

// ---------------------------------------------------------------------------
// StatusIndicator
// ---------------------------------------------------------------------------

struct Applied {
    mode: LedMode,
    sequence: u64,
}

/// Thread-safe, fault-tolerant wrapper around one LED.
pub struct StatusIndicator {
    driver: Box<dyn LedDriver>,
    applied: Mutex<Applied>,
}

impl StatusIndicator {
    pub fn new(driver: Box<dyn LedDriver>) -> Self {
        Self {
            driver,
            applied: Mutex::new(Applied {
                mode: LedMode::Off,
                sequence: 0,
            }),
        }
    }

    /// Indicator with no hardware behind it.
    pub fn disabled() -> Self {
        Self::new(Box::new(NullLed))
    }

    /// Switch to `mode`.  Never fails.
    pub fn set_mode(&self, mode: LedMode) {
        let mut applied = match self.applied.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let result = match mode {
            LedMode::SolidOn => self.driver.on(),
            LedMode::Off => self.driver.off(),
            LedMode::Blinking { on_ms, off_ms } => self.driver.blink(on_ms, off_ms),
        };
        if let Err(e) = result {
            log::debug!("indicator: ignoring LED fault ({e})");
        }

        applied.mode = mode;
        applied.sequence += 1;
    }

    /// Last mode requested.
    pub fn mode(&self) -> LedMode {
        match self.applied.lock() {
            Ok(guard) => guard.mode,
            Err(poisoned) => poisoned.into_inner().mode,
        }
    }

    /// Number of mode changes applied so far.
    pub fn sequence(&self) -> u64 {
        match self.applied.lock() {
            Ok(guard) => guard.sequence,
            Err(poisoned) => poisoned.into_inner().sequence,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
