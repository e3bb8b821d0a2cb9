//! Shutter input — press timing and the key listener that feeds it.
//!
//! The shutter button is wired through the Linux `gpio-key` overlay, so to
//! userspace it is just a key.  [`ShutterListener`] watches that key on a
//! dedicated OS thread and hands raw edges to [`ShutterMonitor`], which
//! times each press and dispatches it:
//!
//! | Duration              | [`PressKind`]  | Effect                          |
//! |-----------------------|----------------|---------------------------------|
//! | `<= noise_ms`         | `Noise`        | discarded                       |
//! | `< click_max_ms`      | `Click`        | capture run if idle, else busy  |
//! | `[click_max, hold)`   | `Unassigned`   | logged only                     |
//! | `>= hold_min_ms`      | `Hold`         | AP mode, regardless of state    |
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use poetry_camera::shutter::{parse_key, ShutterListener, ShutterMonitor};
//!
//! # fn monitor() -> Arc<ShutterMonitor> { unimplemented!() }
//! let key = parse_key("F9").expect("unknown key");
//! let _listener = ShutterListener::start(key, monitor()).expect("listener thread");
//! ```

pub mod listener;
pub mod monitor;

pub use listener::ShutterListener;
pub use monitor::ShutterMonitor;

use std::time::{Duration, Instant};

use crate::config::ShutterConfig;

// ---------------------------------------------------------------------------
// PressEvent
// ---------------------------------------------------------------------------

/// One completed physical press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressEvent {
    pub start: Instant,
    pub end: Instant,
    pub duration: Duration,
}

impl PressEvent {
    pub fn new(start: Instant, end: Instant) -> Self {
        Self {
            start,
            end,
            duration: end.saturating_duration_since(start),
        }
    }
}

// ---------------------------------------------------------------------------
// PressKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    /// Contact bounce.
    Noise,
    /// Short press: take a photo.
    Click,
    /// Between a click and a hold; no action.
    Unassigned,
    /// Long press: enter AP mode.
    Hold,
}

/// Classify a press duration against the configured thresholds.
///
/// ```
/// use std::time::Duration;
/// use poetry_camera::config::ShutterConfig;
/// use poetry_camera::shutter::{classify, PressKind};
///
/// let cfg = ShutterConfig::default();
/// assert_eq!(classify(Duration::from_millis(30), &cfg), PressKind::Noise);
/// assert_eq!(classify(Duration::from_millis(300), &cfg), PressKind::Click);
/// assert_eq!(classify(Duration::from_secs(10), &cfg), PressKind::Hold);
/// ```
pub fn classify(duration: Duration, cfg: &ShutterConfig) -> PressKind {
    if duration <= Duration::from_millis(cfg.noise_ms) {
        PressKind::Noise
    } else if duration < Duration::from_millis(cfg.click_max_ms) {
        PressKind::Click
    } else if duration >= Duration::from_millis(cfg.hold_min_ms) {
        PressKind::Hold
    } else {
        PressKind::Unassigned
    }
}

// ---------------------------------------------------------------------------
// PressOutcome
// ---------------------------------------------------------------------------

/// What a completed press (or a stray release) led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// Noise, or a release with no matching press.
    Discarded,
    /// A capture run was started.
    CaptureStarted,
    /// A click arrived while a run was in flight and was dropped.
    Busy,
    /// A click arrived before the appliance finished starting up.
    NotReady,
    /// AP-mode activation was requested.
    ApActivation,
    /// A press between click and hold length.
    Unassigned,
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

/// Parse a key name from `shutter.key` into an [`rdev::Key`].
///
/// Supports F1–F12, common named keys, and single ASCII letters.
/// Returns `None` for unrecognised names.
///
/// ```
/// use poetry_camera::shutter::parse_key;
///
/// assert_eq!(parse_key("F9"),     Some(rdev::Key::F9));
/// assert_eq!(parse_key("Space"),  Some(rdev::Key::Space));
/// assert_eq!(parse_key("xyz"),    None);
/// ```
pub fn parse_key(key_str: &str) -> Option<rdev::Key> {
    use rdev::Key::*;

    const LETTERS: [rdev::Key; 26] = [
        KeyA, KeyB, KeyC, KeyD, KeyE, KeyF, KeyG, KeyH, KeyI, KeyJ, KeyK, KeyL, KeyM, KeyN,
        KeyO, KeyP, KeyQ, KeyR, KeyS, KeyT, KeyU, KeyV, KeyW, KeyX, KeyY, KeyZ,
    ];

    let key = match key_str {
        "F1" => F1,
        "F2" => F2,
        "F3" => F3,
        "F4" => F4,
        "F5" => F5,
        "F6" => F6,
        "F7" => F7,
        "F8" => F8,
        "F9" => F9,
        "F10" => F10,
        "F11" => F11,
        "F12" => F12,
        "Escape" | "Esc" => Escape,
        "Space" => Space,
        "Return" | "Enter" => Return,
        "Tab" => Tab,
        "Pause" => Pause,
        "PrintScreen" => PrintScreen,
        "ScrollLock" => ScrollLock,
        "UpArrow" | "Up" => UpArrow,
        "DownArrow" | "Down" => DownArrow,
        "LeftArrow" | "Left" => LeftArrow,
        "RightArrow" | "Right" => RightArrow,
        // gpio-key overlays often emit one of these
        "Home" => Home,
        "End" => End,
        _ => {
            let mut chars = key_str.chars();
            let c = chars.next()?.to_ascii_uppercase();
            if chars.next().is_some() || !c.is_ascii_uppercase() {
                return None;
            }
            LETTERS[(c as u8 - b'A') as usize]
        }
    };
    Some(key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn boundaries_follow_config() {
        let cfg = ShutterConfig::default();
        assert_eq!(classify(ms(0), &cfg), PressKind::Noise);
        assert_eq!(classify(ms(50), &cfg), PressKind::Noise);
        assert_eq!(classify(ms(51), &cfg), PressKind::Click);
        assert_eq!(classify(ms(1_999), &cfg), PressKind::Click);
        assert_eq!(classify(ms(2_000), &cfg), PressKind::Unassigned);
        assert_eq!(classify(ms(8_999), &cfg), PressKind::Unassigned);
        assert_eq!(classify(ms(9_000), &cfg), PressKind::Hold);
        assert_eq!(classify(ms(60_000), &cfg), PressKind::Hold);
    }

    #[test]
    fn sub_millisecond_lengths_are_not_rounded() {
        let cfg = ShutterConfig::default();
        let us = Duration::from_micros;
        assert_eq!(classify(us(50_000), &cfg), PressKind::Noise);
        assert_eq!(classify(us(50_001), &cfg), PressKind::Click);
        assert_eq!(classify(us(50_500), &cfg), PressKind::Click);
        assert_eq!(classify(us(50_999), &cfg), PressKind::Click);
        assert_eq!(classify(us(1_999_999), &cfg), PressKind::Click);
        assert_eq!(classify(us(8_999_999), &cfg), PressKind::Unassigned);
    }

    #[test]
    fn thresholds_are_configurable() {
        let cfg = ShutterConfig {
            noise_ms: 10,
            click_max_ms: 500,
            hold_min_ms: 3_000,
            ..ShutterConfig::default()
        };
        assert_eq!(classify(ms(20), &cfg), PressKind::Click);
        assert_eq!(classify(ms(1_000), &cfg), PressKind::Unassigned);
        assert_eq!(classify(ms(3_000), &cfg), PressKind::Hold);
    }

    #[test]
    fn press_event_duration() {
        let start = Instant::now();
        let press = PressEvent::new(start, start + ms(300));
        assert_eq!(press.duration, ms(300));

        // A clock that went backwards yields zero, not a panic.
        let press = PressEvent::new(start + ms(5), start);
        assert_eq!(press.duration, Duration::ZERO);
    }

    #[test]
    fn parse_function_and_named_keys() {
        assert_eq!(parse_key("F9"), Some(rdev::Key::F9));
        assert_eq!(parse_key("F12"), Some(rdev::Key::F12));
        assert_eq!(parse_key("Esc"), Some(rdev::Key::Escape));
        assert_eq!(parse_key("Enter"), Some(rdev::Key::Return));
    }

    #[test]
    fn parse_letter_keys_case_insensitive() {
        assert_eq!(parse_key("s"), Some(rdev::Key::KeyS));
        assert_eq!(parse_key("S"), Some(rdev::Key::KeyS));
    }

    #[test]
    fn parse_unknown_key_returns_none() {
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("Ctrl+V"), None);
    }
}
