//! Device state machine.
//!
//! [`DeviceState`] is the one process-wide value that decides whether a
//! press may start a run.  [`DeviceStateCell`] stores it in an atomic so the
//! accept/reject decision is a single compare-and-swap: there is no window
//! between "is it idle?" and "mark it busy".
//!
//! ```text
//! Idle ──accept──▶ Capturing ──▶ Composing ──▶ Printing ──▶ Idle
//! any ──fault──▶ Error ──finalize──▶ Idle
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

// ---------------------------------------------------------------------------
// DeviceState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DeviceState {
    /// Ready for a press.
    #[default]
    Idle = 0,
    /// Camera powered, frame being taken.
    Capturing = 1,
    /// Waiting on the generation service.
    Composing = 2,
    /// Handing the text to the printer.
    Printing = 3,
    /// A stage failed; the run is on its way back to `Idle`.
    Error = 4,
}

impl DeviceState {
    /// `true` for every state except `Idle`.
    ///
    /// ```
    /// use poetry_camera::pipeline::DeviceState;
    ///
    /// assert!(!DeviceState::Idle.is_busy());
    /// assert!(DeviceState::Capturing.is_busy());
    /// assert!(DeviceState::Error.is_busy());
    /// ```
    pub fn is_busy(self) -> bool {
        self != DeviceState::Idle
    }

    /// Short label used in logs and the offline banner.
    pub fn label(self) -> &'static str {
        match self {
            DeviceState::Idle => "Idle",
            DeviceState::Capturing => "Capturing",
            DeviceState::Composing => "Composing",
            DeviceState::Printing => "Printing",
            DeviceState::Error => "Error",
        }
    }

    /// Whether `self → next` is an edge of the state machine.
    pub fn can_transition_to(self, next: DeviceState) -> bool {
        use DeviceState::*;
        matches!(
            (self, next),
            (Idle, Capturing)
                | (Capturing, Composing)
                | (Composing, Printing)
                | (Printing, Idle)
                | (Error, Idle)
                | (Capturing | Composing | Printing, Error)
        )
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => DeviceState::Capturing,
            2 => DeviceState::Composing,
            3 => DeviceState::Printing,
            4 => DeviceState::Error,
            _ => DeviceState::Idle,
        }
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// DeviceStateCell
// ---------------------------------------------------------------------------

/// Lock-free holder for the current [`DeviceState`].
///
/// Only the run that won [`try_begin`](Self::try_begin) writes to it until
/// that run finalizes; everyone else only reads.
#[derive(Debug, Default)]
pub struct DeviceStateCell(AtomicU8);

impl DeviceStateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(DeviceState::Idle as u8))
    }

    pub fn get(&self) -> DeviceState {
        DeviceState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Atomically move `Idle → Capturing`.  Returns `false` if any run is
    /// already in flight.
    pub fn try_begin(&self) -> bool {
        self.0
            .compare_exchange(
                DeviceState::Idle as u8,
                DeviceState::Capturing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Step along the state machine.  Illegal edges are logged and refused.
    pub fn advance(&self, next: DeviceState) -> bool {
        let current = self.get();
        if !current.can_transition_to(next) {
            log::warn!("pipeline: refusing transition {current} → {next}");
            return false;
        }
        self.0.store(next as u8, Ordering::Release);
        log::debug!("pipeline: {current} → {next}");
        true
    }

    /// Set unconditionally.  Used by finalize only.
    pub(crate) fn force(&self, state: DeviceState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn default_is_idle() {
        assert_eq!(DeviceState::default(), DeviceState::Idle);
        assert_eq!(DeviceStateCell::new().get(), DeviceState::Idle);
    }

    #[test]
    fn happy_path_edges_are_legal() {
        use DeviceState::*;
        assert!(Idle.can_transition_to(Capturing));
        assert!(Capturing.can_transition_to(Composing));
        assert!(Composing.can_transition_to(Printing));
        assert!(Printing.can_transition_to(Idle));
        assert!(Composing.can_transition_to(Error));
        assert!(Error.can_transition_to(Idle));
    }

    #[test]
    fn shortcuts_are_illegal() {
        use DeviceState::*;
        assert!(!Idle.can_transition_to(Composing));
        assert!(!Capturing.can_transition_to(Printing));
        assert!(!Printing.can_transition_to(Capturing));
        assert!(!Error.can_transition_to(Capturing));
    }

    #[test]
    fn label_matches_display() {
        assert_eq!(DeviceState::Composing.label(), "Composing");
        assert_eq!(DeviceState::Error.to_string(), "Error");
    }

    #[test]
    fn try_begin_only_from_idle() {
        let cell = DeviceStateCell::new();
        assert!(cell.try_begin());
        assert_eq!(cell.get(), DeviceState::Capturing);
        assert!(!cell.try_begin());

        cell.advance(DeviceState::Composing);
        assert!(!cell.try_begin());
        assert_eq!(cell.get(), DeviceState::Composing);
    }

    #[test]
    fn advance_refuses_illegal_edge() {
        let cell = DeviceStateCell::new();
        assert!(!cell.advance(DeviceState::Printing));
        assert_eq!(cell.get(), DeviceState::Idle);
    }

    #[test]
    fn exactly_one_thread_wins_the_race() {
        let cell = Arc::new(DeviceStateCell::new());
        let barrier = Arc::new(std::sync::Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    cell.try_begin()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
