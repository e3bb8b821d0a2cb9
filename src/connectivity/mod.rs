//! Connectivity monitor — background reachability polling with printed
//! banners on online/offline edges.
//!
//! * [`ReachabilityProbe`] / [`HttpProbe`] — one OR-over-hosts check.
//! * [`EdgeTracker`] — turns a stream of poll results into transitions.
//! * [`ConnectivityMonitor`] — the long-lived loop that owns both.
//! * [`ConnectivityStatus`] — published through a watch channel.

pub mod banner;
pub mod monitor;
pub mod probe;

pub use monitor::ConnectivityMonitor;
pub use probe::{HttpProbe, ProbeError, ReachabilityProbe};

use chrono::{DateTime, Local};

// ---------------------------------------------------------------------------
// ConnectivityStatus
// ---------------------------------------------------------------------------

/// Last known reachability.  Written only by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityStatus {
    pub online: bool,
    /// When `online` last flipped; `None` until the first edge.
    pub last_transition: Option<DateTime<Local>>,
}

impl Default for ConnectivityStatus {
    /// Assume online until the first poll says otherwise.
    fn default() -> Self {
        Self {
            online: true,
            last_transition: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Transition / EdgeTracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentOffline,
    CameOnline,
}

/// Remembers the previous poll result and reports only changes.
///
/// The first observation sets the baseline and reports nothing.
#[derive(Debug, Default)]
pub struct EdgeTracker {
    last: Option<bool>,
}

impl EdgeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a baseline has been recorded.
    pub fn is_primed(&self) -> bool {
        self.last.is_some()
    }

    pub fn observe(&mut self, online: bool) -> Option<Transition> {
        let previous = self.last.replace(online)?;
        match (previous, online) {
            (true, false) => Some(Transition::WentOffline),
            (false, true) => Some(Transition::CameOnline),
            _ => None,
        }
    }
}
