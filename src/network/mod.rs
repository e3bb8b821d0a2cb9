//! Network manager collaborator and the access-point mode controller.
//!
//! * [`NetworkManager`] — async trait over the OS network manager.
//! * [`NmcliNetworkManager`] — `nmcli`-backed implementation.
//! * [`ApModeController`] — brings the setup access point up on a long
//!   hold and answers "is AP mode on?" from a short-lived cache.

pub mod ap_mode;
pub mod nmcli;

pub use ap_mode::{ApModeController, ApModeState};
pub use nmcli::NmcliNetworkManager;

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// NetworkError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed: {stderr}")]
    Failed { command: String, stderr: String },

    #[error("`{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("activation already in progress")]
    AlreadyInProgress,
}

// ---------------------------------------------------------------------------
// VisibleNetwork
// ---------------------------------------------------------------------------

/// One Wi-Fi network seen by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleNetwork {
    pub ssid: String,
    /// 0–100.
    pub signal: u8,
    /// `"Open"` when the network has no security.
    pub security: String,
}

// ---------------------------------------------------------------------------
// NetworkManager trait
// ---------------------------------------------------------------------------

/// Operations the appliance needs from the OS network manager.
#[async_trait]
pub trait NetworkManager: Send + Sync {
    /// Bring the named connection profile up.
    async fn connection_up(&self, name: &str) -> Result<(), NetworkError>;

    /// Tear the named connection profile down.
    async fn connection_down(&self, name: &str) -> Result<(), NetworkError>;

    /// Names of the currently active connections.
    async fn active_connections(&self) -> Result<Vec<String>, NetworkError>;

    /// Rescan and list visible networks, strongest first.
    async fn scan_networks(&self) -> Result<Vec<VisibleNetwork>, NetworkError>;

    /// Save and join a new network.  Returns the connection name.
    async fn add_profile(&self, ssid: &str, password: &str) -> Result<String, NetworkError>;

    /// Forget a saved network.
    async fn remove_profile(&self, ssid: &str) -> Result<(), NetworkError>;

    /// Replace the password of a saved network.
    async fn modify_credentials(&self, ssid: &str, password: &str) -> Result<(), NetworkError>;
}

/// Saved-profile name for `ssid`.
///
/// ```
/// use poetry_camera::network::connection_name;
///
/// assert_eq!(connection_name("Cafe Guest"), "Cafe_Guest");
/// ```
pub fn connection_name(ssid: &str) -> String {
    ssid.replace(' ', "_")
}
