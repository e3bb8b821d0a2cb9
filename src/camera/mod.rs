//! Still camera.
//!
//! The camera is powered only for the duration of one capture run.  The
//! pipeline drives the lifecycle:
//!
//! ```text
//! power_on ──warm-up──▶ capture_to(path) ──▶ power_off   (always)
//! ```
//!
//! [`CommandCamera`] shells out to `rpicam-still`; tests use their own
//! [`Camera`] doubles.

pub mod command;

pub use command::CommandCamera;

use std::path::{Path, PathBuf};

use thiserror::Error;

// ---------------------------------------------------------------------------
// CameraError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera could not be started: {0}")]
    PowerOn(String),

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("capture produced no image at {0}")]
    NoImage(String),

    #[error("camera did not respond within {0:?}")]
    Timeout(std::time::Duration),

    #[error("camera I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Camera trait
// ---------------------------------------------------------------------------

/// Exclusive still camera.
///
/// Exclusivity is guaranteed by the pipeline's device state, not by the
/// implementation: at most one run calls these methods at a time.
pub trait Camera: Send + Sync {
    /// Bring the sensor up.
    fn power_on(&self) -> Result<(), CameraError>;

    /// Capture one JPEG frame into `path`.
    fn capture_to(&self, path: &Path) -> Result<(), CameraError>;

    /// Release the sensor.  Called on every path out of a capture.
    fn power_off(&self);
}

// ---------------------------------------------------------------------------
// CaptureArtifact
// ---------------------------------------------------------------------------

/// One captured frame, owned by the run that produced it.
///
/// The working file is removed when the artifact is dropped.
#[derive(Debug)]
pub struct CaptureArtifact {
    /// Raw JPEG bytes.
    pub bytes: Vec<u8>,
    /// Where the frame was written.
    pub path: PathBuf,
}

impl CaptureArtifact {
    /// Read a frame the camera just wrote.
    pub fn read_from(path: &Path) -> Result<Self, CameraError> {
        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Err(CameraError::NoImage(path.display().to_string()));
        }
        Ok(Self {
            bytes,
            path: path.to_path_buf(),
        })
    }

    /// Build an artifact from bytes already in memory.
    pub fn from_bytes(bytes: Vec<u8>, path: impl Into<PathBuf>) -> Self {
        Self {
            bytes,
            path: path.into(),
        }
    }
}

impl Drop for CaptureArtifact {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                log::debug!("camera: could not remove {}: {e}", self.path.display());
            }
        }
    }
}
