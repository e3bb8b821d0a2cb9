//! Camera backed by the `rpicam-still` command-line tool.
//!
//! `rpicam-still` opens the sensor, runs its own preview-less warm-up and
//! writes one JPEG.  Power-on therefore only checks that the tool can be
//! executed; the sensor is actually live only inside `capture_to`.
//!
//! Every invocation is bounded: a tool that has not exited within the
//! configured timeout is killed and reported as [`CameraError::Timeout`].

use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use super::{Camera, CameraError};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct CommandCamera {
    program: String,
    timeout: Duration,
}

impl CommandCamera {
    /// `program` is usually `rpicam-still` or `libcamera-still`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(20),
        }
    }

    /// Kill the tool if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments for a single still: no preview, shortest sensor timeout,
    /// output to `path`.
    pub fn args(path: &Path) -> Vec<String> {
        vec![
            "--nopreview".into(),
            "--immediate".into(),
            "--timeout".into(),
            "1".into(),
            "--output".into(),
            path.display().to_string(),
        ]
    }

    /// Run the tool to completion.  `Ok(None)` means it was killed on
    /// timeout.
    fn run(&self, args: &[String]) -> std::io::Result<Option<Output>> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let deadline = Instant::now() + self.timeout;
        loop {
            if child.try_wait()?.is_some() {
                return child.wait_with_output().map(Some);
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    log::warn!("camera: could not kill {}: {e}", self.program);
                }
                let _ = child.wait();
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Camera for CommandCamera {
    fn power_on(&self) -> Result<(), CameraError> {
        match self.run(&["--version".to_string()]) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(CameraError::Timeout(self.timeout)),
            Err(e) => Err(CameraError::PowerOn(format!("{}: {e}", self.program))),
        }
    }

    fn capture_to(&self, path: &Path) -> Result<(), CameraError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let output = self
            .run(&Self::args(path))
            .map_err(|e| CameraError::Capture(format!("{}: {e}", self.program)))?
            .ok_or(CameraError::Timeout(self.timeout))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CameraError::Capture(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        if !path.exists() {
            return Err(CameraError::NoImage(path.display().to_string()));
        }
        Ok(())
    }

    fn power_off(&self) {
        // The tool releases the sensor when it exits.
        log::debug!("camera: released");
    }
}
