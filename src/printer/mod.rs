//! Print dispatcher.
//!
//! [`PrintDispatcher`] appends the dated footer and hands the body to a
//! [`Printer`] transport.  Failures are logged and returned as values; the
//! caller decides whether to care (the pipeline does not).
//!
//! All dispatches go through one async lock, so a connectivity banner and a
//! poem never reach the printer service at the same time.
//!
//! At boot the printer service may still be starting;
//! [`PrintDispatcher::wait_ready`] polls [`Printer::ready`] until it answers.

pub mod http;

pub use http::HttpPrinter;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::ConfigSource;

// ---------------------------------------------------------------------------
// PrintError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("printer service unreachable: {0}")]
    Unreachable(String),

    #[error("printer service timed out after {0}s")]
    Timeout(u64),

    #[error("printer service rejected the job ({status}): {body}")]
    Rejected { status: u16, body: String },
}

// ---------------------------------------------------------------------------
// Printer trait
// ---------------------------------------------------------------------------

/// Local printer transport.  Receives the final body, footer included.
#[async_trait]
pub trait Printer: Send + Sync {
    async fn print(&self, text: &str) -> Result<(), PrintError>;

    /// Whether the transport can take a job right now.
    async fn ready(&self) -> Result<bool, PrintError> {
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Footer
// ---------------------------------------------------------------------------

/// `"\n\n<signature>, <Month DD, YYYY>"`.
pub fn footer(signature: &str, at: DateTime<Local>) -> String {
    format!("\n\n{}, {}", signature.trim(), at.format("%B %d, %Y"))
}

// ---------------------------------------------------------------------------
// PrintDispatcher
// ---------------------------------------------------------------------------

pub struct PrintDispatcher {
    printer: Arc<dyn Printer>,
    config: Arc<dyn ConfigSource>,
    in_flight: Mutex<()>,
}

impl PrintDispatcher {
    pub fn new(printer: Arc<dyn Printer>, config: Arc<dyn ConfigSource>) -> Self {
        Self {
            printer,
            config,
            in_flight: Mutex::new(()),
        }
    }

    /// Print `text` followed by the dated footer.
    pub async fn dispatch(&self, text: &str) -> Result<(), PrintError> {
        let signature = self.config.snapshot().printer.footer_signature;
        let body = format!("{}{}", text.trim_end(), footer(&signature, Local::now()));
        self.send(&body).await
    }

    /// Print `text` as-is (status banners).
    pub async fn dispatch_raw(&self, text: &str) -> Result<(), PrintError> {
        self.send(text).await
    }

    /// Poll the printer every `poll` until it reports ready or `limit`
    /// elapses.  Returns whether it became ready.
    pub async fn wait_ready(&self, limit: Duration, poll: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            match self.printer.ready().await {
                Ok(true) => return true,
                Ok(false) => log::debug!("printer: service not ready yet"),
                Err(e) => log::debug!("printer: readiness check failed: {e}"),
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }

    async fn send(&self, body: &str) -> Result<(), PrintError> {
        let _serial = self.in_flight.lock().await;
        log::info!("printer: sending {} chars", body.chars().count());
        log::debug!("printer: body:\n{body}");
        match self.printer.print(body).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("printer: {e}");
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
