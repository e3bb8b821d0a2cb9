//! Printer transport that talks to the local printer service over HTTP.
//!
//! The service accepts `POST {"text": "..."}` and handles the printer's own
//! byte protocol.  A `GET` on the same URL returns a status object whose
//! `"ready"` field says whether it can print yet.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ConfigSource;

use super::{PrintError, Printer};

#[derive(Clone)]
enum Target {
    Fixed { url: String, timeout: Duration },
    /// `printer.url` / `printer.timeout_secs`, read per job.
    Configured(Arc<dyn ConfigSource>),
}

#[derive(Clone)]
pub struct HttpPrinter {
    http: reqwest::Client,
    target: Target,
}

impl HttpPrinter {
    /// Printer service at a fixed address.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            target: Target::Fixed {
                url: url.into(),
                timeout,
            },
        }
    }

    /// Printer service selected by the current configuration on each job.
    pub fn from_config(config: Arc<dyn ConfigSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            target: Target::Configured(config),
        }
    }

    fn resolve(&self) -> (String, Duration) {
        match &self.target {
            Target::Fixed { url, timeout } => (url.clone(), *timeout),
            Target::Configured(config) => {
                let printer = config.snapshot().printer;
                (printer.url, Duration::from_secs(printer.timeout_secs))
            }
        }
    }
}

#[async_trait]
impl Printer for HttpPrinter {
    async fn print(&self, text: &str) -> Result<(), PrintError> {
        let (url, timeout) = self.resolve();
        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PrintError::Timeout(timeout.as_secs())
                } else {
                    PrintError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PrintError::Rejected {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        log::debug!("printer: service replied {status}: {}", body.trim());
        Ok(())
    }

    async fn ready(&self) -> Result<bool, PrintError> {
        let (url, timeout) = self.resolve();
        let response = self
            .http
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PrintError::Timeout(timeout.as_secs())
                } else {
                    PrintError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(PrintError::Rejected {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let ready = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("ready").and_then(serde_json::Value::as_bool))
            .unwrap_or(false);
        Ok(ready)
    }
}
