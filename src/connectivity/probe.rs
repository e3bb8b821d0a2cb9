//! Reachability probe.
//!
//! One probe checks every configured host in order and succeeds as soon as
//! any of them answers with a 2xx status.  Retrying is the monitor's job.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("no probe hosts configured")]
    NoHosts,

    #[error("{host}: {reason}")]
    Unreachable { host: String, reason: String },
}

#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// `Ok` if at least one of `hosts` is reachable.  The error describes
    /// the last host that failed.
    async fn probe(&self, hosts: &[String], timeout: Duration) -> Result<(), ProbeError>;
}

/// `GET` each host until one answers.
#[derive(Clone, Default)]
pub struct HttpProbe {
    http: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self::default()
    }

    async fn check(&self, host: &str, timeout: Duration) -> Result<(), ProbeError> {
        let fail = |reason: String| ProbeError::Unreachable {
            host: host.to_string(),
            reason,
        };

        let response = self
            .http
            .get(host)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    fail(format!("timed out after {}s", timeout.as_secs()))
                } else {
                    fail(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(fail(format!("HTTP {}", status.as_u16())))
        }
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn probe(&self, hosts: &[String], timeout: Duration) -> Result<(), ProbeError> {
        let mut last = ProbeError::NoHosts;
        for host in hosts {
            match self.check(host, timeout).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    log::debug!("connectivity: {e}");
                    last = e;
                }
            }
        }
        Err(last)
    }
}
