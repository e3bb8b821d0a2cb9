//! [`NetworkManager`] backed by the `nmcli` command-line tool.
//!
//! Mutating commands run through `sudo` unless disabled.  Output is read in
//! terse mode (`-t`), where fields are separated by `:` and literal colons
//! are escaped as `\:`.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{connection_name, NetworkError, NetworkManager, VisibleNetwork};

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);
const SCAN_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct NmcliNetworkManager {
    program: String,
    sudo: bool,
    /// Access-point profile; hidden from scan results.
    ap_profile: String,
}

impl NmcliNetworkManager {
    pub fn new(ap_profile: impl Into<String>) -> Self {
        Self {
            program: "nmcli".into(),
            sudo: true,
            ap_profile: ap_profile.into(),
        }
    }

    /// Run mutating commands without `sudo` (e.g. when already root).
    pub fn without_sudo(mut self) -> Self {
        self.sudo = false;
        self
    }

    async fn run(
        &self,
        args: &[&str],
        privileged: bool,
        limit: Duration,
    ) -> Result<String, NetworkError> {
        let (program, args): (&str, Vec<&str>) = if privileged && self.sudo {
            let mut full = vec![self.program.as_str()];
            full.extend_from_slice(args);
            ("sudo", full)
        } else {
            (self.program.as_str(), args.to_vec())
        };
        let command = format!("{program} {}", args.join(" "));
        log::debug!("network: {command}");

        let output = tokio::time::timeout(limit, Command::new(program).args(&args).output())
            .await
            .map_err(|_| NetworkError::Timeout {
                command: command.clone(),
                secs: limit.as_secs(),
            })?
            .map_err(|source| NetworkError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(NetworkError::Failed { command, stderr });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl NetworkManager for NmcliNetworkManager {
    async fn connection_up(&self, name: &str) -> Result<(), NetworkError> {
        self.run(&["connection", "up", name], true, CONNECT_TIMEOUT)
            .await
            .map(|_| ())
    }

    async fn connection_down(&self, name: &str) -> Result<(), NetworkError> {
        self.run(&["connection", "down", name], true, SCAN_TIMEOUT)
            .await
            .map(|_| ())
    }

    async fn active_connections(&self) -> Result<Vec<String>, NetworkError> {
        let out = self
            .run(
                &["-t", "-f", "NAME,TYPE", "connection", "show", "--active"],
                false,
                QUERY_TIMEOUT,
            )
            .await?;
        Ok(parse_active(&out))
    }

    async fn scan_networks(&self) -> Result<Vec<VisibleNetwork>, NetworkError> {
        if let Err(e) = self
            .run(&["device", "wifi", "rescan"], true, SCAN_TIMEOUT)
            .await
        {
            // A rescan is refused while one is already running; the list
            // below is still valid.
            log::debug!("network: rescan skipped ({e})");
        }
        let out = self
            .run(
                &["-t", "-f", "SSID,SIGNAL,SECURITY", "device", "wifi", "list"],
                false,
                SCAN_TIMEOUT,
            )
            .await?;
        Ok(parse_wifi_list(&out, &self.ap_profile))
    }

    async fn add_profile(&self, ssid: &str, password: &str) -> Result<String, NetworkError> {
        let name = connection_name(ssid);
        self.run(
            &["device", "wifi", "connect", ssid, "password", password, "name", name.as_str()],
            true,
            CONNECT_TIMEOUT,
        )
        .await?;
        log::info!("network: saved and joined {ssid}");
        Ok(name)
    }

    async fn remove_profile(&self, ssid: &str) -> Result<(), NetworkError> {
        let name = connection_name(ssid);
        self.run(&["connection", "delete", name.as_str()], true, SCAN_TIMEOUT)
            .await?;
        log::info!("network: forgot {ssid}");
        Ok(())
    }

    async fn modify_credentials(&self, ssid: &str, password: &str) -> Result<(), NetworkError> {
        let name = connection_name(ssid);
        self.run(
            &["connection", "modify", name.as_str(), "wifi-sec.psk", password],
            true,
            SCAN_TIMEOUT,
        )
        .await
        .map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Terse output parsing
// ---------------------------------------------------------------------------

/// Split one `nmcli -t` line on unescaped colons.
fn split_terse(line: &str) -> Vec<String> {
    let mut fields = vec![String::new()];
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    if let Some(last) = fields.last_mut() {
                        last.push(next);
                    }
                }
            }
            ':' => fields.push(String::new()),
            _ => {
                if let Some(last) = fields.last_mut() {
                    last.push(c);
                }
            }
        }
    }
    fields
}

fn parse_active(out: &str) -> Vec<String> {
    out.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| split_terse(l).into_iter().next())
        .filter(|name| !name.is_empty())
        .collect()
}

fn parse_wifi_list(out: &str, hide: &str) -> Vec<VisibleNetwork> {
    let mut seen = HashSet::new();
    let mut networks: Vec<VisibleNetwork> = out
        .lines()
        .map(split_terse)
        .filter(|f| f.len() >= 3)
        .filter_map(|f| {
            let ssid = f[0].trim().to_string();
            if ssid.is_empty() || ssid == hide || !seen.insert(ssid.clone()) {
                return None;
            }
            let security = match f[2].trim() {
                "" | "--" => "Open".to_string(),
                s => s.to_string(),
            };
            Some(VisibleNetwork {
                ssid,
                signal: f[1].trim().parse().unwrap_or(0),
                security,
            })
        })
        .collect();
    networks.sort_by(|a, b| b.signal.cmp(&a.signal));
    networks
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
