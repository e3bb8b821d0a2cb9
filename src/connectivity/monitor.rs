//! The connectivity loop.
//!
//! ```text
//! every interval:
//!   probe (up to `attempts` times, `retry_delay_ms` apart)
//!   EdgeTracker::observe
//!     ├─ first poll      → baseline (+ optional startup greeting)
//!     ├─ online→offline  → offline banner
//!     ├─ offline→online  → back-online banner
//!     └─ unchanged       → nothing
//!   publish ConnectivityStatus, drive network LED
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, ConfigSource};
use crate::indicator::{LedMode, StatusIndicator};
use crate::pipeline::DeviceStateCell;
use crate::printer::PrintDispatcher;

use super::banner::{offline_banner, online_banner, startup_banner};
use super::probe::{ProbeError, ReachabilityProbe};
use super::{ConnectivityStatus, EdgeTracker, Transition};

pub struct ConnectivityMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    dispatcher: Arc<PrintDispatcher>,
    device: Arc<DeviceStateCell>,
    config: Arc<dyn ConfigSource>,
    network_led: Option<Arc<StatusIndicator>>,
    tracker: Mutex<EdgeTracker>,
    status: watch::Sender<ConnectivityStatus>,
}

impl ConnectivityMonitor {
    /// `device` is read only, for the diagnostic line of the offline banner.
    pub fn new(
        probe: Arc<dyn ReachabilityProbe>,
        dispatcher: Arc<PrintDispatcher>,
        device: Arc<DeviceStateCell>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        let (status, _) = watch::channel(ConnectivityStatus::default());
        Self {
            probe,
            dispatcher,
            device,
            config,
            network_led: None,
            tracker: Mutex::new(EdgeTracker::new()),
            status,
        }
    }

    /// Mirror reachability on a second LED.
    pub fn with_network_led(mut self, led: Arc<StatusIndicator>) -> Self {
        self.network_led = Some(led);
        self
    }

    pub fn status(&self) -> ConnectivityStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.status.subscribe()
    }

    /// Poll on the configured interval until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let secs = self.config.snapshot().connectivity.interval_secs.max(1);
        let interval = Duration::from_secs(secs);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!("connectivity: polling every {}s", interval.as_secs());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                _ = cancel.cancelled() => {
                    log::info!("connectivity: monitor shutting down");
                    break;
                }
            }
        }
    }

    /// One poll: probe, track the edge, print if it changed.
    pub async fn poll_once(&self) -> Option<Transition> {
        let cfg = self.config.snapshot();
        let result = self.check(&cfg).await;
        let online = result.is_ok();

        let (baseline, transition) = {
            let mut tracker = self.lock_tracker();
            let baseline = !tracker.is_primed();
            (baseline, tracker.observe(online))
        };

        self.show(online);
        if transition.is_some() {
            self.status.send_replace(ConnectivityStatus {
                online,
                last_transition: Some(Local::now()),
            });
        } else if baseline {
            self.status.send_modify(|s| s.online = online);
        }

        if baseline {
            log::info!(
                "connectivity: initially {}",
                if online { "online" } else { "offline" }
            );
            if cfg.connectivity.startup_banner {
                let text = startup_banner(online, &cfg.ap_mode, &cfg.shutter);
                let _ = self.dispatcher.dispatch_raw(&text).await;
            }
        }

        match (transition, result) {
            (Some(Transition::WentOffline), Err(e)) => {
                log::warn!("connectivity: offline ({e})");
                let text = offline_banner(
                    Local::now(),
                    &e.to_string(),
                    cfg.fallback.diagnostic_max_chars,
                    self.device.get(),
                    &cfg.ap_mode,
                    &cfg.shutter,
                );
                let _ = self.dispatcher.dispatch_raw(&text).await;
            }
            (Some(Transition::CameOnline), _) => {
                log::info!("connectivity: back online");
                let text = online_banner(Local::now());
                let _ = self.dispatcher.dispatch_raw(&text).await;
            }
            _ => {}
        }

        transition
    }

    async fn check(&self, cfg: &AppConfig) -> Result<(), ProbeError> {
        let c = &cfg.connectivity;
        let timeout = Duration::from_secs(c.request_timeout_secs);
        let attempts = c.attempts.max(1);

        let mut last = ProbeError::NoHosts;
        for attempt in 1..=attempts {
            match self.probe.probe(&c.hosts, timeout).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    log::debug!("connectivity: attempt {attempt}/{attempts} failed: {e}");
                    last = e;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(c.retry_delay_ms)).await;
            }
        }
        Err(last)
    }

    fn show(&self, online: bool) {
        if let Some(led) = &self.network_led {
            led.set_mode(if online {
                LedMode::SolidOn
            } else {
                LedMode::SEARCHING
            });
        }
    }

    fn lock_tracker(&self) -> std::sync::MutexGuard<'_, EdgeTracker> {
        match self.tracker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticConfigSource;
    use crate::testing::RecordingPrinter;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers from a script; `true` = reachable.  Repeats the last answer
    /// once the script runs out.
    struct ScriptedProbe {
        script: Mutex<VecDeque<bool>>,
        last: Mutex<bool>,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(script: &[bool]) -> Self {
            Self {
                script: Mutex::new(script.iter().copied().collect()),
                last: Mutex::new(true),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReachabilityProbe for ScriptedProbe {
        async fn probe(&self, _hosts: &[String], _timeout: Duration) -> Result<(), ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.script.lock().unwrap().pop_front() {
                *last = next;
            }
            if *last {
                Ok(())
            } else {
                Err(ProbeError::Unreachable {
                    host: "https://www.google.com".into(),
                    reason: "dns error".into(),
                })
            }
        }
    }

    struct Rig {
        monitor: ConnectivityMonitor,
        probe: Arc<ScriptedProbe>,
        printer: Arc<RecordingPrinter>,
        led: Arc<StatusIndicator>,
    }

    fn rig(script: &[bool], attempts: u32, startup_banner: bool) -> Rig {
        let mut cfg = AppConfig::default();
        cfg.connectivity.attempts = attempts;
        cfg.connectivity.retry_delay_ms = 0;
        cfg.connectivity.startup_banner = startup_banner;
        let config: Arc<dyn ConfigSource> = Arc::new(StaticConfigSource(cfg));

        let probe = Arc::new(ScriptedProbe::new(script));
        let printer = Arc::new(RecordingPrinter::default());
        let dispatcher = Arc::new(PrintDispatcher::new(printer.clone(), Arc::clone(&config)));
        let led = Arc::new(StatusIndicator::disabled());
        let monitor = ConnectivityMonitor::new(
            probe.clone(),
            dispatcher,
            Arc::new(DeviceStateCell::new()),
            config,
        )
        .with_network_led(Arc::clone(&led));

        Rig {
            monitor,
            probe,
            printer,
            led,
        }
    }

    #[tokio::test]
    async fn only_edges_print_banners() {
        let rig = rig(&[true, true, false, false, true], 1, false);
        let mut edges = Vec::new();
        for _ in 0..5 {
            edges.extend(rig.monitor.poll_once().await);
        }

        assert_eq!(edges, vec![Transition::WentOffline, Transition::CameOnline]);
        let jobs = rig.printer.jobs();
        assert_eq!(jobs.len(), 2);
        assert!(jobs[0].contains("i am OFFLINE!"));
        assert!(jobs[1].contains("i am back ONLINE!"));
        assert!(rig.monitor.status().online);
    }

    #[tokio::test]
    async fn repeated_failures_print_one_offline_banner() {
        // Baseline online, then three polls of three failed attempts each.
        let rig = rig(&[true, false], 3, false);
        rig.monitor.poll_once().await;
        for _ in 0..3 {
            rig.monitor.poll_once().await;
        }

        assert_eq!(rig.probe.calls.load(Ordering::SeqCst), 1 + 3 * 3);
        let jobs = rig.printer.jobs();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].contains("(Error: https://www.google.com: dns error)"));
        assert!(jobs[0].contains("camera: Idle"));

        let status = rig.monitor.status();
        assert!(!status.online);
        assert!(status.last_transition.is_some());
        assert_eq!(rig.led.mode(), LedMode::SEARCHING);
    }

    #[tokio::test]
    async fn retry_success_counts_as_online() {
        let rig = rig(&[true, false, false, true], 3, false);
        rig.monitor.poll_once().await;
        assert_eq!(rig.monitor.poll_once().await, None);
        assert_eq!(rig.probe.calls.load(Ordering::SeqCst), 4);
        assert!(rig.printer.jobs().is_empty());
        assert_eq!(rig.led.mode(), LedMode::SolidOn);
    }

    #[tokio::test]
    async fn baseline_offline_prints_only_the_greeting() {
        let rig = rig(&[false], 1, true);
        assert_eq!(rig.monitor.poll_once().await, None);
        assert_eq!(rig.monitor.poll_once().await, None);

        let jobs = rig.printer.jobs();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].contains("but i'm OFFLINE!"));
        assert!(!rig.monitor.status().online);
        assert!(rig.monitor.status().last_transition.is_none());
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let rig = rig(&[true, false], 1, false);
        let mut rx = rig.monitor.subscribe();
        rig.monitor.poll_once().await;
        rig.monitor.poll_once().await;

        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().online);
    }

    #[tokio::test]
    async fn run_polls_until_cancelled() {
        let Rig { monitor, probe, .. } = rig(&[true], 1, false);
        let monitor = Arc::new(monitor);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(Arc::clone(&monitor).run(cancel.clone()));
        for _ in 0..100 {
            if probe.calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }
}
