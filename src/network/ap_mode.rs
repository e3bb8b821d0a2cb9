//! Access-point mode controller.
//!
//! A long hold on the shutter calls [`ApModeController::activate`], which
//! brings the pre-provisioned setup profile up in a background task and
//! returns at once.  [`ApModeController::is_active`] answers from a cache
//! that is refreshed at most once per TTL window; callers that find the
//! cache stale at the same time share one query.
//!
//! Every activate/deactivate bumps a generation counter and clears the
//! cache, so a query that started before the change can never store its
//! (now stale) answer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::ConfigSource;

use super::{NetworkError, NetworkManager};

// ---------------------------------------------------------------------------
// ApModeState
// ---------------------------------------------------------------------------

/// Cached answer to "is the access point up?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApModeState {
    pub active: bool,
    pub cached_at: Instant,
}

impl ApModeState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() < ttl
    }
}

#[derive(Default)]
struct Cache {
    state: Option<ApModeState>,
    generation: u64,
}

// ---------------------------------------------------------------------------
// ApModeController
// ---------------------------------------------------------------------------

pub struct ApModeController {
    network: Arc<dyn NetworkManager>,
    config: Arc<dyn ConfigSource>,
    cache: Mutex<Cache>,
    /// Serialises cache refreshes so stale readers coalesce on one query.
    refresh: tokio::sync::Mutex<()>,
    activating: Arc<AtomicBool>,
    queries: AtomicU64,
}

impl ApModeController {
    pub fn new(network: Arc<dyn NetworkManager>, config: Arc<dyn ConfigSource>) -> Self {
        Self {
            network,
            config,
            cache: Mutex::new(Cache::default()),
            refresh: tokio::sync::Mutex::new(()),
            activating: Arc::new(AtomicBool::new(false)),
            queries: AtomicU64::new(0),
        }
    }

    // -----------------------------------------------------------------------
    // Activation
    // -----------------------------------------------------------------------

    /// Start bringing the access point up on `handle` and return
    /// immediately.  Returns `false` if an activation is already running.
    pub fn activate(self: &Arc<Self>, handle: &tokio::runtime::Handle) -> bool {
        let Some(claim) = self.claim() else {
            log::info!("ap-mode: activation already in progress");
            return false;
        };
        self.invalidate();

        let this = Arc::clone(self);
        handle.spawn(async move {
            let _claim = claim;
            if let Err(e) = this.bring_up().await {
                log::error!("ap-mode: activation failed: {e}");
            }
        });
        true
    }

    /// Bring the access point up and wait for the outcome.
    ///
    /// `Ok(true)` means the profile shows up in the active connection list.
    pub async fn activate_and_wait(&self) -> Result<bool, NetworkError> {
        let _claim = self.claim().ok_or(NetworkError::AlreadyInProgress)?;
        self.invalidate();
        self.bring_up().await
    }

    /// Tear the access point down.
    pub async fn deactivate(&self) -> Result<(), NetworkError> {
        let profile = self.config.snapshot().ap_mode.profile;
        let result = self.network.connection_down(&profile).await;
        self.invalidate();
        match &result {
            Ok(()) => log::info!("ap-mode: {profile} deactivated"),
            Err(e) => log::error!("ap-mode: could not deactivate {profile}: {e}"),
        }
        result
    }

    fn claim(&self) -> Option<ActivationClaim> {
        self.activating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ActivationClaim(Arc::clone(&self.activating)))
    }

    async fn bring_up(&self) -> Result<bool, NetworkError> {
        let ap = self.config.snapshot().ap_mode;
        log::info!("ap-mode: bringing up {}", ap.profile);

        let result = self.network.connection_up(&ap.profile).await;
        self.invalidate();
        result?;

        let active = self.network.active_connections().await?;
        let verified = active.iter().any(|name| name == &ap.profile);
        if verified {
            log::info!(
                "ap-mode: {} is up, dashboard at {}",
                ap.profile,
                ap.dashboard_url
            );
        } else {
            log::warn!(
                "ap-mode: {} reported up but is not in the active list",
                ap.profile
            );
        }
        Ok(verified)
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Whether the access point profile is active.
    ///
    /// Query failures answer `false` and are not cached.
    pub async fn is_active(&self) -> bool {
        let ttl = Duration::from_secs(self.config.snapshot().ap_mode.cache_ttl_secs);
        if let Some(active) = self.fresh(ttl) {
            return active;
        }

        let _refresh = self.refresh.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(active) = self.fresh(ttl) {
            return active;
        }

        let generation = self.lock_cache().generation;
        let profile = self.config.snapshot().ap_mode.profile;
        self.queries.fetch_add(1, Ordering::AcqRel);

        match self.network.active_connections().await {
            Ok(names) => {
                let active = names.iter().any(|name| name == &profile);
                let mut cache = self.lock_cache();
                if cache.generation == generation {
                    cache.state = Some(ApModeState {
                        active,
                        cached_at: Instant::now(),
                    });
                }
                active
            }
            Err(e) => {
                log::warn!("ap-mode: status query failed: {e}");
                false
            }
        }
    }

    /// Last cached state, if any.
    pub fn cached(&self) -> Option<ApModeState> {
        self.lock_cache().state
    }

    /// Number of status queries issued so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Acquire)
    }

    /// Drop the cached state.
    pub fn invalidate(&self) {
        let mut cache = self.lock_cache();
        cache.state = None;
        cache.generation += 1;
    }

    fn fresh(&self, ttl: Duration) -> Option<bool> {
        self.lock_cache()
            .state
            .filter(|s| s.is_fresh(ttl))
            .map(|s| s.active)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, Cache> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Held while an activation runs; releases the in-flight flag on drop.
struct ActivationClaim(Arc<AtomicBool>);

impl Drop for ActivationClaim {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
