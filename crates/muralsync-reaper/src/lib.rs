//! Fixed-period session reaper for muralsync.
//!
//! [`ActivityReaper`] decides *when* to sweep; the store decides *what* is
//! evictable. The reaper never looks at sessions itself, it only calls
//! [`SessionStore::sweep`], so the periodic path and the lazy lookup path
//! share one eviction rule.
//!
//! # Disabled mode
//!
//! A zero `period` disables the timer: [`ActivityReaper::wait_for_sweep`]
//! pends forever and eviction happens only lazily on lookup or
//! opportunistically on create.
//!
//! # Integration
//!
//! The reaper sits inside the engine actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => { /* handle command */ }
//!         _ = reaper.wait_for_sweep() => {
//!             reaper.sweep(router.store_mut());
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use muralsync_protocol::SessionCode;
use muralsync_session::SessionStore;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the reaper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Time between sweeps. Zero disables the timer.
    pub period: Duration,
    /// Random delay (0 to this) added to the *first* sweep only.
    pub initial_jitter: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(60),
            initial_jitter: Duration::from_secs(1),
        }
    }
}

impl ReaperConfig {
    /// Shortest non-zero period accepted.
    pub const MIN_PERIOD: Duration = Duration::from_millis(100);

    /// A config with the given period and no jitter.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            initial_jitter: Duration::ZERO,
        }
    }

    /// A config whose timer never fires.
    pub fn disabled() -> Self {
        Self::with_period(Duration::ZERO)
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`ActivityReaper::new`]. A non-zero `period`
    /// below [`Self::MIN_PERIOD`] is raised to it; jitter is capped at one
    /// period.
    pub fn validated(mut self) -> Self {
        if !self.period.is_zero() && self.period < Self::MIN_PERIOD {
            warn!(
                period_ms = self.period.as_millis() as u64,
                min_ms = Self::MIN_PERIOD.as_millis() as u64,
                "reaper period below minimum, clamping"
            );
            self.period = Self::MIN_PERIOD;
        }
        if !self.period.is_zero() && self.initial_jitter > self.period {
            self.initial_jitter = self.period;
        }
        self
    }

    /// Whether the periodic timer is off.
    pub fn is_disabled(&self) -> bool {
        self.period.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Running totals since the reaper was created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaperMetrics {
    pub total_sweeps: u64,
    pub total_reaped: u64,
    /// Sessions removed by the most recent sweep.
    pub last_reaped: usize,
}

// ---------------------------------------------------------------------------
// Reaper
// ---------------------------------------------------------------------------

/// Drives periodic sweeps of a [`SessionStore`].
pub struct ActivityReaper {
    period: Duration,
    /// When the next sweep should fire. `None` when disabled or paused.
    next_sweep: Option<Instant>,
    metrics: ReaperMetrics,
}

impl ActivityReaper {
    pub fn new(config: ReaperConfig) -> Self {
        let config = config.validated();

        let next_sweep = (!config.is_disabled()).then(|| {
            let jitter = if config.initial_jitter.is_zero() {
                Duration::ZERO
            } else {
                let max_ms = config.initial_jitter.as_millis().max(1) as u64;
                Duration::from_millis(rand::rng().random_range(0..max_ms))
            };
            Instant::now() + config.period + jitter
        });

        if next_sweep.is_none() {
            debug!("reaper created with periodic sweeps disabled");
        } else {
            debug!(period_secs = config.period.as_secs_f64(), "reaper created");
        }

        Self {
            period: config.period,
            next_sweep,
            metrics: ReaperMetrics::default(),
        }
    }

    /// Waits until the next sweep is due.
    ///
    /// Pends forever when disabled or paused, so it is safe as a
    /// `tokio::select!` branch. Cancel-safe: the deadline only advances
    /// once the sleep has completed.
    pub async fn wait_for_sweep(&mut self) {
        let Some(next) = self.next_sweep else {
            return std::future::pending().await;
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(next);
        if late_by > self.period {
            warn!(
                late_ms = late_by.as_millis() as u64,
                "reaper fell behind, skipping missed sweeps"
            );
        }
        // Always schedule from now, not from the missed deadline.
        self.next_sweep = Some(now + self.period);
    }

    /// Runs one sweep against `store` and records the outcome.
    pub fn sweep<S: SessionStore + ?Sized>(&mut self, store: &mut S) -> Vec<SessionCode> {
        let reaped = store.sweep();

        self.metrics.total_sweeps += 1;
        self.metrics.total_reaped += reaped.len() as u64;
        self.metrics.last_reaped = reaped.len();

        if !reaped.is_empty() {
            info!(reaped = reaped.len(), "reaped inactive sessions");
        }
        reaped
    }

    /// Stops the timer for good. Idempotent.
    pub fn pause(&mut self) {
        if self.next_sweep.take().is_some() {
            debug!(sweeps = self.metrics.total_sweeps, "reaper paused");
        }
    }

    pub fn metrics(&self) -> &ReaperMetrics {
        &self.metrics
    }
}
