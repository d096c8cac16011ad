//! Rate-limited, single-flight checkpoint refresh.
//!
//! A caller that finds a refresh already in flight treats it as its own and
//! returns immediately. A refresh the source reports as failed is an
//! integrity failure and terminates the process through the supervisor.

use notary_telemetry::{metric_inc, CHECKPOINT_REFRESHES};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{AdmissionConfig, NetworkType};
use crate::ports::outbound::{CheckpointSource, IntegritySupervisor, TimeSource, Timestamp};

/// What a `maybe_refresh` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Only mainnet carries external checkpoints.
    NotMainnet,
    /// Another caller holds the flag.
    InFlight,
    /// The interval has not elapsed since the last refresh.
    NotDue,
    /// Checkpoints were reloaded.
    Refreshed,
}

/// Releases the in-flight flag on every exit path.
struct FlightRelease<'a>(&'a AtomicBool);

impl Drop for FlightRelease<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Guards the external checkpoint source.
pub struct CheckpointGuard {
    network: NetworkType,
    interval_ms: u64,
    path: String,
    in_flight: AtomicBool,
    last_refresh: AtomicU64,
    source: Arc<dyn CheckpointSource>,
    time: Arc<dyn TimeSource>,
    supervisor: Arc<dyn IntegritySupervisor>,
}

impl CheckpointGuard {
    /// Create a guard. No refresh has happened yet, so the first due check passes.
    pub fn new(
        config: &AdmissionConfig,
        source: Arc<dyn CheckpointSource>,
        time: Arc<dyn TimeSource>,
        supervisor: Arc<dyn IntegritySupervisor>,
    ) -> Self {
        Self {
            network: config.network,
            interval_ms: config.checkpoint_refresh_interval_ms(),
            path: config.checkpoint_path.clone(),
            in_flight: AtomicBool::new(false),
            last_refresh: AtomicU64::new(0),
            source,
            time,
            supervisor,
        }
    }

    /// Refresh checkpoints if this node needs them and the interval elapsed.
    pub fn maybe_refresh(&self) -> RefreshOutcome {
        if self.network != NetworkType::Mainnet {
            return RefreshOutcome::NotMainnet;
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("[nc-06] checkpoint refresh already in flight");
            return RefreshOutcome::InFlight;
        }
        let _release = FlightRelease(&self.in_flight);

        let now = self.time.now();
        if now.saturating_sub(self.last_refresh()) < self.interval_ms {
            return RefreshOutcome::NotDue;
        }

        if !self.source.refresh(&self.path) {
            self.supervisor.integrity_fatal(&format!(
                "checkpoint refresh from {} failed; refusing to run on untrusted checkpoints",
                self.path
            ));
        }

        self.last_refresh.store(now, Ordering::Release);
        metric_inc!(CHECKPOINT_REFRESHES);
        info!("[nc-06] checkpoints refreshed from {}", self.path);
        RefreshOutcome::Refreshed
    }

    /// Time of the last successful refresh, zero if none.
    pub fn last_refresh(&self) -> Timestamp {
        self.last_refresh.load(Ordering::Acquire)
    }
}
