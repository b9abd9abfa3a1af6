//! Process-wide maintenance lock shared by scans, expunge and podcast refresh.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use parking_lot::Mutex;
use strata_model::ScanEventType;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Operations that need exclusive access to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceKind {
    Scan,
    Expunge,
    PodcastRefresh,
}

#[derive(Debug, Clone, Copy)]
struct Holder {
    kind: MaintenanceKind,
    scan_date: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LockSlot {
    holder: Option<Holder>,
    /// Timestamp handed to the previous holder, kept after release so the
    /// next one is strictly later.
    previous: Option<DateTime<Utc>>,
}

/// Lock, logical scan timestamp, processed counter and the two stop flags.
///
/// Cancel is per run and reset on every acquisition. Shutdown is set once
/// for the process and never cleared.
#[derive(Debug, Default)]
pub struct ScanState {
    slot: Mutex<LockSlot>,
    processed: AtomicU64,
    cancel: AtomicBool,
    shutdown: CancellationToken,
    last_phase: Mutex<Option<ScanEventType>>,
}

impl ScanState {
    /// Idle state, shared.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Non-blocking. On success stamps a fresh scan timestamp, resets the
    /// processed counter and any stale cancel request.
    pub fn try_acquire(self: &Arc<Self>, kind: MaintenanceKind) -> Option<ScanLockGuard> {
        if self.is_destroyed() {
            return None;
        }
        let mut slot = self.slot.lock();
        if let Some(holder) = slot.holder {
            debug!(target: "scan::state", requested = ?kind, held_by = ?holder.kind, "maintenance lock busy");
            return None;
        }

        let mut scan_date = Utc::now().trunc_subsecs(3);
        if let Some(previous) = slot.previous
            && scan_date <= previous
        {
            scan_date = previous + TimeDelta::milliseconds(1);
        }
        slot.holder = Some(Holder { kind, scan_date });
        slot.previous = Some(scan_date);
        drop(slot);

        self.processed.store(0, Ordering::SeqCst);
        self.cancel.store(false, Ordering::SeqCst);
        if kind == MaintenanceKind::Scan {
            *self.last_phase.lock() = None;
        }
        info!(target: "scan::state", ?kind, %scan_date, "maintenance lock acquired");

        Some(ScanLockGuard {
            state: Arc::clone(self),
            kind,
            scan_date,
        })
    }

    /// Clears the holder and counter. Called by [`ScanLockGuard`] on drop.
    fn release(&self) {
        let released = self.slot.lock().holder.take();
        self.processed.store(0, Ordering::SeqCst);
        if let Some(holder) = released {
            info!(target: "scan::state", kind = ?holder.kind, scan_date = %holder.scan_date, "maintenance lock released");
        }
    }

    /// Whether any maintenance operation holds the lock.
    pub fn is_active(&self) -> bool {
        self.slot.lock().holder.is_some()
    }

    pub fn active_kind(&self) -> Option<MaintenanceKind> {
        self.slot.lock().holder.map(|holder| holder.kind)
    }

    /// Whether the holder is a scan.
    pub fn is_scanning(&self) -> bool {
        self.active_kind() == Some(MaintenanceKind::Scan)
    }

    /// Timestamp of the current holder.
    pub fn scan_date(&self) -> Option<DateTime<Utc>> {
        self.slot.lock().holder.map(|holder| holder.scan_date)
    }

    /// Count one visited entry and return the new total.
    pub fn increment_processed(&self) -> u64 {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Flag the current holder for cancellation. Ignored when idle.
    pub fn request_cancel(&self) {
        if self.is_active() {
            self.cancel.store(true, Ordering::SeqCst);
        }
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Process teardown. In-flight work stops at its next checkpoint and no
    /// new holder is admitted.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Whether [`Self::shutdown`] has been called.
    pub fn is_destroyed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Token cancelled on shutdown, for sleeps that should end early.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn set_last_phase(&self, phase: ScanEventType) {
        *self.last_phase.lock() = Some(phase);
    }

    pub fn last_phase(&self) -> Option<ScanEventType> {
        *self.last_phase.lock()
    }
}

/// Holding this value is holding the maintenance lock.
#[derive(Debug)]
pub struct ScanLockGuard {
    state: Arc<ScanState>,
    kind: MaintenanceKind,
    scan_date: DateTime<Utc>,
}

impl ScanLockGuard {
    pub fn kind(&self) -> MaintenanceKind {
        self.kind
    }

    pub fn scan_date(&self) -> DateTime<Utc> {
        self.scan_date
    }
}

impl Drop for ScanLockGuard {
    fn drop(&mut self) {
        self.state.release();
    }
}
