//! Operator-facing entry point: fire-and-forget scans, progress, cancel,
//! standalone expunge and shutdown.

use std::sync::Arc;

use parking_lot::Mutex;
use strata_model::{ScanEventType, ScanProgress};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::context::ScanPorts;
use super::helper::{ExpungeStats, ScanHelper};
use super::orchestrator::{ScanOrchestrator, ScanReport};
use super::state::{MaintenanceKind, ScanState};
use crate::error::Result;
use crate::settings::ScannerSettings;

/// Operator handle over one scan pipeline: runs, cancel, progress, expunge.
pub struct ScanService {
    state: Arc<ScanState>,
    orchestrator: Arc<ScanOrchestrator>,
    running: Mutex<Option<JoinHandle<ScanReport>>>,
}

impl std::fmt::Debug for ScanService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let task_pending = self
            .running
            .try_lock()
            .map(|slot| slot.as_ref().is_some_and(|task| !task.is_finished()))
            .unwrap_or(true);
        f.debug_struct("ScanService")
            .field("state", &self.state)
            .field("task_pending", &task_pending)
            .finish()
    }
}

impl ScanService {
    /// Wire `ports` and `settings` to a fresh lock and orchestrator.
    pub fn new(ports: ScanPorts, settings: ScannerSettings) -> Self {
        let state = ScanState::new();
        let helper = Arc::new(ScanHelper::new(state.clone(), ports, Arc::new(settings)));
        Self {
            state,
            orchestrator: Arc::new(ScanOrchestrator::new(helper)),
            running: Mutex::new(None),
        }
    }

    /// Shared lock and counters.
    pub fn state(&self) -> &Arc<ScanState> {
        &self.state
    }

    /// Queue a run on the runtime and return immediately. `false` when the
    /// maintenance lock is taken; the request is dropped, not queued.
    pub fn start_scan(&self) -> bool {
        let Some(guard) = self.state.try_acquire(MaintenanceKind::Scan) else {
            info!(target: "scan::state", "scan request dropped, maintenance in progress");
            return false;
        };
        let orchestrator = Arc::clone(&self.orchestrator);
        let task = tokio::spawn(async move { orchestrator.run_locked(guard).await });
        let previous = self.running.lock().replace(task);
        if let Some(previous) = previous
            && !previous.is_finished()
        {
            warn!(target: "scan::state", "replaced handle of a scan task still winding down");
        }
        true
    }

    /// Run a scan on the current task. `None` when the lock is taken.
    pub async fn run_scan(&self) -> Option<ScanReport> {
        self.orchestrator.run().await
    }

    /// Await the task started by [`Self::start_scan`], if any.
    pub async fn wait(&self) -> Option<ScanReport> {
        let task = self.running.lock().take()?;
        match task.await {
            Ok(report) => Some(report),
            Err(err) => {
                warn!(target: "scan::state", error = %err, "scan task ended abnormally");
                None
            }
        }
    }

    /// Ask the running scan to stop at its next checkpoint. No-op when idle.
    pub fn request_cancel(&self) {
        if self.state.is_scanning() {
            info!(target: "scan::state", "scan cancel requested");
            self.state.request_cancel();
        }
    }

    /// Whether a scan holds the maintenance lock.
    pub fn is_scanning(&self) -> bool {
        self.state.is_scanning()
    }

    /// Entries visited by the current run; zero when idle.
    pub fn processed_count(&self) -> u64 {
        self.state.processed()
    }

    /// Most recent phase or terminal tag reached.
    pub fn last_phase(&self) -> Option<ScanEventType> {
        self.state.last_phase()
    }

    /// Snapshot of scanning state and completed fraction.
    pub fn progress(&self) -> ScanProgress {
        let last_phase = self.state.last_phase();
        ScanProgress {
            scanning: self.state.is_scanning(),
            processed: self.state.processed(),
            scan_date: self.state.scan_date(),
            last_phase,
            fraction: ScanEventType::progress(last_phase),
        }
    }

    /// Presence-expunge outside a scan. `Ok(None)` when the lock is taken.
    pub async fn expunge(&self) -> Result<Option<ExpungeStats>> {
        let Some(_guard) = self.state.try_acquire(MaintenanceKind::Expunge) else {
            return Ok(None);
        };
        let helper = self.orchestrator.helper();
        let index = &helper.ports().index;

        index.start_write_session().await?;
        let result = async {
            let catalog = helper.expunge_non_present().await?;
            let aggregates = helper.expunge_aggregates().await?;
            Ok::<_, crate::error::ScanError>(ExpungeStats {
                index_removals: catalog.index_removals + aggregates.index_removals,
                deleted_rows: catalog.deleted_rows + aggregates.deleted_rows,
            })
        }
        .await;
        index.stop_write_session().await?;

        let stats = result?;
        info!(
            target: "scan::expunge",
            deleted = stats.deleted_rows,
            index_removals = stats.index_removals,
            "standalone expunge finished"
        );
        Ok(Some(stats))
    }

    /// Stop in-flight work at its next checkpoint and refuse new runs.
    pub async fn shutdown(&self) -> Option<ScanReport> {
        self.state.shutdown();
        self.wait().await
    }
}
