use chrono::TimeDelta;
use strata_model::ScanEventType;
use tracing::{info, warn};

use crate::error::Result;
use crate::scan::context::ScanContext;
use crate::scan::helper::ScanHelper;

/// What PostScan recorded before the terminal tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostScanReport {
    pub folders_counted: usize,
    pub playlists_imported: usize,
    pub audit_rows_rotated: u64,
    /// SUCCESS, CANCELED or DESTROYED.
    pub terminal: ScanEventType,
}

/// Statistics, index session close, playlist import and the terminal tag.
#[derive(Debug)]
pub struct PostScan<'a> {
    helper: &'a ScanHelper,
    ctx: &'a ScanContext,
}

impl<'a> PostScan<'a> {
    /// Bind the phase to one run.
    pub fn new(helper: &'a ScanHelper, ctx: &'a ScanContext) -> Self {
        Self { helper, ctx }
    }

    /// Release resources, import playlists, store statistics and finish the trail.
    pub async fn run(&self) -> Result<PostScanReport> {
        let ports = self.helper.ports();

        let folders_counted = self.run_stats().await?;
        self.helper
            .write_event(self.ctx, ScanEventType::RunStats, None)
            .await?;

        release_scan_resources(self.helper).await?;

        let playlists_imported = match ports.playlists.import_playlists().await {
            Ok(imported) => imported,
            Err(err) => {
                warn!(target: "scan::phase", error = %err, "playlist import failed");
                0
            }
        };
        self.helper
            .write_event(
                self.ctx,
                ScanEventType::ImportPlaylists,
                Some(playlists_imported.to_string()),
            )
            .await?;

        ports.catalog.checkpoint().await?;
        self.helper
            .write_event(self.ctx, ScanEventType::Checkpoint, None)
            .await?;
        self.helper
            .write_event(self.ctx, ScanEventType::AfterScan, None)
            .await?;

        let state = self.helper.state();
        let terminal = if state.is_destroyed() {
            ScanEventType::Destroyed
        } else if state.is_cancel_requested() {
            ScanEventType::Canceled
        } else {
            ScanEventType::Success
        };
        self.helper.write_event(self.ctx, terminal, None).await?;

        let audit_rows_rotated = self.rotate_audit().await?;
        info!(
            target: "scan::summary",
            run_id = %self.ctx.run_id,
            scan_date = %self.ctx.scan_date,
            processed = state.processed(),
            outcome = %terminal,
            "scan finished"
        );
        Ok(PostScanReport {
            folders_counted,
            playlists_imported,
            audit_rows_rotated,
            terminal,
        })
    }

    async fn run_stats(&self) -> Result<usize> {
        let ports = self.helper.ports();
        let every = self.helper.settings().batch.stats_checkpoint;
        let folders = ports.folders.all_folders().await?;
        let mut counted = 0;
        for folder in folders.iter().filter(|folder| folder.enabled) {
            let stats = ports
                .catalog
                .folder_statistics(folder.id, self.ctx.scan_date)
                .await?;
            ports.catalog.save_statistics(stats).await?;
            counted += 1;
            self.helper.throttle(counted, every).await?;
        }
        Ok(counted)
    }

    /// Keep only this run by default, otherwise everything newer than the
    /// retention window.
    async fn rotate_audit(&self) -> Result<u64> {
        let audit = &self.helper.ports().audit;
        match self.helper.settings().audit.retention_days {
            None => audit.delete_except(self.ctx.scan_date).await,
            Some(days) => {
                let cutoff = self.ctx.scan_date - TimeDelta::days(i64::from(days));
                audit.delete_before(cutoff).await
            }
        }
    }
}

/// Re-enable the folder cache, close the index session and drop per-run
/// collation state. Runs on every exit path of a scan.
pub(crate) async fn release_scan_resources(helper: &ScanHelper) -> Result<()> {
    let ports = helper.ports();
    ports.folder_cache.enable();
    ports.folder_cache.clear();
    let stopped = ports.index.stop_write_session().await;
    ports.collator.clear_cache();
    stopped
}
