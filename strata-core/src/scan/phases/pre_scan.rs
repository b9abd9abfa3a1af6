use strata_model::{ScanEventType, UNORDERED};
use tracing::{info, warn};

use crate::error::Result;
use crate::scan::context::ScanContext;
use crate::scan::helper::ScanHelper;

/// What PreScan changed before the walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreScanReport {
    /// Markers reset for a full rebuild.
    pub reset_entries: u64,
    /// Rows left non-present by an interrupted run and removed now.
    pub leftover_expunged: u64,
    pub folders_disabled: usize,
    pub folders_renumbered: bool,
}

/// Preconditions checked before anything is written.
#[derive(Debug)]
pub struct PreScan<'a> {
    helper: &'a ScanHelper,
    ctx: &'a ScanContext,
}

impl<'a> PreScan<'a> {
    /// Bind the phase to one run.
    pub fn new(helper: &'a ScanHelper, ctx: &'a ScanContext) -> Self {
        Self { helper, ctx }
    }

    /// Open the index session, clear leftovers and check folders.
    pub async fn run(&self) -> Result<PreScanReport> {
        let ports = self.helper.ports();
        let mut report = PreScanReport::default();

        ports.index.start_write_session().await?;

        if self.ctx.ignore_timestamps() {
            report.reset_entries = ports.catalog.reset_scan_markers().await?;
            let purged = ports.aggregates.purge_artists().await?;
            ports.index.clear().await?;
            info!(
                target: "scan::phase",
                run_id = %self.ctx.run_id,
                reset = report.reset_entries,
                purged_artists = purged,
                "full rebuild requested, markers reset and index cleared"
            );
        }

        ports.folder_cache.disable();
        ports.folder_cache.clear();

        if ports.catalog.count_non_present().await? > 0 {
            let stats = self.helper.expunge_non_present().await?;
            report.leftover_expunged = stats.deleted_rows;
        }

        self.helper
            .write_event(self.ctx, ScanEventType::BeforeScan, None)
            .await?;

        self.check_folders(&mut report).await?;
        self.helper
            .write_event(self.ctx, ScanEventType::MusicFolderCheck, None)
            .await?;
        Ok(report)
    }

    async fn check_folders(&self, report: &mut PreScanReport) -> Result<()> {
        let repository = &self.helper.ports().folders;
        let mut folders = repository.all_folders().await?;

        for folder in folders.iter_mut().filter(|folder| folder.enabled) {
            let is_dir = tokio::fs::metadata(&folder.path)
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            if is_dir {
                continue;
            }
            warn!(
                target: "scan::phase",
                folder = %folder.name,
                path = %folder.path.display(),
                "music folder missing or not a directory, disabling"
            );
            folder.enabled = false;
            folder.changed = self.ctx.scan_date;
            repository.update_folder(folder).await?;
            report.folders_disabled += 1;
        }

        if folders.iter().any(|folder| folder.order == UNORDERED) {
            folders.sort_by_key(|folder| (folder.order == UNORDERED, folder.order, folder.id));
            for (position, folder) in folders.iter_mut().enumerate() {
                folder.order = position as i32 + 1;
                folder.changed = self.ctx.scan_date;
                repository.update_folder(folder).await?;
            }
            report.folders_renumbered = true;
        }

        if report.folders_disabled > 0 || report.folders_renumbered {
            self.helper.ports().folder_cache.clear();
        }
        Ok(())
    }
}
