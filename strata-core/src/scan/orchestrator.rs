//! Runs the fixed phase sequence under the maintenance lock and classifies
//! how the run ended.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use strata_model::ScanEventType;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::context::ScanContext;
use super::helper::ScanHelper;
use super::phases::{
    DirectoryScan, FileMetadataScan, Id3MetadataScan, PostScan, PreScan, post_scan,
};
use super::state::{MaintenanceKind, ScanLockGuard};
use crate::error::Result;

/// How a run ended. Maps one-to-one onto the terminal audit tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Success,
    Canceled,
    Destroyed,
    Failed,
}

impl ScanOutcome {
    pub fn event_type(self) -> ScanEventType {
        match self {
            ScanOutcome::Success => ScanEventType::Success,
            ScanOutcome::Canceled => ScanEventType::Canceled,
            ScanOutcome::Destroyed => ScanEventType::Destroyed,
            ScanOutcome::Failed => ScanEventType::Failed,
        }
    }

    fn from_terminal(tag: ScanEventType) -> Self {
        match tag {
            ScanEventType::Canceled => ScanOutcome::Canceled,
            ScanEventType::Destroyed => ScanOutcome::Destroyed,
            ScanEventType::Failed => ScanOutcome::Failed,
            _ => ScanOutcome::Success,
        }
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.event_type(), f)
    }
}

/// Summary of one finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub run_id: Uuid,
    pub scan_date: DateTime<Utc>,
    pub outcome: ScanOutcome,
    pub processed: u64,
    /// Error text for [`ScanOutcome::Failed`].
    pub error: Option<String>,
}

/// Runs the five phases in order for one locked run.
#[derive(Debug)]
pub struct ScanOrchestrator {
    helper: Arc<ScanHelper>,
}

impl ScanOrchestrator {
    /// Orchestrate runs through `helper`.
    pub fn new(helper: Arc<ScanHelper>) -> Self {
        Self { helper }
    }

    pub fn helper(&self) -> &Arc<ScanHelper> {
        &self.helper
    }

    /// Acquire the lock and run. `None` when another maintenance operation
    /// holds it.
    pub async fn run(&self) -> Option<ScanReport> {
        let guard = self.helper.state().try_acquire(MaintenanceKind::Scan)?;
        Some(self.run_locked(guard).await)
    }

    /// Run with a lock acquired by the caller. The guard is dropped, and the
    /// lock released, before this returns.
    pub async fn run_locked(&self, guard: ScanLockGuard) -> ScanReport {
        let scan_date = guard.scan_date();
        let settings = Arc::new(self.helper.settings().clone());
        let ctx = match ScanContext::prepare(self.helper.ports(), scan_date, settings.clone())
            .await
        {
            Ok(ctx) => ctx,
            Err(err) => {
                warn!(target: "scan::phase", error = %err, "could not read previous run, treating folders as changed");
                ScanContext::new(scan_date, settings, true)
            }
        };
        info!(
            target: "scan::phase",
            run_id = %ctx.run_id,
            scan_date = %ctx.scan_date,
            folders_changed = ctx.folders_changed,
            full_rebuild = ctx.ignore_timestamps(),
            "scan started"
        );

        let (outcome, error_text) = match self.run_phases(&ctx).await {
            Ok(terminal) => (ScanOutcome::from_terminal(terminal), None),
            Err(err) if err.is_interruption() => {
                let outcome = if self.helper.state().is_destroyed() {
                    ScanOutcome::Destroyed
                } else {
                    ScanOutcome::Canceled
                };
                info!(target: "scan::phase", run_id = %ctx.run_id, %outcome, "scan interrupted");
                self.finish_early(&ctx, outcome, None).await;
                (outcome, None)
            }
            Err(err) => {
                error!(target: "scan::phase", run_id = %ctx.run_id, error = %err, "scan failed");
                let text = err.to_string();
                self.finish_early(&ctx, ScanOutcome::Failed, Some(text.clone()))
                    .await;
                (ScanOutcome::Failed, Some(text))
            }
        };

        let report = ScanReport {
            run_id: ctx.run_id,
            scan_date,
            outcome,
            processed: self.helper.state().processed(),
            error: error_text,
        };
        drop(guard);
        report
    }

    async fn run_phases(&self, ctx: &ScanContext) -> Result<ScanEventType> {
        let helper = self.helper.as_ref();
        PreScan::new(helper, ctx).run().await?;
        DirectoryScan::new(helper, ctx).run().await?;
        FileMetadataScan::new(helper, ctx).run().await?;
        Id3MetadataScan::new(helper, ctx).run().await?;
        let post = PostScan::new(helper, ctx).run().await?;
        Ok(post.terminal)
    }

    /// Minimal finalizer for runs that never reached PostScan. Failures here
    /// are logged; the terminal tag is still attempted.
    async fn finish_early(&self, ctx: &ScanContext, outcome: ScanOutcome, comment: Option<String>) {
        if let Err(err) = post_scan::release_scan_resources(&self.helper).await {
            warn!(target: "scan::phase", run_id = %ctx.run_id, error = %err, "failed to release scan resources");
        }
        if let Err(err) = self
            .helper
            .write_event(ctx, outcome.event_type(), comment)
            .await
        {
            warn!(target: "scan::audit", run_id = %ctx.run_id, error = %err, "failed to record terminal event");
        }
    }
}
