mod support;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use strata_core::media::PathTagReader;
use strata_core::ports::{IndexKind, MusicFolderRepository, TagReader, TrackTags};
use strata_core::scan::{MaintenanceKind, ScanState};
use strata_core::settings::ScannerSettings;
use strata_core::{Result, ScanError, ScanOutcome};
use strata_model::{MusicFolder, ScanEventType};
use support::ScanHarness;

/// Interrupts the run the first time it is asked for tags, by cancel or by
/// process shutdown.
#[derive(Default)]
struct InterruptingReader {
    state: OnceLock<Arc<ScanState>>,
    fired: AtomicBool,
    shutdown: bool,
}

impl InterruptingReader {
    fn shutting_down() -> Self {
        Self {
            shutdown: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl TagReader for InterruptingReader {
    async fn read_tags(&self, path: &Path) -> Result<TrackTags> {
        if !self.fired.swap(true, Ordering::SeqCst)
            && let Some(state) = self.state.get()
        {
            if self.shutdown {
                state.shutdown();
            } else {
                state.request_cancel();
            }
        }
        Ok(PathTagReader::derive(path))
    }
}

/// Folder table that cannot be read.
struct UnavailableFolders;

#[async_trait]
impl MusicFolderRepository for UnavailableFolders {
    async fn all_folders(&self) -> Result<Vec<MusicFolder>> {
        Err(ScanError::Repository("folder table unavailable".into()))
    }

    async fn update_folder(&self, _folder: &MusicFolder) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn cancel_ends_run_and_next_run_succeeds() {
    let reader = Arc::new(InterruptingReader::default());
    let harness = ScanHarness::with(ScannerSettings::default(), reader.clone()).await;
    reader
        .state
        .set(harness.service.state().clone())
        .expect("state set once");
    harness.add_file("Artist/Album/01 First.mp3");
    harness.add_file("Artist/Album/02 Second.mp3");

    assert!(harness.service.start_scan());
    let report = harness.service.wait().await.expect("task report");
    assert_eq!(report.outcome, ScanOutcome::Canceled);
    assert!(!harness.service.is_scanning());
    assert_eq!(harness.last_tag().await, Some(ScanEventType::Canceled));
    assert!(!harness.index.is_session_open().await);

    let report = harness.service.run_scan().await.expect("lock free");
    assert_eq!(report.outcome, ScanOutcome::Success);
    assert_eq!(harness.last_tag().await, Some(ScanEventType::Success));
    assert_eq!(harness.catalog.albums().await.len(), 1);
}

#[tokio::test]
async fn held_lock_drops_scan_requests() {
    let harness = ScanHarness::new().await;
    let guard = harness
        .service
        .state()
        .try_acquire(MaintenanceKind::Expunge)
        .expect("lock free");

    assert!(!harness.service.start_scan());
    assert!(harness.service.run_scan().await.is_none());
    assert!(harness.service.expunge().await.expect("no error").is_none());
    assert!(!harness.service.is_scanning());

    drop(guard);
    assert!(harness.service.run_scan().await.is_some());
}

#[tokio::test]
async fn progress_reports_completion() {
    let harness = ScanHarness::new().await;
    let idle = harness.service.progress();
    assert!(!idle.scanning);
    assert_eq!(idle.fraction, 0.0);

    harness.add_file("Artist/Album/01 Only.mp3");
    let report = harness.service.run_scan().await.expect("lock free");
    assert!(report.processed > 0);

    let progress = harness.service.progress();
    assert!(!progress.scanning);
    assert_eq!(progress.last_phase, Some(ScanEventType::Success));
    assert_eq!(progress.fraction, 1.0);
    assert_eq!(harness.service.processed_count(), 0);
}

#[tokio::test]
async fn shutdown_mid_run_ends_destroyed() {
    let reader = Arc::new(InterruptingReader::shutting_down());
    let harness = ScanHarness::with(ScannerSettings::default(), reader.clone()).await;
    reader
        .state
        .set(harness.service.state().clone())
        .expect("state set once");
    harness.add_file("Artist/Album/01 First.mp3");
    harness.add_file("Artist/Album/02 Second.mp3");

    assert!(harness.service.start_scan());
    let report = harness.service.wait().await.expect("task report");
    assert_eq!(report.outcome, ScanOutcome::Destroyed);
    assert!(report.error.is_none());
    assert_eq!(harness.last_tag().await, Some(ScanEventType::Destroyed));
    assert!(!harness.service.is_scanning());
    assert!(!harness.index.is_session_open().await);

    assert!(!harness.service.start_scan());
    assert!(harness.service.run_scan().await.is_none());
}

#[tokio::test]
async fn repository_failure_ends_failed_and_releases_lock() {
    let harness = ScanHarness::build(
        |_| ScannerSettings::default(),
        Arc::new(PathTagReader),
        |ports| ports.folders = Arc::new(UnavailableFolders),
    )
    .await;
    harness.add_file("Artist/Album/01 Only.mp3");

    let report = harness.service.run_scan().await.expect("lock free");
    assert_eq!(report.outcome, ScanOutcome::Failed);
    assert_eq!(
        report.error.as_deref(),
        Some("Repository error: folder table unavailable")
    );
    assert_eq!(harness.last_tag().await, Some(ScanEventType::Failed));
    assert_eq!(harness.comment_of(ScanEventType::Failed).await, report.error);
    assert_eq!(harness.phase_trace().await, vec![ScanEventType::BeforeScan]);
    assert!(!harness.service.is_scanning());
    assert!(!harness.index.is_session_open().await);

    let again = harness.service.run_scan().await.expect("lock released");
    assert_eq!(again.outcome, ScanOutcome::Failed);
}

#[tokio::test]
async fn leftovers_of_an_interrupted_run_are_expunged_first() {
    let harness = ScanHarness::new().await;
    harness.add_file("Artist/Album/01 Only.mp3");
    harness.service.run_scan().await.expect("lock free");
    let stale = harness.mark_absent("Artist/Album/01 Only.mp3").await;
    let stale_id = stale.id.expect("stored row");

    let report = harness.service.run_scan().await.expect("lock free");
    assert_eq!(report.outcome, ScanOutcome::Success);

    let track = harness
        .entry("Artist/Album/01 Only.mp3")
        .await
        .expect("re-registered by the walk");
    assert!(track.present);
    assert_ne!(track.id, Some(stale_id));
    assert!(!harness.index.contains(IndexKind::Song, stale_id.get()).await);
    assert_eq!(harness.catalog.albums().await[0].song_count, 1);
}

#[tokio::test]
async fn standalone_expunge_drops_vanished_rows() {
    let harness = ScanHarness::new().await;
    harness.add_file("Artist/Album/01 Keep.mp3");
    harness.add_file("Artist/Album/02 Drop.mp3");
    harness.service.run_scan().await.expect("lock free");
    let dropped = harness.mark_absent("Artist/Album/02 Drop.mp3").await;
    let dropped_id = dropped.id.expect("stored row");
    assert!(harness.index.contains(IndexKind::Song, dropped_id.get()).await);

    let stats = harness
        .service
        .expunge()
        .await
        .expect("expunge succeeds")
        .expect("lock free");
    assert_eq!(stats.deleted_rows, 1);
    assert_eq!(stats.index_removals, 1);
    assert!(harness.entry("Artist/Album/02 Drop.mp3").await.is_none());
    assert!(!harness.index.contains(IndexKind::Song, dropped_id.get()).await);
    assert!(harness.entry("Artist/Album/01 Keep.mp3").await.is_some());
    assert!(!harness.index.is_session_open().await);
}

#[tokio::test]
async fn shutdown_refuses_new_runs() {
    let harness = ScanHarness::new().await;
    assert!(harness.service.shutdown().await.is_none());
    assert!(!harness.service.start_scan());
    assert!(harness.service.run_scan().await.is_none());
}
