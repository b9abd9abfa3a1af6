//! Shared harness for pipeline integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_core::media::PathTagReader;
use strata_core::memory::{MemoryAuditLog, MemoryCatalog, MemoryIndex};
use strata_core::ports::{CatalogRepository, TagReader};
use strata_core::scan::{ScanPorts, ScanService};
use strata_core::settings::ScannerSettings;
use strata_model::{CatalogEntry, MediaType, ScanEvent, ScanEventType};
use tempfile::TempDir;

/// One music folder in a temp dir, in-memory adapters and a service.
pub struct ScanHarness {
    pub dir: TempDir,
    pub root: PathBuf,
    pub catalog: MemoryCatalog,
    pub index: MemoryIndex,
    pub audit: MemoryAuditLog,
    pub service: ScanService,
}

impl ScanHarness {
    pub async fn new() -> Self {
        Self::with(ScannerSettings::default(), Arc::new(PathTagReader)).await
    }

    pub async fn with(settings: ScannerSettings, tags: Arc<dyn TagReader>) -> Self {
        Self::build(|_| settings, tags, |_| {}).await
    }

    /// Settings are built from the music root; `adjust` may swap ports
    /// before the service is created.
    pub async fn build(
        settings: impl FnOnce(&Path) -> ScannerSettings,
        tags: Arc<dyn TagReader>,
        adjust: impl FnOnce(&mut ScanPorts),
    ) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = dir.path().join("music");
        fs::create_dir_all(&root).expect("music root");
        let settings = settings(&root);

        let catalog = MemoryCatalog::new();
        let index = MemoryIndex::new();
        let audit = MemoryAuditLog::new();
        catalog.add_folder(&root, "Music").await;

        let mut ports = ScanPorts::in_memory(
            catalog.clone(),
            index.clone(),
            audit.clone(),
            tags,
            &settings,
        );
        adjust(&mut ports);
        let service = ScanService::new(ports, settings);
        Self {
            dir,
            root,
            catalog,
            index,
            audit,
            service,
        }
    }

    /// Write a small placeholder file at `relative` under the music root.
    pub fn add_file(&self, relative: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dirs");
        }
        fs::write(&path, b"not really audio").expect("write file");
        path
    }

    pub fn remove_file(&self, relative: &str) {
        fs::remove_file(self.root.join(relative)).expect("remove file");
    }

    /// Flag the row at `relative` non-present, as an interrupted run that
    /// marked but never expunged would leave it.
    pub async fn mark_absent(&self, relative: &str) -> CatalogEntry {
        let mut entry = self.entry(relative).await.expect("catalogued row");
        entry.present = false;
        self.catalog
            .persist(entry)
            .await
            .expect("persist")
            .expect("parent row present")
    }

    pub async fn non_root_of_type(&self, media_type: MediaType) -> Vec<CatalogEntry> {
        self.catalog
            .entries()
            .await
            .into_iter()
            .filter(|entry| entry.media_type == media_type && !entry.is_root())
            .collect()
    }

    pub async fn entry(&self, relative: &str) -> Option<CatalogEntry> {
        self.catalog.entry(self.root.join(relative)).await
    }

    pub async fn events(&self) -> Vec<ScanEvent> {
        self.audit.all().await
    }

    /// In-sequence tags of the stored trail, in append order.
    pub async fn phase_trace(&self) -> Vec<ScanEventType> {
        self.events()
            .await
            .into_iter()
            .map(|event| event.event_type)
            .filter(|tag| tag.position().is_some())
            .collect()
    }

    pub async fn last_tag(&self) -> Option<ScanEventType> {
        self.events().await.last().map(|event| event.event_type)
    }

    pub async fn comment_of(&self, tag: ScanEventType) -> Option<String> {
        self.events()
            .await
            .into_iter()
            .rev()
            .find(|event| event.event_type == tag)
            .and_then(|event| event.comment)
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
