//! # Strata Core
//!
//! Library scan pipeline for the Strata media catalog: walks configured music
//! folders, reconciles them against the persisted catalog, derives the
//! tag-based artist/album aggregates, recomputes sort keys and display order,
//! and keeps the search index in step with all of it.
//!
//! ## Feature Flags
//!
//! - `lofty`: tag extraction through lofty (default). Without it tags are
//!   derived from the `Artist/Album/NN Title.ext` layout.
//! - `memory-metrics`: memory samples on audit rows through sysinfo (default).
//!
//! ## Architecture
//!
//! - [`scan`]: lock, orchestrator, the five phases and the operator service
//! - [`ports`]: traits for every external collaborator
//! - [`memory`]: in-process implementations of those traits
//! - [`media`]: file classification, tag reading, playlist import
//! - [`sort`]: collation, sort-key reconciliation, index buckets
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use strata_core::media::PathTagReader;
//! use strata_core::memory::{MemoryAuditLog, MemoryCatalog, MemoryIndex};
//! use strata_core::scan::{ScanPorts, ScanService};
//! use strata_core::settings::ScannerSettings;
//!
//! async fn scan_once() {
//!     let settings = ScannerSettings::default();
//!     let catalog = MemoryCatalog::new();
//!     catalog.add_folder("/srv/music", "Music").await;
//!     let ports = ScanPorts::in_memory(
//!         catalog,
//!         MemoryIndex::new(),
//!         MemoryAuditLog::new(),
//!         Arc::new(PathTagReader),
//!         &settings,
//!     );
//!     let service = ScanService::new(ports, settings);
//!     if let Some(report) = service.run_scan().await {
//!         println!("{} after {} entries", report.outcome, report.processed);
//!     }
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod cache;
pub mod error;
pub mod media;
pub mod memory;
pub mod ports;
pub mod scan;
pub mod settings;
pub mod sort;

pub use error::{Result, ScanError};
pub use scan::{ScanOutcome, ScanReport, ScanService};
pub use settings::ScannerSettings;
