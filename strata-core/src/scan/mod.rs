//! The library scan pipeline.
//!
//! [`ScanService`] is the entry point. It takes the maintenance lock held in
//! [`ScanState`] and hands the run to [`ScanOrchestrator`], which drives the
//! phases in [`phases`] against the ports bundled in [`ScanPorts`].

pub mod context;
pub mod helper;
pub mod metrics;
pub mod orchestrator;
pub mod ordering;
pub mod phases;
pub mod service;
pub mod state;

pub use context::{ScanContext, ScanPorts};
pub use helper::{DrainStats, ExpungeStats, ScanHelper, SKIPPED};
pub use orchestrator::{ScanOrchestrator, ScanOutcome, ScanReport};
pub use ordering::{UpstreamChanges, should_recompute_ordering};
pub use service::ScanService;
pub use state::{MaintenanceKind, ScanLockGuard, ScanState};
