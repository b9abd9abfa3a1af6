use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strata_model::ScanEvent;

use crate::error::Result;

/// Append-only store for scan audit rows.
#[async_trait]
pub trait ScanAuditLog: Send + Sync {
    async fn append(&self, event: ScanEvent) -> Result<()>;

    /// Rows of one run in emission order.
    async fn events(&self, scan_date: DateTime<Utc>) -> Result<Vec<ScanEvent>>;

    async fn last_event(&self) -> Result<Option<ScanEvent>>;

    /// Distinct scan timestamps, newest first.
    async fn scan_dates(&self) -> Result<Vec<DateTime<Utc>>>;

    /// Remove every row not belonging to `scan_date`.
    async fn delete_except(&self, scan_date: DateTime<Utc>) -> Result<u64>;

    /// Remove rows of runs that started before `cutoff`.
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
