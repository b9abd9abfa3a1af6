use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strata_model::ScanEvent;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::ports::ScanAuditLog;

/// Audit trail kept in process.
#[derive(Clone, Debug, Default)]
pub struct MemoryAuditLog {
    events: Arc<Mutex<Vec<ScanEvent>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored row in append order.
    pub async fn all(&self) -> Vec<ScanEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl ScanAuditLog for MemoryAuditLog {
    async fn append(&self, event: ScanEvent) -> Result<()> {
        self.events.lock().await.push(event);
        Ok(())
    }

    async fn events(&self, scan_date: DateTime<Utc>) -> Result<Vec<ScanEvent>> {
        let events = self.events.lock().await;
        Ok(events
            .iter()
            .filter(|event| event.scan_date == scan_date)
            .cloned()
            .collect())
    }

    async fn last_event(&self) -> Result<Option<ScanEvent>> {
        Ok(self.events.lock().await.last().cloned())
    }

    async fn scan_dates(&self) -> Result<Vec<DateTime<Utc>>> {
        let events = self.events.lock().await;
        let mut dates: Vec<DateTime<Utc>> = events.iter().map(|e| e.scan_date).collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates.dedup();
        Ok(dates)
    }

    async fn delete_except(&self, scan_date: DateTime<Utc>) -> Result<u64> {
        let mut events = self.events.lock().await;
        let before = events.len();
        events.retain(|event| event.scan_date == scan_date);
        Ok((before - events.len()) as u64)
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut events = self.events.lock().await;
        let before = events.len();
        events.retain(|event| event.scan_date >= cutoff);
        Ok((before - events.len()) as u64)
    }
}
