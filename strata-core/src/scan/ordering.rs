//! The single decision point for skipping order recomputation.

use super::context::ScanContext;

/// What the steps before an ordering step changed during this run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpstreamChanges {
    /// Albums re-derived from their children.
    pub parsed_albums: usize,
    /// Sort keys rewritten by reconciliation.
    pub sort_updates: usize,
    /// Rows still carrying the unordered marker.
    pub unordered: u64,
    /// Aggregates created or rebuilt.
    pub aggregates_written: usize,
    /// Folder rows modified during this run.
    pub folders_touched: usize,
}

impl UpstreamChanges {
    /// Whether anything upstream moved.
    pub fn any(&self) -> bool {
        self.parsed_albums > 0
            || self.sort_updates > 0
            || self.unordered > 0
            || self.aggregates_written > 0
            || self.folders_touched > 0
    }
}

/// Order steps run on forced rebuilds, after folder changes, or when
/// anything upstream moved. Otherwise they are skipped.
pub fn should_recompute_ordering(ctx: &ScanContext, upstream: &UpstreamChanges) -> bool {
    ctx.ignore_timestamps() || ctx.folders_changed || upstream.any()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::settings::{ScanOptions, ScannerSettings};

    fn context(ignore: bool, folders_changed: bool) -> ScanContext {
        let settings = ScannerSettings {
            scan: ScanOptions {
                ignore_file_timestamps: ignore,
                ..ScanOptions::default()
            },
            ..ScannerSettings::default()
        };
        ScanContext::new(Utc::now(), Arc::new(settings), folders_changed)
    }

    #[test]
    fn quiet_incremental_run_skips() {
        assert!(!should_recompute_ordering(
            &context(false, false),
            &UpstreamChanges::default()
        ));
    }

    #[test]
    fn any_forcing_condition_recomputes() {
        let quiet = UpstreamChanges::default();
        assert!(should_recompute_ordering(&context(true, false), &quiet));
        assert!(should_recompute_ordering(&context(false, true), &quiet));
        let sorted = UpstreamChanges {
            sort_updates: 3,
            ..UpstreamChanges::default()
        };
        assert!(should_recompute_ordering(&context(false, false), &sorted));
        let unordered = UpstreamChanges {
            unordered: 1,
            ..UpstreamChanges::default()
        };
        assert!(should_recompute_ordering(&context(false, false), &unordered));
    }
}
