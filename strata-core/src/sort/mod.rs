//! Name collation, sort-key reconciliation and index buckets.

pub mod collation;
pub mod music_index;
pub mod sort_keys;

use std::cmp::Ordering;

use strata_model::CatalogEntry;

pub use collation::Collator;
pub use music_index::MusicIndex;
pub use sort_keys::{SortReconciliation, compensate, copy, merge, reconcile};

/// Track order inside an album: disc, then track number, then path.
/// Untagged discs count as disc one; untagged tracks go last.
pub fn compare_tracks(a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
    let key = |e: &CatalogEntry| {
        (
            e.disc_number.unwrap_or(1),
            e.track_number.unwrap_or(u32::MAX),
        )
    };
    key(a).cmp(&key(b)).then_with(|| a.path.cmp(&b.path))
}
