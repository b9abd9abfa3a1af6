//! The five scan phases, run in this order by the orchestrator. Phases share
//! nothing in memory; each one reads what the previous ones persisted.

pub mod directory;
pub mod file_metadata;
pub mod id3_metadata;
pub mod post_scan;
pub mod pre_scan;

pub use directory::{DirectoryScan, DirectoryScanReport};
pub use file_metadata::{FileMetadataReport, FileMetadataScan};
pub use id3_metadata::{Id3MetadataReport, Id3MetadataScan};
pub use post_scan::{PostScan, PostScanReport};
pub use pre_scan::{PreScan, PreScanReport};
