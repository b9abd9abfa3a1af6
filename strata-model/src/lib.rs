//! Core data model definitions shared across Strata crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod aggregate;
pub mod entry;
pub mod folder;
pub mod genre;
pub mod ids;
pub mod media_type;
pub mod playlist;
pub mod scan;

pub use aggregate::{Album, Artist};
pub use entry::{CatalogEntry, far_past};
pub use folder::MusicFolder;
pub use genre::{Genre, LibraryStatistics};
pub use ids::{AlbumId, ArtistId, FolderId, MediaFileId, PlaylistId};
pub use media_type::MediaType;
pub use playlist::Playlist;
pub use scan::{MemorySnapshot, ScanEvent, ScanEventType, ScanProgress};

/// Order value carried by rows that have never been sorted.
pub const UNORDERED: i32 = -1;
