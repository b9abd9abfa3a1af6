//! Repository ports consumed by the scan pipeline.
//!
//! The pipeline never talks to storage or the search engine directly; every
//! read and write goes through these traits. `crate::memory` carries the
//! in-process implementation used by tests and the CLI.

pub mod aggregates;
pub mod audit;
pub mod catalog;
pub mod folders;
pub mod index;
pub mod playlists;
pub mod tags;

pub use aggregates::{AggregateRepository, Id3AlbumCandidate, Id3ArtistCandidate};
pub use audit::ScanAuditLog;
pub use catalog::{
    CandidateKind, CatalogRepository, SortScope, SortSource, SortTuple, SortUpdate,
};
pub use folders::MusicFolderRepository;
pub use index::{IndexKind, SearchIndex};
pub use playlists::{PlaylistImporter, PlaylistRepository};
pub use tags::{TagReader, TrackTags};
