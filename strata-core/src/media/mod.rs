//! Filesystem-facing adapters: classification, tag reading, playlist import.

pub mod classify;
pub mod playlists;
pub mod tags;

pub use classify::MediaClassifier;
pub use playlists::M3uPlaylistImporter;
#[cfg(feature = "lofty")]
pub use tags::LoftyTagReader;
pub use tags::{DefaultTagReader, PathTagReader};
