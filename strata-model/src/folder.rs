use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::{FolderId, UNORDERED};

/// A configured root of the catalog.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MusicFolder {
    pub id: FolderId,
    pub path: PathBuf,
    pub name: String,
    pub enabled: bool,
    /// `-1` until the folder list has been numbered.
    pub order: i32,
    pub changed: DateTime<Utc>,
}

impl MusicFolder {
    pub fn new(id: FolderId, path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            name: name.into(),
            enabled: true,
            order: UNORDERED,
            changed: Utc::now(),
        }
    }
}
