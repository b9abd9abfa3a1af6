use chrono::{DateTime, Utc};

use crate::{MediaFileId, PlaylistId};

/// Playlist materialized from an external definition file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Playlist {
    pub id: Option<PlaylistId>,
    pub name: String,
    /// Source file name, used as the identity when re-importing.
    pub file_name: String,
    pub entries: Vec<MediaFileId>,
    pub imported_at: DateTime<Utc>,
}
