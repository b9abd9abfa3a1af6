use std::fmt::{self, Display, Formatter};

/// Discriminates the kind of filesystem node a catalog entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum MediaType {
    /// A directory that holds no audio of its own (artist level, folder roots).
    Directory = 0,
    /// A directory that directly contains audio files.
    Album = 1,
    Music = 2,
    Podcast = 3,
    Audiobook = 4,
    Video = 5,
}

impl MediaType {
    pub const LEAVES: [MediaType; 4] = [
        MediaType::Music,
        MediaType::Podcast,
        MediaType::Audiobook,
        MediaType::Video,
    ];

    pub fn is_container(self) -> bool {
        matches!(self, MediaType::Directory | MediaType::Album)
    }

    pub fn is_leaf(self) -> bool {
        !self.is_container()
    }

    pub fn is_audio(self) -> bool {
        matches!(
            self,
            MediaType::Music | MediaType::Podcast | MediaType::Audiobook
        )
    }

    /// Leaves whose metadata extraction is deferred out of the directory
    /// traversal and drained by a dedicated batch loop.
    pub fn is_deferred(self) -> bool {
        matches!(self, MediaType::Video | MediaType::Podcast)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Directory => "DIRECTORY",
            MediaType::Album => "ALBUM",
            MediaType::Music => "MUSIC",
            MediaType::Podcast => "PODCAST",
            MediaType::Audiobook => "AUDIOBOOK",
            MediaType::Video => "VIDEO",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i16> for MediaType {
    type Error = i16;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MediaType::Directory),
            1 => Ok(MediaType::Album),
            2 => Ok(MediaType::Music),
            3 => Ok(MediaType::Podcast),
            4 => Ok(MediaType::Audiobook),
            5 => Ok(MediaType::Video),
            other => Err(other),
        }
    }
}
