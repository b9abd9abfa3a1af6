use std::fmt;

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub $inner);

        impl $name {
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

integer_id!(
    /// Row id of a catalog entry. Ids are assigned by the repository in
    /// ascending order, which the expunge routine relies on for range deletes.
    MediaFileId(i64)
);
integer_id!(
    /// Row id of a tag-derived artist aggregate.
    ArtistId(i64)
);
integer_id!(
    /// Row id of a tag-derived album aggregate.
    AlbumId(i64)
);
integer_id!(
    /// Configured music folder.
    FolderId(i32)
);
integer_id!(PlaylistId(i64));
