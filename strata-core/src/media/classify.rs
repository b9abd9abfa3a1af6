use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use strata_model::MediaType;
use tracing::warn;

use crate::settings::ScanOptions;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
const AUDIOBOOK_EXTENSIONS: [&str; 1] = ["m4b"];

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Decides which filesystem nodes become catalog entries and what kind.
#[derive(Debug, Clone)]
pub struct MediaClassifier {
    music_extensions: HashSet<String>,
    video_extensions: HashSet<String>,
    excluded: Option<Regex>,
    show_hidden: bool,
    podcast_folder: Option<PathBuf>,
    cover_art_names: Vec<String>,
}

impl Default for MediaClassifier {
    fn default() -> Self {
        Self::from_options(&ScanOptions::default())
    }
}

impl MediaClassifier {
    /// An invalid exclusion pattern is logged and ignored.
    pub fn from_options(options: &ScanOptions) -> Self {
        let excluded = options
            .excluded_pattern
            .as_deref()
            .filter(|pattern| !pattern.trim().is_empty())
            .and_then(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!(target: "scan::config", pattern, error = %err, "ignoring invalid exclusion pattern");
                    None
                }
            });
        let normalize = |list: &[String]| -> HashSet<String> {
            list.iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect()
        };
        Self {
            music_extensions: normalize(&options.music_extensions),
            video_extensions: normalize(&options.video_extensions),
            excluded,
            show_hidden: options.show_hidden_files,
            podcast_folder: options.podcast_folder.clone(),
            cover_art_names: options
                .cover_art_names
                .iter()
                .map(|name| name.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Hidden nodes (unless shown) and names matching the exclusion pattern.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };
        if !self.show_hidden && name.starts_with('.') {
            return true;
        }
        self.excluded
            .as_ref()
            .is_some_and(|regex| regex.is_match(&name))
    }

    /// Media type of a file, `None` when it is not catalogued.
    pub fn leaf_type(&self, path: &Path) -> Option<MediaType> {
        let ext = extension_of(path)?;
        if self.video_extensions.contains(&ext) {
            return Some(MediaType::Video);
        }
        if !self.music_extensions.contains(&ext) {
            return None;
        }
        if self
            .podcast_folder
            .as_deref()
            .is_some_and(|folder| path.starts_with(folder))
        {
            return Some(MediaType::Podcast);
        }
        if AUDIOBOOK_EXTENSIONS.contains(&ext.as_str()) {
            return Some(MediaType::Audiobook);
        }
        Some(MediaType::Music)
    }

    pub fn is_audio(&self, path: &Path) -> bool {
        self.leaf_type(path).is_some_and(MediaType::is_audio)
    }

    pub fn is_image(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Cover image among `files`: configured names first, in configured
    /// order, then the first image by name.
    pub fn pick_cover_art(&self, files: &[PathBuf]) -> Option<PathBuf> {
        let images: Vec<&PathBuf> = files.iter().filter(|f| self.is_image(f)).collect();
        for preferred in &self.cover_art_names {
            if let Some(found) = images.iter().find(|image| {
                image
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().to_ascii_lowercase() == *preferred)
            }) {
                return Some((*found).clone());
            }
        }
        images.into_iter().min().cloned()
    }

    /// Lowercased extension of `path`.
    pub fn format(path: &Path) -> Option<String> {
        extension_of(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(options: ScanOptions) -> MediaClassifier {
        MediaClassifier::from_options(&options)
    }

    #[test]
    fn extensions_decide_leaf_type() {
        let c = MediaClassifier::default();
        assert_eq!(c.leaf_type(Path::new("/m/a/1.FLAC")), Some(MediaType::Music));
        assert_eq!(c.leaf_type(Path::new("/m/a/clip.mkv")), Some(MediaType::Video));
        assert_eq!(c.leaf_type(Path::new("/m/a/book.m4b")), Some(MediaType::Audiobook));
        assert_eq!(c.leaf_type(Path::new("/m/a/notes.txt")), None);
        assert_eq!(c.leaf_type(Path::new("/m/a/noext")), None);
    }

    #[test]
    fn podcast_folder_overrides_music() {
        let c = classifier(ScanOptions {
            podcast_folder: Some(PathBuf::from("/pods")),
            ..ScanOptions::default()
        });
        assert_eq!(c.leaf_type(Path::new("/pods/show/ep1.mp3")), Some(MediaType::Podcast));
        assert_eq!(c.leaf_type(Path::new("/m/show/ep1.mp3")), Some(MediaType::Music));
    }

    #[test]
    fn hidden_and_excluded_names_are_skipped() {
        let c = classifier(ScanOptions {
            excluded_pattern: Some("^_".into()),
            ..ScanOptions::default()
        });
        assert!(c.is_excluded(Path::new("/m/.sync")));
        assert!(c.is_excluded(Path::new("/m/_incoming")));
        assert!(!c.is_excluded(Path::new("/m/Artist")));

        let lenient = classifier(ScanOptions {
            excluded_pattern: Some("([".into()),
            show_hidden_files: true,
            ..ScanOptions::default()
        });
        assert!(!lenient.is_excluded(Path::new("/m/.sync")));
    }

    #[test]
    fn cover_art_prefers_configured_names() {
        let c = MediaClassifier::default();
        let files = vec![
            PathBuf::from("/m/a/back.jpg"),
            PathBuf::from("/m/a/Folder.JPG"),
            PathBuf::from("/m/a/1.mp3"),
        ];
        assert_eq!(c.pick_cover_art(&files), Some(PathBuf::from("/m/a/Folder.JPG")));
        let loose = vec![PathBuf::from("/m/a/z.png"), PathBuf::from("/m/a/b.png")];
        assert_eq!(c.pick_cover_art(&loose), Some(PathBuf::from("/m/a/b.png")));
        assert_eq!(c.pick_cover_art(&[PathBuf::from("/m/a/1.mp3")]), None);
    }
}
