use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use strata_core::ScannerSettings;

use crate::validation::ConfigWarnings;

/// Path to a TOML or JSON scanner config file.
pub const CONFIG_PATH_ENV: &str = "STRATA_SCANNER_CONFIG_PATH";
/// Inline JSON scanner config.
pub const CONFIG_JSON_ENV: &str = "STRATA_SCANNER_CONFIG_JSON";

/// Source that produced the scanner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScannerConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

impl fmt::Display for ScannerConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScannerConfigSource::Default => f.write_str("built-in defaults"),
            ScannerConfigSource::EnvPath(path) => {
                write!(f, "${CONFIG_PATH_ENV} ({})", path.display())
            }
            ScannerConfigSource::EnvInline => write!(f, "${CONFIG_JSON_ENV}"),
            ScannerConfigSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A music folder to register before scanning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FolderConfig {
    pub path: PathBuf,
    /// Display name. Defaults to the last path component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl FolderConfig {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string())
        })
    }
}

/// Scanner settings plus the folders they apply to. Settings sections sit at
/// the top level of the file (`[scan]`, `[sort]`, `[audit]`, `[batch]`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    #[serde(flatten)]
    pub settings: ScannerSettings,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub folders: Vec<FolderConfig>,
}

impl ScannerConfig {
    /// Load scanner configuration using environment variables.
    /// Evaluation order:
    /// 1) `$STRATA_SCANNER_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$STRATA_SCANNER_CONFIG_JSON` (inline JSON),
    /// 3) the first of `scanner.toml`, `scanner.json`,
    ///    `config/scanner.toml`, `config/scanner.json`,
    /// 4) defaults.
    pub fn load_from_env() -> anyhow::Result<(Self, ScannerConfigSource)> {
        Self::load_with(
            env::var(CONFIG_PATH_ENV).ok(),
            env::var(CONFIG_JSON_ENV).ok(),
            Path::new("."),
        )
    }

    /// [`Self::load_from_env`] with the variables and the directory searched
    /// for default files passed in.
    pub fn load_with(
        path_var: Option<String>,
        json_var: Option<String>,
        search_root: &Path,
    ) -> anyhow::Result<(Self, ScannerConfigSource)> {
        if let Some(path_str) = path_var
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, ScannerConfigSource::EnvPath(path)));
        }

        if let Some(raw) = json_var
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_ENV}"))?;
            return Ok((parsed, ScannerConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file(search_root) {
            let config = Self::load_from_file(&path)?;
            return Ok((config, ScannerConfigSource::File(path)));
        }

        Ok((Self::default(), ScannerConfigSource::Default))
    }

    /// Load from an explicit TOML or JSON file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read scanner config from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents)
                .with_context(|| format!("invalid scanner config {}", path.display())),
            Some("toml") | Some("tml") => toml::from_str(&contents).map_err(|err| {
                anyhow!("invalid scanner config {}: {}", path.display(), err)
            }),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    /// Parse TOML, falling back to JSON.
    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        // TOML first, then JSON.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse scanner config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).map_err(|err| anyhow!("invalid scanner config json: {err}"))
    }

    /// Settings that parse but would misbehave during a scan.
    pub fn warnings(&self) -> ConfigWarnings {
        ConfigWarnings::collect(&self.settings)
    }

    fn find_default_file(root: &Path) -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &[
            "scanner.toml",
            "scanner.json",
            "config/scanner.toml",
            "config/scanner.json",
        ];

        CANDIDATES
            .iter()
            .map(|candidate| root.join(candidate))
            .find(|path| path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_sections_flatten_into_settings() {
        let config = ScannerConfig::parse_from_str(
            r#"
                [[folders]]
                path = "/srv/music"

                [sort]
                ignored_articles = "The A"

                [batch]
                candidate_batch_size = 25
            "#,
            "inline",
        )
        .expect("valid toml");
        assert_eq!(config.settings.sort.ignored_articles, "The A");
        assert!(config.settings.sort.strict);
        assert_eq!(config.settings.batch.candidate_batch_size, 25);
        assert_eq!(config.settings.batch.expunge_range, 1_000);
        assert_eq!(config.folders.len(), 1);
        assert_eq!(config.folders[0].display_name(), "music");
    }

    #[test]
    fn json_body_without_extension_still_parses() {
        let config = ScannerConfig::parse_from_str(
            r#"{"audit":{"enabled":false,"retention_days":7}}"#,
            "inline",
        )
        .expect("valid json");
        assert!(!config.settings.audit.enabled);
        assert_eq!(config.settings.audit.retention_days, Some(7));
    }

    #[test]
    fn garbage_reports_both_parsers() {
        let err = ScannerConfig::parse_from_str("[[[", "broken.cfg").expect_err("invalid");
        let message = err.to_string();
        assert!(message.contains("toml error"));
        assert!(message.contains("json error"));
    }

    #[test]
    fn source_display_names_the_origin() {
        assert_eq!(ScannerConfigSource::Default.to_string(), "built-in defaults");
        assert_eq!(
            ScannerConfigSource::EnvInline.to_string(),
            "$STRATA_SCANNER_CONFIG_JSON"
        );
    }
}
