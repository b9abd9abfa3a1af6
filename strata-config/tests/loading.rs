//! Source precedence for scanner config loading. Variables are passed in
//! rather than set on the process so tests can run in parallel.

use std::fs;

use strata_config::{ScannerConfig, ScannerConfigSource};
use tempfile::TempDir;

fn write(root: &TempDir, relative: &str, body: &str) -> anyhow::Result<std::path::PathBuf> {
    let path = root.path().join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, body)?;
    Ok(path)
}

#[test]
fn env_path_wins_over_everything() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    write(&root, "scanner.toml", "[scan]\nthrottle_ms = 1\n")?;
    let explicit = write(&root, "elsewhere.json", r#"{"scan":{"throttle_ms":9}}"#)?;

    let (config, source) = ScannerConfig::load_with(
        Some(explicit.display().to_string()),
        Some(r#"{"scan":{"throttle_ms":5}}"#.to_string()),
        root.path(),
    )?;
    assert_eq!(config.settings.scan.throttle_ms, 9);
    assert_eq!(source, ScannerConfigSource::EnvPath(explicit));
    Ok(())
}

#[test]
fn inline_json_beats_files() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    write(&root, "scanner.toml", "[scan]\nthrottle_ms = 1\n")?;

    let (config, source) = ScannerConfig::load_with(
        Some("   ".to_string()),
        Some(r#"{"scan":{"throttle_ms":5}}"#.to_string()),
        root.path(),
    )?;
    assert_eq!(config.settings.scan.throttle_ms, 5);
    assert_eq!(source, ScannerConfigSource::EnvInline);
    Ok(())
}

#[test]
fn nested_config_dir_is_searched_last() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    let nested = write(
        &root,
        "config/scanner.toml",
        "[[folders]]\npath = \"/srv/music\"\nname = \"Main\"\n",
    )?;

    let (config, source) = ScannerConfig::load_with(None, None, root.path())?;
    assert_eq!(source, ScannerConfigSource::File(nested));
    assert_eq!(config.folders[0].display_name(), "Main");

    let top = write(&root, "scanner.json", r#"{"sort":{"strict":false}}"#)?;
    let (config, source) = ScannerConfig::load_with(None, None, root.path())?;
    assert_eq!(source, ScannerConfigSource::File(top));
    assert!(!config.settings.sort.strict);
    assert!(config.folders.is_empty());
    Ok(())
}

#[test]
fn nothing_found_yields_defaults() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    let (config, source) = ScannerConfig::load_with(None, None, root.path())?;
    assert_eq!(source, ScannerConfigSource::Default);
    assert_eq!(config, ScannerConfig::default());
    assert!(config.warnings().is_empty());
    Ok(())
}

#[test]
fn unreadable_env_path_is_an_error() {
    let root = tempfile::tempdir().expect("temp dir");
    let missing = root.path().join("missing.toml");
    let err = ScannerConfig::load_with(Some(missing.display().to_string()), None, root.path())
        .expect_err("missing file");
    assert!(err.to_string().contains("failed to read scanner config"));
}
