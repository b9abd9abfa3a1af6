use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;

fn stdout_of(args: &[&str]) -> String {
    let mut cmd = cargo_bin_cmd!("stratactl");
    let output = cmd
        .args(args)
        .env_remove("STRATA_SCANNER_CONFIG_PATH")
        .env_remove("STRATA_SCANNER_CONFIG_JSON")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8_lossy(&output).into_owned()
}

#[test]
fn phases_lists_the_sequence() {
    let text = stdout_of(&["phases"]);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 22);
    assert!(lines[0].contains("BEFORE_SCAN"));
    assert!(lines[21].contains("AFTER_SCAN"));
    assert!(lines[21].contains("100.0%"));
}

#[test]
fn config_reports_explicit_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("scanner.toml");
    fs::write(&path, "[batch]\ncandidate_batch_size = 0\n").expect("write config");

    let text = stdout_of(&["config", "--config", &path.display().to_string()]);
    assert!(text.contains("# source:"));
    assert!(text.contains("# warning: batch.candidate_batch_size"));
    assert!(text.contains("\"candidate_batch_size\": 0"));
}

#[test]
fn scan_prints_trail_and_summary() {
    let dir = tempfile::tempdir().expect("temp dir");
    let album = dir.path().join("Artist").join("Album");
    fs::create_dir_all(&album).expect("album dir");
    fs::write(album.join("01 Song.mp3"), b"not audio").expect("track");

    let text = stdout_of(&["scan", "--folder", &dir.path().display().to_string()]);
    assert!(text.contains("BEFORE_SCAN"));
    assert!(text.contains("SUCCESS"));
    assert!(text.contains("1 albums, 1 artists"));
}

#[test]
fn scan_without_folders_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut cmd = cargo_bin_cmd!("stratactl");
    cmd.current_dir(dir.path())
        .env_remove("STRATA_SCANNER_CONFIG_PATH")
        .env_remove("STRATA_SCANNER_CONFIG_JSON")
        .arg("scan")
        .assert()
        .failure();
}
