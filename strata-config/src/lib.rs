//! Configuration loading for the Strata scanner.
//!
//! Resolves [`ScannerSettings`](strata_core::ScannerSettings) plus the music
//! folders to register from an env-provided path, inline JSON, a file in the
//! working directory, or defaults, and reports which one won. Guard rails
//! surface settings that load fine but would misbehave at scan time.

pub mod scanner;
pub mod validation;

pub use scanner::{
    CONFIG_JSON_ENV, CONFIG_PATH_ENV, FolderConfig, ScannerConfig, ScannerConfigSource,
};
pub use validation::{ConfigWarning, ConfigWarnings};
