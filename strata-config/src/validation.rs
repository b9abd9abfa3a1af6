//! Guard rails for scanner settings.

use std::fmt;

use regex::Regex;
use strata_core::ScannerSettings;
use strata_core::sort::MusicIndex;
use tracing::warn;

/// A setting that loads but will not behave as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Dotted path of the offending key, e.g. `batch.candidate_batch_size`.
    pub key: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Warnings gathered from one config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigWarnings(Vec<ConfigWarning>);

impl ConfigWarnings {
    /// Check `config` and gather every warning.
    pub fn collect(settings: &ScannerSettings) -> Self {
        let mut warnings = Self::default();
        let batch = &settings.batch;

        for (key, value) in [
            ("batch.candidate_batch_size", batch.candidate_batch_size),
            ("batch.progress_interval", batch.progress_interval as usize),
        ] {
            if value == 0 {
                warnings.push(key, "zero disables batching; the default will not apply");
            }
        }
        if batch.expunge_range <= 0 {
            warnings.push(
                "batch.expunge_range",
                format!("{} never advances the expunge window", batch.expunge_range),
            );
        }

        if let Some(pattern) = settings.scan.excluded_pattern.as_deref()
            && !pattern.trim().is_empty()
            && let Err(err) = Regex::new(pattern)
        {
            warnings.push(
                "scan.excluded_pattern",
                format!("invalid regex, nothing will be excluded: {err}"),
            );
        }

        let index_string = settings.sort.index_string.as_str();
        let tokens = index_string.split_whitespace().count();
        if tokens == 0 {
            warnings.push("sort.index_string", "empty; every artist lands in '#'");
        } else {
            let groups = MusicIndex::parse(index_string).labels().count();
            if groups != tokens {
                warnings.push(
                    "sort.index_string",
                    format!("{} of {tokens} tokens are malformed and ignored", tokens - groups),
                );
            }
        }

        warnings
    }

    fn push(&mut self, key: &'static str, message: impl Into<String>) {
        self.0.push(ConfigWarning {
            key,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.0.iter()
    }

    /// Emit each warning on the `scan::config` target.
    pub fn log(&self) {
        for warning in &self.0 {
            warn!(target: "scan::config", key = warning.key, "{}", warning.message);
        }
    }
}
