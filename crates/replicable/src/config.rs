//! # Harness Configuration
//!
//! Loaded once from TOML at startup. Every field has a default, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! strategy = "boxed"
//! writers = 4
//! readers = 8
//! writes_per_writer = 50000
//! payload_len = 256
//! seed = 7
//! failure_rate_percent = 10
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{HarnessError, HarnessResult};

/// Which storage strategy the harness source uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// [`replicable_core::Inline`]: resync by assignment.
    #[default]
    Inline,
    /// [`replicable_core::Boxed`]: resync by reallocation, writers may `replace`.
    Boxed,
}

impl StrategyKind {
    /// Lowercase name, as written in config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Boxed => "boxed",
        }
    }
}

/// Configuration for a stress run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StressConfig {
    /// Storage strategy for the shared source.
    pub strategy: StrategyKind,
    /// Number of writer threads.
    pub writers: usize,
    /// Number of reader threads, one replica each.
    pub readers: usize,
    /// Write attempts per writer, committed or rejected.
    pub writes_per_writer: u64,
    /// Number of cells in the shared ledger.
    pub payload_len: usize,
    /// Seed for the writers' operation mix.
    pub seed: u64,
    /// Share of fallible writes that are made to fail, 0-100.
    pub failure_rate_percent: u8,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Inline,
            writers: 2,
            readers: 4,
            writes_per_writer: 10_000,
            payload_len: 64,
            seed: 0x5EED,
            failure_rate_percent: 10,
        }
    }
}

impl StressConfig {
    /// Long-running config: more threads, larger payload.
    #[must_use]
    pub const fn production() -> Self {
        Self {
            strategy: StrategyKind::Boxed,
            writers: 4,
            readers: 16,
            writes_per_writer: 250_000,
            payload_len: 1_024,
            seed: 0x5EED,
            failure_rate_percent: 5,
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Parse`] for malformed TOML or unknown keys,
    /// [`HarnessError::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> HarnessResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Io`] if the file cannot be read, otherwise as
    /// [`StressConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> HarnessResult<()> {
        if self.writers == 0 {
            return Err(HarnessError::InvalidConfig("writers must be at least 1".into()));
        }
        if self.readers == 0 {
            return Err(HarnessError::InvalidConfig("readers must be at least 1".into()));
        }
        if self.payload_len == 0 {
            return Err(HarnessError::InvalidConfig("payload_len must be at least 1".into()));
        }
        if self.failure_rate_percent > 100 {
            return Err(HarnessError::InvalidConfig(format!(
                "failure_rate_percent must be 0-100, got {}",
                self.failure_rate_percent
            )));
        }
        Ok(())
    }

    /// Total write attempts across all writers.
    #[must_use]
    pub fn total_attempts(&self) -> u64 {
        self.writers as u64 * self.writes_per_writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = StressConfig::from_toml_str("").unwrap();
        assert_eq!(config, StressConfig::default());
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = StressConfig::from_toml_str("strategy = \"boxed\"\nreaders = 9\n").unwrap();
        assert_eq!(config.strategy, StrategyKind::Boxed);
        assert_eq!(config.readers, 9);
        assert_eq!(config.writers, StressConfig::default().writers);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = StressConfig::from_toml_str("reader = 3\n").unwrap_err();
        assert!(matches!(err, HarnessError::Parse(_)));
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let err = StressConfig::from_toml_str("strategy = \"shared\"\n").unwrap_err();
        assert!(matches!(err, HarnessError::Parse(_)));
    }

    #[test]
    fn test_zero_writers_is_invalid() {
        let err = StressConfig::from_toml_str("writers = 0\n").unwrap_err();
        assert!(matches!(err, HarnessError::InvalidConfig(ref msg) if msg.contains("writers")));
    }

    #[test]
    fn test_failure_rate_range() {
        let config = StressConfig {
            failure_rate_percent: 101,
            ..StressConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = StressConfig::from_file("/nonexistent/stress.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/stress.toml"));
    }

    #[test]
    fn test_production_is_valid() {
        let config = StressConfig::production();
        assert!(config.validate().is_ok());
        assert_eq!(config.total_attempts(), 1_000_000);
    }
}
