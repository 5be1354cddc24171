//! # Stress Harness Integration Test
//!
//! Runs the harness end to end with small configs for both strategies.

use replicable::{stress, HarnessError, StrategyKind, StressConfig};

fn small(strategy: StrategyKind) -> StressConfig {
    StressConfig {
        strategy,
        writers: 3,
        readers: 4,
        writes_per_writer: 1_500,
        payload_len: 32,
        seed: 42,
        failure_rate_percent: 25,
    }
}

/// Test: inline run commits every non-rejected write exactly once.
#[test]
fn test_stress_inline() {
    let config = small(StrategyKind::Inline);
    let report = stress::run(&config).unwrap();

    assert_eq!(report.strategy, StrategyKind::Inline);
    assert_eq!(report.final_version, report.committed_writes);
    assert_eq!(report.committed_writes + report.rejected_writes, config.total_attempts());
    assert!(report.rejected_writes > 0, "failure rate should reject some writes");
    assert!(report.fast_path_hits + report.resyncs >= config.readers as u64);
}

/// Test: boxed run, which also exercises `replace`.
#[test]
fn test_stress_boxed() {
    let config = small(StrategyKind::Boxed);
    let report = stress::run(&config).unwrap();

    assert_eq!(report.strategy, StrategyKind::Boxed);
    assert_eq!(report.final_version, report.committed_writes);
    assert_eq!(report.committed_writes + report.rejected_writes, config.total_attempts());
}

/// Test: no failures injected means nothing is rejected.
#[test]
fn test_stress_without_failures() {
    let config = StressConfig {
        failure_rate_percent: 0,
        ..small(StrategyKind::Boxed)
    };
    let report = stress::run(&config).unwrap();

    assert_eq!(report.rejected_writes, 0);
    assert_eq!(report.final_version, config.total_attempts());
}

/// Test: an invalid config is refused before any thread starts.
#[test]
fn test_stress_rejects_invalid_config() {
    let config = StressConfig {
        readers: 0,
        ..StressConfig::default()
    };
    let err = stress::run(&config).unwrap_err();
    assert!(matches!(err, HarnessError::InvalidConfig(_)));
}

/// Test: the shipped config file loads.
#[test]
fn test_shipped_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/stress.toml");
    let config = StressConfig::from_file(path).unwrap();
    assert_eq!(config.strategy, StrategyKind::Boxed);
    assert_eq!(config.writers, 4);
}
