//! Configuration types for the fleet simulator.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config at {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },
    #[error("failed to create config parent directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level simulator configuration. Every section may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub probabilities: ProbabilityConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub fixtures: FixtureConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Fixed RNG seed; entropy is used when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            seed: None,
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    10_000
}

/// Per-tick dice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityConfig {
    pub spawn_deployments: f64,
    pub redistribute: f64,
    pub inject_issue: f64,
    pub resolve_deployment: f64,
    pub deployment_success: f64,
    pub auto_recovery: f64,
    pub cascade: f64,
}

impl ProbabilityConfig {
    pub fn named(&self) -> [(&'static str, f64); 7] {
        [
            ("spawn_deployments", self.spawn_deployments),
            ("redistribute", self.redistribute),
            ("inject_issue", self.inject_issue),
            ("resolve_deployment", self.resolve_deployment),
            ("deployment_success", self.deployment_success),
            ("auto_recovery", self.auto_recovery),
            ("cascade", self.cascade),
        ]
    }
}

impl Default for ProbabilityConfig {
    fn default() -> Self {
        Self {
            spawn_deployments: 0.15,
            redistribute: 0.20,
            inject_issue: 0.05,
            resolve_deployment: 0.30,
            deployment_success: 0.80,
            auto_recovery: 0.80,
            cascade: 0.70,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_deployments: usize,
    pub max_redistribution_swaps: usize,
    pub max_degraded_checks: usize,
    pub max_cascade_targets: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_deployments: 50,
            max_redistribution_swaps: 3,
            max_degraded_checks: 4,
            max_cascade_targets: 2,
        }
    }
}

/// Size and skew of the seeded fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    pub healthy: usize,
    pub degraded: usize,
    pub unhealthy: usize,
    pub initial_deployments: usize,
}

impl FixtureConfig {
    pub fn total_checks(&self) -> usize {
        self.healthy + self.degraded + self.unhealthy
    }
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            healthy: 16,
            degraded: 36,
            unhealthy: 40,
            initial_deployments: 15,
        }
    }
}

pub fn parse_config(contents: &str) -> Result<SimulatorConfig, toml::de::Error> {
    toml::from_str(contents)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<SimulatorConfig, ConfigError> {
    let path_ref = path.as_ref();
    let body = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
        path: path_ref.to_path_buf(),
        source,
    })?;
    parse_config(&body).map_err(|source| ConfigError::Parse {
        path: path_ref.to_path_buf(),
        source,
    })
}

pub fn save_config(path: impl AsRef<Path>, config: &SimulatorConfig) -> Result<(), ConfigError> {
    let path_ref = path.as_ref();
    if let Some(parent_dir) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent_dir).map_err(|source| ConfigError::CreateDir {
            path: parent_dir.to_path_buf(),
            source,
        })?;
    }

    let body = toml::to_string_pretty(config).map_err(|source| ConfigError::Serialize {
        path: path_ref.to_path_buf(),
        source,
    })?;
    fs::write(path_ref, body).map_err(|source| ConfigError::Write {
        path: path_ref.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").expect("parse empty config");
        assert_eq!(config, SimulatorConfig::default());
        assert_eq!(config.scheduler.tick_interval(), Duration::from_secs(10));
        assert_eq!(config.fixtures.total_checks(), 92);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = parse_config(
            r#"
[scheduler]
tick_interval_ms = 250
seed = 7

[probabilities]
inject_issue = 1.0

[limits]
max_deployments = 20
"#,
        )
        .expect("parse config");

        assert_eq!(config.scheduler.tick_interval_ms, 250);
        assert_eq!(config.scheduler.seed, Some(7));
        assert_eq!(config.probabilities.inject_issue, 1.0);
        assert_eq!(config.probabilities.cascade, 0.70);
        assert_eq!(config.limits.max_deployments, 20);
        assert_eq!(config.limits.max_cascade_targets, 2);
        assert_eq!(config.fixtures, FixtureConfig::default());
    }

    #[test]
    fn unknown_type_is_a_parse_error() {
        let err = parse_config("[scheduler]\ntick_interval_ms = \"fast\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn save_then_load_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("fleet.toml");
        let mut config = SimulatorConfig::default();
        config.scheduler.seed = Some(42);
        config.fixtures.healthy = 20;

        save_config(&path, &config).expect("save config");
        let loaded = load_config(&path).expect("load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.toml");
        let err = load_config(&path).expect_err("missing file should fail");
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("missing.toml"));
    }
}
