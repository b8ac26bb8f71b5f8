//! Core types for the fleet simulator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentStatus {
    Success,
    Failure,
    InProgress,
}

impl DeploymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentStatus::Success => "success",
            DeploymentStatus::Failure => "failure",
            DeploymentStatus::InProgress => "in-progress",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, DeploymentStatus::InProgress)
    }
}

impl std::str::FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "success" => Ok(DeploymentStatus::Success),
            "failure" => Ok(DeploymentStatus::Failure),
            "in-progress" | "in_progress" => Ok(DeploymentStatus::InProgress),
            other => Err(format!(
                "invalid deployment status '{other}'. valid values: success, failure, in-progress"
            )),
        }
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status shared by health checks and services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub const ALL: [HealthStatus; 3] = [
        HealthStatus::Healthy,
        HealthStatus::Degraded,
        HealthStatus::Unhealthy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }

    pub fn is_healthy(self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl std::str::FromStr for HealthStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "healthy" => Ok(HealthStatus::Healthy),
            "degraded" => Ok(HealthStatus::Degraded),
            "unhealthy" => Ok(HealthStatus::Unhealthy),
            other => Err(format!(
                "invalid health status '{other}'. valid values: healthy, degraded, unhealthy"
            )),
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentArtifacts {
    pub image_tag: String,
    pub build_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub service: String,
    pub version: String,
    pub status: DeploymentStatus,
    pub environment: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub commit: String,
    pub commit_url: Option<String>,
    pub triggered_by: String,
    pub region: String,
    /// Seconds; `None` exactly while the deployment is in progress.
    pub duration: Option<u64>,
    pub artifacts: DeploymentArtifacts,
}

impl Deployment {
    /// Move an in-progress deployment to a terminal status.
    ///
    /// Returns `false` and leaves the record alone if it already finished or
    /// `status` is not terminal.
    pub fn resolve(&mut self, status: DeploymentStatus, duration_secs: u64) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.duration = Some(duration_secs);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckMetrics {
    /// Milliseconds.
    pub response_time: f64,
    /// Percentage in `0.0..=100.0`.
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub id: String,
    pub service: String,
    pub resource: String,
    pub resource_type: String,
    pub status: HealthStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub last_checked: DateTime<Utc>,
    pub region: String,
    pub metrics: CheckMetrics,
}

impl HealthCheck {
    pub fn belongs_to(&self, service: &str, region: &str) -> bool {
        self.service == service && self.region == region
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetrics {
    pub cpu: f64,
    pub memory: f64,
    pub network: f64,
    /// Monthly cost in USD.
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    pub region: String,
    pub environment: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub status: HealthStatus,
    /// Newest first.
    pub commits: Vec<Commit>,
    pub versions: Vec<String>,
    pub resources: BTreeMap<String, u32>,
    pub metrics: ServiceMetrics,
    pub dependencies: Vec<String>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveIssue {
    pub scenario_name: String,
    pub affected_service: String,
    pub region: String,
    pub start_time: DateTime<Utc>,
    pub expected_recovery_time: DateTime<Utc>,
    pub auto_recovery: bool,
}

impl ActiveIssue {
    pub fn matches(&self, service: &str, region: &str) -> bool {
        self.affected_service == service && self.region == region
    }

    /// Due for automatic recovery strictly after the expected time.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.auto_recovery && now > self.expected_recovery_time
    }
}

/// Number of health checks per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusCounts {
    pub healthy: usize,
    pub degraded: usize,
    pub unhealthy: usize,
}

impl StatusCounts {
    pub fn tally<'a>(statuses: impl IntoIterator<Item = &'a HealthStatus>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            counts.add(*status);
        }
        counts
    }

    pub fn add(&mut self, status: HealthStatus) {
        match status {
            HealthStatus::Healthy => self.healthy += 1,
            HealthStatus::Degraded => self.degraded += 1,
            HealthStatus::Unhealthy => self.unhealthy += 1,
        }
    }

    pub fn get(&self, status: HealthStatus) -> usize {
        match status {
            HealthStatus::Healthy => self.healthy,
            HealthStatus::Degraded => self.degraded,
            HealthStatus::Unhealthy => self.unhealthy,
        }
    }

    pub fn total(&self) -> usize {
        self.healthy + self.degraded + self.unhealthy
    }
}
