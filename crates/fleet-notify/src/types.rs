use chrono::{DateTime, Utc};
use fleet_core::types::{Deployment, HealthCheck, Service};
use serde::{Deserialize, Serialize};

/// Category of fleet state a subscriber can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Deployments,
    HealthChecks,
    Metrics,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Deployments, Topic::HealthChecks, Topic::Metrics];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Deployments => "deployments",
            Topic::HealthChecks => "health_checks",
            Topic::Metrics => "metrics",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Topic {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "deployments" => Ok(Topic::Deployments),
            "health_checks" | "healthchecks" => Ok(Topic::HealthChecks),
            "metrics" => Ok(Topic::Metrics),
            other => Err(format!(
                "invalid topic '{other}'. valid values: deployments, health_checks, metrics"
            )),
        }
    }
}

/// Current contents of one topic, handed to every subscriber of that topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "topic", content = "items")]
pub enum FleetSnapshot {
    Deployments(Vec<Deployment>),
    HealthChecks(Vec<HealthCheck>),
    /// Service records, which carry the cpu/memory/network/cost metrics.
    Metrics(Vec<Service>),
}

impl FleetSnapshot {
    pub fn topic(&self) -> Topic {
        match self {
            FleetSnapshot::Deployments(_) => Topic::Deployments,
            FleetSnapshot::HealthChecks(_) => Topic::HealthChecks,
            FleetSnapshot::Metrics(_) => Topic::Metrics,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FleetSnapshot::Deployments(items) => items.len(),
            FleetSnapshot::HealthChecks(items) => items.len(),
            FleetSnapshot::Metrics(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A delivery that did not complete because the subscriber panicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFailure {
    pub topic: Topic,
    pub subscriber_id: u64,
    pub error: String,
    pub at: DateTime<Utc>,
}
