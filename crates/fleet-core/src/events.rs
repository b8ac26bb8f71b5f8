use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DeploymentStatus, HealthStatus};

/// Something the simulator did to the fleet during a tick or an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetEvent {
    pub at: DateTime<Utc>,
    pub kind: FleetEventKind,
}

impl FleetEvent {
    pub fn new(at: DateTime<Utc>, kind: FleetEventKind) -> Self {
        Self { at, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum FleetEventKind {
    DeploymentsSpawned {
        ids: Vec<String>,
    },
    DeploymentCreated {
        id: String,
        service: String,
    },
    DeploymentResolved {
        id: String,
        service: String,
        status: DeploymentStatus,
    },
    HealthRedistributed {
        swaps: usize,
    },
    IssueInjected {
        scenario: String,
        service: String,
        region: String,
        cascade_targets: Vec<String>,
    },
    CascadeDegraded {
        root_service: String,
        dependent: String,
        check_id: String,
        status: HealthStatus,
    },
    IssueRecovered {
        service: String,
        region: String,
        recovery_action: String,
        healed_checks: usize,
        recovered_dependents: Vec<String>,
    },
    MetricsDrifted {
        services: usize,
    },
}

impl FleetEventKind {
    pub fn tag(&self) -> &'static str {
        match self {
            FleetEventKind::DeploymentsSpawned { .. } => "deployments_spawned",
            FleetEventKind::DeploymentCreated { .. } => "deployment_created",
            FleetEventKind::DeploymentResolved { .. } => "deployment_resolved",
            FleetEventKind::HealthRedistributed { .. } => "health_redistributed",
            FleetEventKind::IssueInjected { .. } => "issue_injected",
            FleetEventKind::CascadeDegraded { .. } => "cascade_degraded",
            FleetEventKind::IssueRecovered { .. } => "issue_recovered",
            FleetEventKind::MetricsDrifted { .. } => "metrics_drifted",
        }
    }
}

impl std::fmt::Display for FleetEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FleetEventKind::DeploymentsSpawned { ids } => {
                write!(f, "spawned {} deployment(s)", ids.len())
            }
            FleetEventKind::DeploymentCreated { id, service } => {
                write!(f, "created deployment {id} for {service}")
            }
            FleetEventKind::DeploymentResolved {
                id,
                service,
                status,
            } => write!(f, "deployment {id} for {service} finished: {status}"),
            FleetEventKind::HealthRedistributed { swaps } => {
                write!(f, "redistributed health across {swaps} swap(s)")
            }
            FleetEventKind::IssueInjected {
                scenario,
                service,
                region,
                cascade_targets,
            } => {
                write!(f, "{scenario} hit {service} in {region}")?;
                if !cascade_targets.is_empty() {
                    write!(f, " (cascade: {})", cascade_targets.join(", "))?;
                }
                Ok(())
            }
            FleetEventKind::CascadeDegraded {
                root_service,
                dependent,
                check_id,
                status,
            } => write!(
                f,
                "{dependent} check {check_id} is {status} because of {root_service}"
            ),
            FleetEventKind::IssueRecovered {
                service,
                region,
                recovery_action,
                healed_checks,
                recovered_dependents,
            } => {
                write!(
                    f,
                    "{service} in {region} recovered via {recovery_action} ({healed_checks} check(s) healed)"
                )?;
                if !recovered_dependents.is_empty() {
                    write!(f, ", dependents: {}", recovered_dependents.join(", "))?;
                }
                Ok(())
            }
            FleetEventKind::MetricsDrifted { services } => {
                write!(f, "metrics drifted for {services} service(s)")
            }
        }
    }
}
