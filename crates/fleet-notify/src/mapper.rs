//! Map fleet events to the topics whose snapshots they invalidate.

use fleet_core::events::FleetEventKind;

use crate::types::Topic;

/// Topics a subscriber must be told about after `kind` happened.
pub fn topics_for_event(kind: &FleetEventKind) -> &'static [Topic] {
    match kind {
        FleetEventKind::DeploymentsSpawned { .. }
        | FleetEventKind::DeploymentCreated { .. }
        | FleetEventKind::DeploymentResolved { .. } => &[Topic::Deployments],
        FleetEventKind::HealthRedistributed { .. } | FleetEventKind::CascadeDegraded { .. } => {
            &[Topic::HealthChecks, Topic::Metrics]
        }
        FleetEventKind::IssueInjected { .. } => {
            &[Topic::Deployments, Topic::HealthChecks, Topic::Metrics]
        }
        FleetEventKind::IssueRecovered { .. } => &[Topic::HealthChecks, Topic::Metrics],
        FleetEventKind::MetricsDrifted { .. } => &[Topic::Metrics],
    }
}

#[cfg(test)]
mod tests {
    use fleet_core::events::FleetEventKind;
    use fleet_core::types::DeploymentStatus;

    use super::topics_for_event;
    use crate::types::Topic;

    #[test]
    fn deployment_events_touch_only_deployments() {
        let kind = FleetEventKind::DeploymentResolved {
            id: "deploy-1".to_string(),
            service: "malaphor-api".to_string(),
            status: DeploymentStatus::Success,
        };
        assert_eq!(topics_for_event(&kind), &[Topic::Deployments]);
    }

    #[test]
    fn injected_issue_touches_every_topic() {
        let kind = FleetEventKind::IssueInjected {
            scenario: "Memory Leak".to_string(),
            service: "malaphor-api".to_string(),
            region: "us-east-1".to_string(),
            cascade_targets: Vec::new(),
        };
        assert_eq!(topics_for_event(&kind), &Topic::ALL);
    }

    #[test]
    fn health_changes_refresh_service_metrics() {
        let kind = FleetEventKind::HealthRedistributed { swaps: 1 };
        assert!(topics_for_event(&kind).contains(&Topic::Metrics));
    }
}
