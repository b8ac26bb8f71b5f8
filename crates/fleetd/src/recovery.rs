//! Recovery of a failing (service, region) pair and its cascade.

use chrono::{DateTime, Utc};
use fleet_core::types::{ActiveIssue, HealthCheck, HealthStatus};
use rand::Rng;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::engine::EngineContext;
use crate::generator;
use crate::store::FleetState;
use crate::swap::{find_partner_preferring, mentions_service, restyle, swap_statuses};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverySummary {
    pub service: String,
    pub region: String,
    /// The active issue that was cleared, if one matched.
    pub issue: Option<ActiveIssue>,
    pub recovery_action: String,
    pub healed_checks: usize,
    pub recovered_dependents: Vec<String>,
}

impl RecoverySummary {
    pub fn issue_found(&self) -> bool {
        self.issue.is_some()
    }

    pub fn scenario(&self) -> Option<&str> {
        self.issue
            .as_ref()
            .map(|issue| issue.scenario_name.as_str())
    }
}

/// Heal a (service, region) pair and the cascade it caused.
///
/// Recovering a pair with no active issue still heals its checks; it is never
/// an error.
pub fn recover<R: Rng + ?Sized>(
    state: &mut FleetState,
    ctx: &EngineContext<'_>,
    rng: &mut R,
    now: DateTime<Utc>,
    service: &str,
    region: &str,
) -> RecoverySummary {
    let issue = state
        .active_issues
        .iter()
        .position(|issue| issue.matches(service, region))
        .map(|index| state.active_issues.remove(index));

    let dependents = ctx.graph.dependents_of(service);
    let protected = protected_pairs(&state.active_issues);
    // Regions where `service` is still failing keep their cascaded checks.
    let still_failing = state
        .active_issues
        .iter()
        .filter(|issue| issue.affected_service == service && issue.region != region)
        .map(|issue| issue.region.clone())
        .collect::<Vec<_>>();

    let pair = state
        .health_checks
        .iter()
        .enumerate()
        .filter(|(_, check)| check.belongs_to(service, region) && !check.status.is_healthy())
        .map(|(index, _)| index)
        .collect::<Vec<_>>();
    let mut healed_checks = 0;
    for index in pair {
        let outside_pair =
            |check: &HealthCheck| check.status.is_healthy() && !check.belongs_to(service, region);
        let spared = |check: &HealthCheck| {
            outside_pair(check)
                && !dependents.contains(&check.service)
                && !protected.iter().any(|(s, r)| check.belongs_to(s, r))
        };
        if heal(
            state,
            rng,
            now,
            index,
            &[&spared, &outside_pair],
            ctx.catalog,
        ) {
            healed_checks += 1;
        }
    }

    let mut recovered_dependents = Vec::new();
    for dependent in &dependents {
        let cascaded = state
            .health_checks
            .iter()
            .enumerate()
            .filter(|(_, check)| {
                check.service == *dependent
                    && !check.status.is_healthy()
                    && !still_failing.contains(&check.region)
                    && mentions_service(&check.message, service)
            })
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        let mut healed_any = false;
        for index in cascaded {
            let elsewhere = |check: &HealthCheck| {
                check.status.is_healthy()
                    && check.service != *dependent
                    && !check.belongs_to(service, region)
            };
            if heal(state, rng, now, index, &[&elsewhere], ctx.catalog) {
                healed_checks += 1;
                healed_any = true;
            }
        }
        if healed_any && !recovered_dependents.contains(dependent) {
            recovered_dependents.push(dependent.clone());
        }
    }

    state.refresh_service_statuses();

    RecoverySummary {
        service: service.to_string(),
        region: region.to_string(),
        issue,
        recovery_action: ctx.catalog.pick_recovery_action(rng),
        healed_checks,
        recovered_dependents,
    }
}

/// Swap a non-healthy check with a healthy partner chosen by the first
/// predicate that finds one.
fn heal<R: Rng + ?Sized>(
    state: &mut FleetState,
    rng: &mut R,
    now: DateTime<Utc>,
    index: usize,
    predicates: &[&dyn Fn(&HealthCheck) -> bool],
    catalog: &Catalog,
) -> bool {
    let Some(partner) = find_partner_preferring(&state.health_checks, rng, predicates) else {
        tracing::debug!(
            check_id = %state.health_checks[index].id,
            "no healthy partner left to absorb the failure"
        );
        return false;
    };

    swap_statuses(&mut state.health_checks, index, partner, now);
    let healed = generator::message_for(HealthStatus::Healthy, catalog, rng);
    restyle(&mut state.health_checks[index], healed, rng);
    let vacated = state.health_checks[partner].status;
    let generic = generator::message_for(vacated, catalog, rng);
    restyle(&mut state.health_checks[partner], generic, rng);
    true
}

fn protected_pairs(issues: &[ActiveIssue]) -> Vec<(String, String)> {
    issues
        .iter()
        .map(|issue| (issue.affected_service.clone(), issue.region.clone()))
        .collect()
}
