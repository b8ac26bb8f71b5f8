//! Correlated outage injection.

use chrono::{DateTime, Duration, Utc};
use fleet_core::types::{ActiveIssue, DeploymentStatus, HealthCheck, HealthStatus};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::catalog::{pick_or, Catalog};
use crate::engine::EngineContext;
use crate::generator::{self, DeploymentDraft};
use crate::sampler::{pick_many, roll, uniform_pick};
use crate::store::FleetState;
use crate::swap::{find_partner, restyle, swap_statuses};

/// Explicit (service, region) pair to hit instead of a random one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueTarget {
    pub service: String,
    pub region: String,
}

impl IssueTarget {
    pub fn new(service: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            region: region.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeEffect {
    pub dependent: String,
    pub check_id: String,
    pub status: HealthStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionSummary {
    pub service: String,
    pub region: String,
    pub scenario: String,
    pub expected_recovery_time: DateTime<Utc>,
    pub auto_recovery: bool,
    /// Ids of the pair's checks that were degraded.
    pub degraded_checks: Vec<String>,
    pub deployment_id: String,
    pub cascade: Vec<CascadeEffect>,
    /// Dependents that actually received a cascaded failure.
    pub cascade_targets: Vec<String>,
}

/// Start an outage on one (service, region) pair.
///
/// Every health change is a swap with a check elsewhere in the fleet, so the
/// status counts are the same before and after.
pub fn inject_issue<R: Rng + ?Sized>(
    state: &mut FleetState,
    ctx: &EngineContext<'_>,
    rng: &mut R,
    now: DateTime<Utc>,
    target: Option<IssueTarget>,
) -> InjectionSummary {
    let catalog = ctx.catalog;
    let probabilities = &ctx.config.probabilities;
    let limits = &ctx.config.limits;

    let scenario = catalog.pick_scenario(rng);
    let IssueTarget { service, region } = target.unwrap_or_else(|| {
        let service = uniform_pick(&scenario.candidate_services, rng)
            .cloned()
            .unwrap_or_else(|| catalog.pick_service(rng));
        IssueTarget {
            service,
            region: catalog.pick_region(rng),
        }
    });

    let (min_minutes, max_minutes) = scenario.recovery_bounds();
    let expected_recovery_time =
        now + Duration::minutes(i64::from(rng.gen_range(min_minutes..=max_minutes)));
    let auto_recovery = roll(rng, probabilities.auto_recovery);

    let degraded_checks = degrade_pair(
        state,
        rng,
        now,
        &service,
        &region,
        limits.max_degraded_checks,
        |rng| pick_or(&scenario.messages, &scenario.name, rng),
        &scenario.resource_types,
        catalog,
    );

    let deployment_id = state.next_deployment_id();
    let environment = state.service_environment(&service);
    let deployment = generator::deployment(
        deployment_id.clone(),
        DeploymentDraft {
            service: Some(service.clone()),
            environment,
            region: Some(region.clone()),
            version: None,
            status: Some(DeploymentStatus::Failure),
        },
        catalog,
        rng,
        now,
    );
    state.push_deployment_front(deployment, limits.max_deployments);

    state.active_issues.push(ActiveIssue {
        scenario_name: scenario.name.clone(),
        affected_service: service.clone(),
        region: region.clone(),
        start_time: now,
        expected_recovery_time,
        auto_recovery,
    });

    let mut cascade = Vec::new();
    let dependents = ctx.graph.dependents_of(&service);
    if !dependents.is_empty() && roll(rng, probabilities.cascade) {
        let chosen = pick_many(&dependents, limits.max_cascade_targets, rng)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        for dependent in chosen {
            if let Some(effect) = cascade_to(
                state,
                rng,
                now,
                &service,
                &region,
                &dependent,
                &scenario.name,
                catalog,
            ) {
                cascade.push(effect);
            }
        }
    }
    let cascade_targets = cascade
        .iter()
        .map(|effect| effect.dependent.clone())
        .collect();

    state.refresh_service_statuses();

    InjectionSummary {
        service,
        region,
        scenario: scenario.name,
        expected_recovery_time,
        auto_recovery,
        degraded_checks,
        deployment_id,
        cascade,
        cascade_targets,
    }
}

#[allow(clippy::too_many_arguments)]
fn degrade_pair<R, M>(
    state: &mut FleetState,
    rng: &mut R,
    now: DateTime<Utc>,
    service: &str,
    region: &str,
    max_checks: usize,
    scenario_message: M,
    resource_types: &[String],
    catalog: &Catalog,
) -> Vec<String>
where
    R: Rng + ?Sized,
    M: Fn(&mut R) -> String,
{
    let mut targets = state
        .health_checks
        .iter()
        .enumerate()
        .filter(|(_, check)| check.belongs_to(service, region) && check.status.is_healthy())
        .map(|(index, _)| index)
        .collect::<Vec<_>>();
    targets.shuffle(rng);
    targets.truncate(max_checks);

    if targets.is_empty() && max_checks > 0 {
        if let Some(donor) = rehome_donor(state, rng, service, region, resource_types) {
            targets.push(donor);
        }
    }

    let mut degraded = Vec::new();
    for index in targets {
        let partner = find_partner(&state.health_checks, rng, |check| {
            !check.status.is_healthy() && !check.belongs_to(service, region)
        });
        let Some(partner) = partner else {
            continue;
        };
        swap_statuses(&mut state.health_checks, index, partner, now);
        let message = scenario_message(rng);
        restyle(&mut state.health_checks[index], message, rng);
        let normal = generator::message_for(HealthStatus::Healthy, catalog, rng);
        restyle(&mut state.health_checks[partner], normal, rng);
        degraded.push(state.health_checks[index].id.clone());
    }
    degraded
}

/// Move a healthy check from another pair onto (service, region).
///
/// Only services with at least two checks give one up, so no service loses
/// its last check.
fn rehome_donor<R: Rng + ?Sized>(
    state: &mut FleetState,
    rng: &mut R,
    service: &str,
    region: &str,
    resource_types: &[String],
) -> Option<usize> {
    let candidates = state
        .health_checks
        .iter()
        .enumerate()
        .filter(|(_, check)| {
            check.status.is_healthy()
                && !check.belongs_to(service, region)
                && state.check_count(&check.service) >= 2
        })
        .map(|(index, _)| index)
        .collect::<Vec<_>>();
    let donor = *uniform_pick(&candidates, rng)?;

    let check = &mut state.health_checks[donor];
    let resource_type = pick_or(resource_types, &check.resource_type, rng);
    tracing::debug!(
        check_id = %check.id,
        from_service = %check.service,
        from_region = %check.region,
        to_service = service,
        to_region = region,
        "re-homing healthy check onto outage pair"
    );
    check.service = service.to_string();
    check.region = region.to_string();
    check.resource = generator::resource_name(service, &resource_type, rng);
    check.resource_type = resource_type;
    Some(donor)
}

#[allow(clippy::too_many_arguments)]
fn cascade_to<R: Rng + ?Sized>(
    state: &mut FleetState,
    rng: &mut R,
    now: DateTime<Utc>,
    root: &str,
    region: &str,
    dependent: &str,
    scenario: &str,
    catalog: &Catalog,
) -> Option<CascadeEffect> {
    let healthy = |check: &HealthCheck| check.service == dependent && check.status.is_healthy();
    let index = find_partner(&state.health_checks, rng, |check| {
        healthy(check) && check.region == region
    })
    .or_else(|| find_partner(&state.health_checks, rng, healthy))?;

    let outside = |status: HealthStatus, check: &HealthCheck| {
        check.status == status && check.service != root && check.service != dependent
    };
    let partner = find_partner(&state.health_checks, rng, |check| {
        outside(HealthStatus::Degraded, check)
    })
    .or_else(|| {
        find_partner(&state.health_checks, rng, |check| {
            outside(HealthStatus::Unhealthy, check)
        })
    })?;

    swap_statuses(&mut state.health_checks, index, partner, now);
    let message = format!("Upstream dependency {root} failing ({scenario})");
    restyle(&mut state.health_checks[index], message, rng);
    let normal = generator::message_for(HealthStatus::Healthy, catalog, rng);
    restyle(&mut state.health_checks[partner], normal, rng);

    let check = &state.health_checks[index];
    Some(CascadeEffect {
        dependent: dependent.to_string(),
        check_id: check.id.clone(),
        status: check.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency_graph::build_dependency_graph;
    use crate::swap::mentions_service;
    use fleet_core::config::{FixtureConfig, SimulatorConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        catalog: Catalog,
        graph: crate::dependency_graph::DependencyGraph,
        config: SimulatorConfig,
        state: FleetState,
        rng: StdRng,
    }

    impl Fixture {
        fn new(seed: u64) -> Self {
            let catalog = Catalog::default();
            let graph = build_dependency_graph(&catalog.services);
            let config = SimulatorConfig::default();
            let mut state = FleetState::new();
            let mut rng = StdRng::seed_from_u64(seed);
            state.ensure_seeded(&catalog, &FixtureConfig::default(), &mut rng, Utc::now());
            Self {
                catalog,
                graph,
                config,
                state,
                rng,
            }
        }

        fn inject(&mut self, target: Option<IssueTarget>) -> InjectionSummary {
            let ctx = EngineContext {
                catalog: &self.catalog,
                graph: &self.graph,
                config: &self.config,
            };
            inject_issue(&mut self.state, &ctx, &mut self.rng, Utc::now(), target)
        }
    }

    #[test]
    fn targeted_injection_degrades_the_pair_and_logs_a_failure() {
        let mut fixture = Fixture::new(3);
        let before = fixture.state.status_counts();
        let summary = fixture.inject(Some(IssueTarget::new("malaphor-api", "us-east-1")));

        assert_eq!(summary.service, "malaphor-api");
        assert_eq!(summary.region, "us-east-1");
        assert_eq!(fixture.state.status_counts(), before);
        assert_eq!(fixture.state.active_issues().len(), 1);

        let pair_failing = fixture
            .state
            .health_checks
            .iter()
            .filter(|check| check.belongs_to("malaphor-api", "us-east-1"))
            .any(|check| !check.status.is_healthy());
        assert!(pair_failing);

        let head = &fixture.state.deployments[0];
        assert_eq!(head.id, summary.deployment_id);
        assert_eq!(head.service, "malaphor-api");
        assert_eq!(head.status, DeploymentStatus::Failure);
    }

    #[test]
    fn empty_pair_gets_a_rehomed_check() {
        let mut fixture = Fixture::new(5);
        let before = fixture.state.status_counts();
        let summary = fixture.inject(Some(IssueTarget::new("malaphor-queue", "mars-central-1")));

        assert_eq!(summary.degraded_checks.len(), 1);
        assert_eq!(fixture.state.status_counts(), before);
        assert_eq!(fixture.state.health_checks.len(), 92);
        let check = fixture
            .state
            .health_checks
            .iter()
            .find(|check| check.id == summary.degraded_checks[0])
            .expect("degraded check");
        assert!(check.belongs_to("malaphor-queue", "mars-central-1"));
        assert!(!check.status.is_healthy());
        assert!(check.resource.starts_with("malaphor-queue-"));
    }

    #[test]
    fn degradation_is_capped() {
        let mut fixture = Fixture::new(8);
        fixture.config.limits.max_degraded_checks = 1;
        for check in &mut fixture.state.health_checks {
            if check.service == "malaphor-db" {
                check.region = "us-east-1".to_string();
            }
        }
        let summary = fixture.inject(Some(IssueTarget::new("malaphor-db", "us-east-1")));
        assert!(summary.degraded_checks.len() <= 1);
    }

    #[test]
    fn cascade_only_reaches_direct_dependents() {
        for seed in 0..20 {
            let mut fixture = Fixture::new(seed);
            fixture.config.probabilities.cascade = 1.0;
            let before = fixture.state.status_counts();
            let summary = fixture.inject(Some(IssueTarget::new("malaphor-db", "us-east-1")));
            let dependents = fixture.graph.dependents_of("malaphor-db");

            assert!(summary.cascade_targets.len() <= 2);
            for effect in &summary.cascade {
                assert!(dependents.contains(&effect.dependent));
                assert!(!effect.status.is_healthy());
                let check = fixture
                    .state
                    .health_checks
                    .iter()
                    .find(|check| check.id == effect.check_id)
                    .expect("cascaded check");
                assert!(mentions_service(&check.message, "malaphor-db"));
            }
            for check in &fixture.state.health_checks {
                if check.service != "malaphor-db"
                    && mentions_service(&check.message, "malaphor-db")
                {
                    assert!(dependents.contains(&check.service), "{}", check.service);
                }
            }
            assert_eq!(fixture.state.status_counts(), before);
        }
    }

    #[test]
    fn no_cascade_when_probability_is_zero() {
        let mut fixture = Fixture::new(4);
        fixture.config.probabilities.cascade = 0.0;
        let summary = fixture.inject(Some(IssueTarget::new("malaphor-db", "us-east-1")));
        assert!(summary.cascade.is_empty());
        assert!(summary.cascade_targets.is_empty());
    }

    #[test]
    fn random_injection_uses_scenario_window() {
        let mut fixture = Fixture::new(12);
        let started = Utc::now();
        let summary = fixture.inject(None);
        let minutes = (summary.expected_recovery_time - started).num_minutes();
        assert!((4..=15).contains(&minutes), "{minutes}");
        assert!(fixture.catalog.service(&summary.service).is_some());
    }
}
