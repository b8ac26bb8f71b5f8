//! Per-tick mutation logic.
//!
//! A tick is a pure function of the store, the generator and the clock. It
//! never awaits, so a running tick always completes before the scheduler can
//! observe a stop request.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use fleet_core::config::SimulatorConfig;
use fleet_core::events::{FleetEvent, FleetEventKind};
use fleet_core::types::DeploymentStatus;
use fleet_notify::{topics_for_event, Topic};
use rand::Rng;

use crate::catalog::Catalog;
use crate::dependency_graph::DependencyGraph;
use crate::generator::{self, DeploymentDraft};
use crate::injector::{inject_issue, InjectionSummary, IssueTarget};
use crate::recovery::{recover, RecoverySummary};
use crate::sampler::roll;
use crate::store::FleetState;
use crate::swap::{find_partner, swap_statuses};

/// Read-only inputs shared by every mutation.
#[derive(Debug, Clone, Copy)]
pub struct EngineContext<'a> {
    pub catalog: &'a Catalog,
    pub graph: &'a DependencyGraph,
    pub config: &'a SimulatorConfig,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub events: Vec<FleetEvent>,
    /// Topics whose snapshots changed and must be published.
    pub touched: BTreeSet<Topic>,
    pub injected: Option<InjectionSummary>,
    pub recovered: Vec<RecoverySummary>,
}

impl TickReport {
    pub fn record(&mut self, at: DateTime<Utc>, kind: FleetEventKind) {
        self.touched.extend(topics_for_event(&kind).iter().copied());
        self.events.push(FleetEvent::new(at, kind));
    }

    pub fn touches(&self, topic: Topic) -> bool {
        self.touched.contains(&topic)
    }
}

pub fn tick<R: Rng + ?Sized>(
    state: &mut FleetState,
    ctx: &EngineContext<'_>,
    rng: &mut R,
    now: DateTime<Utc>,
) -> TickReport {
    let probabilities = &ctx.config.probabilities;
    let mut report = TickReport::default();

    if roll(rng, probabilities.spawn_deployments) {
        let count = rng.gen_range(1..=3);
        let ids = spawn_deployments(state, ctx, rng, now, count);
        report.record(now, FleetEventKind::DeploymentsSpawned { ids });
    }

    if roll(rng, probabilities.redistribute) {
        let swaps = redistribute(state, rng, now, ctx.config.limits.max_redistribution_swaps);
        if swaps > 0 {
            report.record(now, FleetEventKind::HealthRedistributed { swaps });
        }
    }

    if !state.has_active_issue() && roll(rng, probabilities.inject_issue) {
        let summary = inject_issue(state, ctx, rng, now, None);
        record_injection(&mut report, now, &summary);
        report.injected = Some(summary);
    }

    for kind in resolve_deployments(state, ctx, rng, now) {
        report.record(now, kind);
    }

    let due = state
        .active_issues
        .iter()
        .filter(|issue| issue.is_due(now))
        .map(|issue| IssueTarget::new(issue.affected_service.clone(), issue.region.clone()))
        .collect::<Vec<_>>();
    for target in due {
        let summary = recover(state, ctx, rng, now, &target.service, &target.region);
        record_recovery(&mut report, now, &summary);
        report.recovered.push(summary);
    }

    let services = drift_service_metrics(state, rng);
    if services > 0 {
        report.record(now, FleetEventKind::MetricsDrifted { services });
    }

    tracing::debug!(
        events = report.events.len(),
        touched = ?report.touched,
        "fleet tick complete"
    );
    report
}

/// Prepend `count` fresh deployments, returning their ids newest first.
pub fn spawn_deployments<R: Rng + ?Sized>(
    state: &mut FleetState,
    ctx: &EngineContext<'_>,
    rng: &mut R,
    now: DateTime<Utc>,
    count: usize,
) -> Vec<String> {
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let id = state.next_deployment_id();
        let deployment = generator::deployment(
            id.clone(),
            DeploymentDraft::default(),
            ctx.catalog,
            rng,
            now,
        );
        state.push_deployment_front(deployment, ctx.config.limits.max_deployments);
        ids.insert(0, id);
    }
    ids
}

/// Exchange statuses between up to `max_swaps` pairs of differently-healthy
/// checks, returning how many swaps happened.
pub fn redistribute<R: Rng + ?Sized>(
    state: &mut FleetState,
    rng: &mut R,
    now: DateTime<Utc>,
    max_swaps: usize,
) -> usize {
    if state.health_checks.len() < 2 || max_swaps == 0 {
        return 0;
    }
    let swaps = rng.gen_range(1..=max_swaps);
    let mut done = 0;
    for _ in 0..swaps {
        let first = rng.gen_range(0..state.health_checks.len());
        let status = state.health_checks[first].status;
        let Some(second) = find_partner(&state.health_checks, rng, |check| check.status != status)
        else {
            continue;
        };
        swap_statuses(&mut state.health_checks, first, second, now);
        for index in [first, second] {
            let check = &mut state.health_checks[index];
            check.metrics = generator::metrics_for(check.status, rng);
        }
        done += 1;
    }
    if done > 0 {
        state.refresh_service_statuses();
    }
    done
}

/// Give each in-progress deployment a chance to finish.
pub fn resolve_deployments<R: Rng + ?Sized>(
    state: &mut FleetState,
    ctx: &EngineContext<'_>,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Vec<FleetEventKind> {
    let probabilities = &ctx.config.probabilities;
    let mut resolved = Vec::new();
    for deployment in &mut state.deployments {
        if deployment.status != DeploymentStatus::InProgress
            || !roll(rng, probabilities.resolve_deployment)
        {
            continue;
        }
        let status = if roll(rng, probabilities.deployment_success) {
            DeploymentStatus::Success
        } else {
            DeploymentStatus::Failure
        };
        let elapsed = (now - deployment.timestamp).num_seconds().max(1);
        if deployment.resolve(status, elapsed.unsigned_abs()) {
            resolved.push(FleetEventKind::DeploymentResolved {
                id: deployment.id.clone(),
                service: deployment.service.clone(),
                status,
            });
        }
    }
    resolved
}

/// Nudge every service's utilization metrics, returning how many moved.
pub fn drift_service_metrics<R: Rng + ?Sized>(state: &mut FleetState, rng: &mut R) -> usize {
    for service in &mut state.services {
        generator::drift_metrics(&mut service.metrics, rng);
    }
    state.services.len()
}

pub fn record_injection(report: &mut TickReport, at: DateTime<Utc>, summary: &InjectionSummary) {
    report.record(
        at,
        FleetEventKind::IssueInjected {
            scenario: summary.scenario.clone(),
            service: summary.service.clone(),
            region: summary.region.clone(),
            cascade_targets: summary.cascade_targets.clone(),
        },
    );
    for effect in &summary.cascade {
        report.record(
            at,
            FleetEventKind::CascadeDegraded {
                root_service: summary.service.clone(),
                dependent: effect.dependent.clone(),
                check_id: effect.check_id.clone(),
                status: effect.status,
            },
        );
    }
    tracing::info!(
        scenario = %summary.scenario,
        service = %summary.service,
        region = %summary.region,
        auto_recovery = summary.auto_recovery,
        expected_recovery = %summary.expected_recovery_time,
        cascade = ?summary.cascade_targets,
        "injected fleet issue"
    );
}

pub fn record_recovery(report: &mut TickReport, at: DateTime<Utc>, summary: &RecoverySummary) {
    report.record(
        at,
        FleetEventKind::IssueRecovered {
            service: summary.service.clone(),
            region: summary.region.clone(),
            recovery_action: summary.recovery_action.clone(),
            healed_checks: summary.healed_checks,
            recovered_dependents: summary.recovered_dependents.clone(),
        },
    );
    tracing::info!(
        service = %summary.service,
        region = %summary.region,
        action = %summary.recovery_action,
        healed = summary.healed_checks,
        dependents = ?summary.recovered_dependents,
        "recovered fleet issue"
    );
}
