//! In-memory fleet store with lazy seeding and filtered reads.

use chrono::{DateTime, Duration, Utc};
use fleet_core::config::FixtureConfig;
use fleet_core::types::{ActiveIssue, Deployment, HealthCheck, HealthStatus, Service, StatusCounts};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::{Catalog, DEFAULT_SERVICE};
use crate::filter::{select, DeploymentFilter, HealthCheckFilter, ServiceFilter};
use crate::generator::{self, DeploymentDraft};

/// Everything the simulator knows about the fleet.
///
/// Deployments are kept newest first. Health checks keep their seeded order;
/// mutations only rewrite checks in place, so the list length never changes.
#[derive(Debug, Clone, Default)]
pub struct FleetState {
    pub(crate) deployments: Vec<Deployment>,
    pub(crate) health_checks: Vec<HealthCheck>,
    pub(crate) services: Vec<Service>,
    pub(crate) active_issues: Vec<ActiveIssue>,
    next_deployment: u64,
    next_check: u64,
    seeded: bool,
}

impl FleetState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the fixtures on first use.
    ///
    /// Returns `true` only for the call that actually seeded. A store that
    /// already holds data is marked seeded and left untouched.
    pub fn ensure_seeded<R: Rng + ?Sized>(
        &mut self,
        catalog: &Catalog,
        fixtures: &FixtureConfig,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> bool {
        if self.seeded {
            return false;
        }
        self.seeded = true;
        if !self.deployments.is_empty() || !self.health_checks.is_empty() {
            return false;
        }

        self.seed_health_checks(catalog, fixtures, rng, now);
        self.seed_deployments(catalog, fixtures.initial_deployments, rng, now);
        self.services = catalog
            .services
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                generator::service_record(format!("svc-{:02}", index + 1), spec, catalog, rng, now)
            })
            .collect();
        self.refresh_service_statuses();

        tracing::debug!(
            checks = self.health_checks.len(),
            deployments = self.deployments.len(),
            services = self.services.len(),
            "seeded fleet fixtures"
        );
        true
    }

    fn seed_health_checks<R: Rng + ?Sized>(
        &mut self,
        catalog: &Catalog,
        fixtures: &FixtureConfig,
        rng: &mut R,
        now: DateTime<Utc>,
    ) {
        let mut statuses = Vec::with_capacity(fixtures.total_checks());
        statuses.extend(std::iter::repeat(HealthStatus::Healthy).take(fixtures.healthy));
        statuses.extend(std::iter::repeat(HealthStatus::Degraded).take(fixtures.degraded));
        statuses.extend(std::iter::repeat(HealthStatus::Unhealthy).take(fixtures.unhealthy));
        statuses.shuffle(rng);

        let names = catalog.service_names();
        for (index, status) in statuses.into_iter().enumerate() {
            let service = names
                .get(index % names.len().max(1))
                .map(String::as_str)
                .unwrap_or(DEFAULT_SERVICE);
            let region = catalog.pick_region(rng);
            let resource_type = catalog.pick_resource_type(rng);
            let at = now - Duration::seconds(rng.gen_range(0..3_600));
            let id = self.next_check_id();
            let check = generator::health_check(
                id,
                service,
                &region,
                &resource_type,
                status,
                catalog,
                rng,
                at,
            );
            self.health_checks.push(check);
        }
    }

    fn seed_deployments<R: Rng + ?Sized>(
        &mut self,
        catalog: &Catalog,
        count: usize,
        rng: &mut R,
        now: DateTime<Utc>,
    ) {
        for _ in 0..count {
            let at = now - Duration::minutes(rng.gen_range(1..60 * 24 * 7));
            let id = self.next_deployment_id();
            let deployment =
                generator::deployment(id, DeploymentDraft::default(), catalog, rng, at);
            self.deployments.push(deployment);
        }
        self.deployments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }

    pub(crate) fn next_deployment_id(&mut self) -> String {
        self.next_deployment += 1;
        format!("deploy-{:04}", self.next_deployment)
    }

    pub(crate) fn next_check_id(&mut self) -> String {
        self.next_check += 1;
        format!("hc-{:04}", self.next_check)
    }

    pub fn deployments(&self, filter: &DeploymentFilter) -> Vec<Deployment> {
        select(&self.deployments, filter.limit, |item| filter.matches(item))
    }

    pub fn health_checks(&self, filter: &HealthCheckFilter) -> Vec<HealthCheck> {
        select(&self.health_checks, filter.limit, |item| filter.matches(item))
    }

    pub fn services(&self, filter: &ServiceFilter) -> Vec<Service> {
        select(&self.services, filter.limit, |item| filter.matches(item))
    }

    pub fn active_issues(&self) -> Vec<ActiveIssue> {
        self.active_issues.clone()
    }

    pub fn has_active_issue(&self) -> bool {
        !self.active_issues.is_empty()
    }

    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::tally(self.health_checks.iter().map(|check| &check.status))
    }

    /// Prepend and drop the oldest records beyond `max`.
    pub(crate) fn push_deployment_front(&mut self, deployment: Deployment, max: usize) {
        self.deployments.insert(0, deployment);
        if self.deployments.len() > max {
            self.deployments.truncate(max);
        }
    }

    pub(crate) fn service_environment(&self, service: &str) -> Option<String> {
        self.services
            .iter()
            .find(|record| record.name == service)
            .map(|record| record.environment.clone())
    }

    /// Number of checks, across regions, owned by `service`.
    pub(crate) fn check_count(&self, service: &str) -> usize {
        self.health_checks
            .iter()
            .filter(|check| check.service == service)
            .count()
    }

    pub(crate) fn refresh_service_statuses(&mut self) {
        let checks = &self.health_checks;
        for service in &mut self.services {
            service.status = generator::derive_service_status(
                checks
                    .iter()
                    .filter(|check| check.service == service.name)
                    .map(|check| &check.status),
            );
        }
    }
}
