//! The public face of the fleet simulator.
//!
//! `FleetSimulator` is a cheap, cloneable handle. All fleet state and the
//! random generator sit behind one mutex; every read or action takes it,
//! seeds the fixtures on first use, and releases it before subscribers run.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleet_core::config::SimulatorConfig;
use fleet_core::events::FleetEventKind;
use fleet_core::types::{
    ActiveIssue, Deployment, DeploymentStatus, HealthCheck, Service, StatusCounts,
};
use fleet_core::validation::{Validate, ValidationIssue, ValidationLevel};
use fleet_notify::{FleetSnapshot, NotificationBus, Subscription, Topic};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::catalog::Catalog;
use crate::dependency_graph::{build_dependency_graph, DependencyGraph};
use crate::engine::{self, record_injection, record_recovery, EngineContext, TickReport};
use crate::filter::{DeploymentFilter, HealthCheckFilter, ServiceFilter};
use crate::generator::{self, DeploymentDraft};
use crate::injector::{inject_issue, InjectionSummary, IssueTarget};
use crate::recovery::{recover, RecoverySummary};
use crate::scheduler::Scheduler;
use crate::store::FleetState;

#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("invalid simulator config: {}", describe(.issues))]
    InvalidConfig { issues: Vec<ValidationIssue> },
}

fn describe(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("[{}] {}", issue.code, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}

struct Core {
    state: FleetState,
    rng: StdRng,
}

struct Inner {
    core: Mutex<Core>,
    bus: NotificationBus,
    scheduler: Scheduler,
    config: SimulatorConfig,
    catalog: Catalog,
    graph: DependencyGraph,
}

#[derive(Clone)]
pub struct FleetSimulator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for FleetSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetSimulator")
            .field("config", &self.inner.config)
            .field("scheduler", &self.inner.scheduler)
            .field("bus", &self.inner.bus)
            .finish()
    }
}

impl FleetSimulator {
    pub fn new(config: SimulatorConfig) -> Result<Self, SimulatorError> {
        Self::with_catalog(config, Catalog::default())
    }

    /// Build a simulator over a custom catalog.
    ///
    /// Validation errors reject the config; warnings are logged.
    pub fn with_catalog(config: SimulatorConfig, catalog: Catalog) -> Result<Self, SimulatorError> {
        let (errors, warnings): (Vec<_>, Vec<_>) = config
            .validate()
            .into_iter()
            .partition(|issue| issue.level == ValidationLevel::Error);
        for warning in &warnings {
            tracing::warn!(code = warning.code, "{}", warning.message);
        }
        if !errors.is_empty() {
            return Err(SimulatorError::InvalidConfig { issues: errors });
        }
        Ok(Self::build(config, catalog))
    }

    /// Default configuration with a fixed seed, for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        let mut config = SimulatorConfig::default();
        config.scheduler.seed = Some(seed);
        Self::build(config, Catalog::default())
    }

    fn build(config: SimulatorConfig, catalog: Catalog) -> Self {
        let rng = match config.scheduler.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let graph = build_dependency_graph(&catalog.services);
        Self {
            inner: Arc::new(Inner {
                core: Mutex::new(Core {
                    state: FleetState::new(),
                    rng,
                }),
                bus: NotificationBus::new(),
                scheduler: Scheduler::new(),
                config,
                catalog,
                graph,
            }),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.inner.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.inner.bus
    }

    // --- Reads ---

    pub fn deployments(&self, filter: &DeploymentFilter) -> Vec<Deployment> {
        self.read(|state| state.deployments(filter))
    }

    pub fn health_checks(&self, filter: &HealthCheckFilter) -> Vec<HealthCheck> {
        self.read(|state| state.health_checks(filter))
    }

    pub fn services(&self, filter: &ServiceFilter) -> Vec<Service> {
        self.read(|state| state.services(filter))
    }

    pub fn active_issues(&self) -> Vec<ActiveIssue> {
        self.read(FleetState::active_issues)
    }

    pub fn status_counts(&self) -> StatusCounts {
        self.read(FleetState::status_counts)
    }

    // --- Actions ---

    /// Record a new in-progress deployment; later ticks resolve it.
    pub fn create_deployment(
        &self,
        service: &str,
        environment: &str,
        version: Option<&str>,
    ) -> Deployment {
        let now = Utc::now();
        let (deployment, _) = self.mutate(now, |state, ctx, rng, report| {
            let id = state.next_deployment_id();
            let deployment = generator::deployment(
                id,
                DeploymentDraft {
                    service: Some(service.to_string()),
                    environment: Some(environment.to_string()),
                    region: None,
                    version: version.map(str::to_string),
                    status: Some(DeploymentStatus::InProgress),
                },
                ctx.catalog,
                rng,
                now,
            );
            state.push_deployment_front(deployment.clone(), ctx.config.limits.max_deployments);
            report.record(
                now,
                FleetEventKind::DeploymentCreated {
                    id: deployment.id.clone(),
                    service: deployment.service.clone(),
                },
            );
            deployment
        });
        tracing::info!(
            id = %deployment.id,
            service = %deployment.service,
            version = %deployment.version,
            "created deployment"
        );
        deployment
    }

    /// Inject an issue on a random pair, even if another issue is active.
    pub fn simulate_issue(&self) -> InjectionSummary {
        self.inject(None)
    }

    pub fn simulate_issue_for(&self, service: &str, region: &str) -> InjectionSummary {
        self.inject(Some(IssueTarget::new(service, region)))
    }

    fn inject(&self, target: Option<IssueTarget>) -> InjectionSummary {
        let now = Utc::now();
        self.mutate(now, |state, ctx, rng, report| {
            let summary = inject_issue(state, ctx, rng, now, target);
            record_injection(report, now, &summary);
            summary
        })
        .0
    }

    pub fn simulate_recovery(&self, service: &str, region: &str) -> RecoverySummary {
        let now = Utc::now();
        self.mutate(now, |state, ctx, rng, report| {
            let summary = recover(state, ctx, rng, now, service, region);
            record_recovery(report, now, &summary);
            summary
        })
        .0
    }

    pub fn tick(&self) -> TickReport {
        self.tick_at(Utc::now())
    }

    /// Run one tick as if the clock read `now`.
    pub fn tick_at(&self, now: DateTime<Utc>) -> TickReport {
        self.mutate(now, |state, ctx, rng, report| {
            let tick_report = engine::tick(state, ctx, rng, now);
            report.touched.extend(tick_report.touched.iter().copied());
            tick_report
        })
        .0
    }

    // --- Scheduling ---

    /// Tick every `period` on the current tokio runtime.
    ///
    /// Returns `false` if already running or called outside a runtime.
    pub fn start(&self, period: Duration) -> bool {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.scheduler.start(period, move || {
            if let Some(inner) = weak.upgrade() {
                FleetSimulator { inner }.tick();
            }
        })
    }

    /// Start with the configured tick interval.
    pub fn start_default(&self) -> bool {
        self.start(self.inner.config.scheduler.tick_interval())
    }

    pub fn stop(&self) -> bool {
        self.inner.scheduler.stop()
    }

    pub fn is_running(&self) -> bool {
        self.inner.scheduler.is_running()
    }

    // --- Notifications ---

    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> Subscription
    where
        F: Fn(&FleetSnapshot) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(topic, callback)
    }

    fn lock_core(&self) -> MutexGuard<'_, Core> {
        self.inner
            .core
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn context(&self) -> EngineContext<'_> {
        EngineContext {
            catalog: &self.inner.catalog,
            graph: &self.inner.graph,
            config: &self.inner.config,
        }
    }

    fn read<T>(&self, f: impl FnOnce(&FleetState) -> T) -> T {
        let mut core = self.lock_core();
        let Core { state, rng } = &mut *core;
        state.ensure_seeded(
            &self.inner.catalog,
            &self.inner.config.fixtures,
            rng,
            Utc::now(),
        );
        f(state)
    }

    /// Run `f` under the lock, snapshot every topic it touched, then publish
    /// with the lock released.
    fn mutate<T>(
        &self,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut FleetState, &EngineContext<'_>, &mut StdRng, &mut TickReport) -> T,
    ) -> (T, TickReport) {
        let ctx = self.context();
        let (value, report, snapshots) = {
            let mut core = self.lock_core();
            let Core { state, rng } = &mut *core;
            state.ensure_seeded(ctx.catalog, &ctx.config.fixtures, rng, now);

            let mut report = TickReport::default();
            let value = f(state, &ctx, rng, &mut report);
            let snapshots = report
                .touched
                .iter()
                .map(|topic| snapshot_of(state, *topic))
                .collect::<Vec<_>>();
            (value, report, snapshots)
        };

        for snapshot in &snapshots {
            self.inner.bus.publish(snapshot);
        }
        (value, report)
    }
}

fn snapshot_of(state: &FleetState, topic: Topic) -> FleetSnapshot {
    match topic {
        Topic::Deployments => FleetSnapshot::Deployments(state.deployments.clone()),
        Topic::HealthChecks => FleetSnapshot::HealthChecks(state.health_checks.clone()),
        Topic::Metrics => FleetSnapshot::Metrics(state.services.clone()),
    }
}
