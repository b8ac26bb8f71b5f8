//! Builders for plausible fleet records.

use chrono::{DateTime, Duration, Utc};
use fleet_core::types::{
    CheckMetrics, Commit, Deployment, DeploymentArtifacts, DeploymentStatus, HealthCheck,
    HealthStatus, Service, ServiceMetrics,
};
use rand::Rng;
use std::collections::BTreeMap;

use crate::catalog::{pick_or, Catalog, ServiceSpec};
use crate::sampler::{range_f64, roll, weighted_pick, Weighted};

const REGISTRY: &str = "registry.malaphor.io";
const REPO_ORG: &str = "https://github.com/malaphor";

/// Inclusive-exclusive metric bands per status: (response ms, success %).
fn metric_bands(status: HealthStatus) -> ((f64, f64), (f64, f64)) {
    match status {
        HealthStatus::Healthy => ((40.0, 200.0), (99.0, 100.0)),
        HealthStatus::Degraded => ((200.0, 900.0), (90.0, 99.0)),
        HealthStatus::Unhealthy => ((900.0, 3000.0), (40.0, 90.0)),
    }
}

pub fn metrics_for<R: Rng + ?Sized>(status: HealthStatus, rng: &mut R) -> CheckMetrics {
    let ((rt_min, rt_max), (sr_min, sr_max)) = metric_bands(status);
    CheckMetrics {
        response_time: round1(range_f64(rng, rt_min, rt_max)),
        success_rate: round2(range_f64(rng, sr_min, sr_max)),
    }
}

pub fn metrics_match_status(status: HealthStatus, metrics: &CheckMetrics) -> bool {
    let ((rt_min, rt_max), (sr_min, sr_max)) = metric_bands(status);
    (rt_min..=rt_max).contains(&metrics.response_time)
        && (sr_min..=sr_max).contains(&metrics.success_rate)
}

pub fn message_for<R: Rng + ?Sized>(
    status: HealthStatus,
    catalog: &Catalog,
    rng: &mut R,
) -> String {
    match status {
        HealthStatus::Healthy => pick_or(&catalog.healthy_messages, "Healthy", rng),
        HealthStatus::Degraded => pick_or(&catalog.degraded_messages, "Degraded", rng),
        HealthStatus::Unhealthy => pick_or(&catalog.unhealthy_messages, "Unhealthy", rng),
    }
}

pub fn resource_name<R: Rng + ?Sized>(service: &str, resource_type: &str, rng: &mut R) -> String {
    let slug = resource_type
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>();
    format!("{service}-{slug}-{:03}", rng.gen_range(1..1000))
}

pub fn commit_hash<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..40)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect()
}

pub fn semver<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}.{}.{}",
        rng.gen_range(1..4),
        rng.gen_range(0..20),
        rng.gen_range(0..30)
    )
}

/// Fields a caller wants fixed; everything left `None` is randomized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentDraft {
    pub service: Option<String>,
    pub environment: Option<String>,
    pub region: Option<String>,
    pub version: Option<String>,
    pub status: Option<DeploymentStatus>,
}

pub fn deployment<R: Rng + ?Sized>(
    id: String,
    draft: DeploymentDraft,
    catalog: &Catalog,
    rng: &mut R,
    at: DateTime<Utc>,
) -> Deployment {
    let service = draft.service.unwrap_or_else(|| catalog.pick_service(rng));
    let status = draft.status.unwrap_or_else(|| {
        let statuses = [
            Weighted::new(DeploymentStatus::Success, 0.7),
            Weighted::new(DeploymentStatus::Failure, 0.2),
            Weighted::new(DeploymentStatus::InProgress, 0.1),
        ];
        weighted_pick(&statuses, rng)
            .copied()
            .unwrap_or(DeploymentStatus::Success)
    });
    let version = draft.version.unwrap_or_else(|| semver(rng));
    let environment = draft
        .environment
        .unwrap_or_else(|| catalog.pick_environment(rng));
    let region = draft.region.unwrap_or_else(|| catalog.pick_region(rng));
    let commit = commit_hash(rng);
    let commit_url = roll(rng, 0.9).then(|| format!("{REPO_ORG}/{service}/commit/{commit}"));
    let duration = status.is_terminal().then(|| rng.gen_range(45..=900));
    let build_number = rng.gen_range(1000..100_000);

    Deployment {
        artifacts: DeploymentArtifacts {
            image_tag: format!("{REGISTRY}/{service}:{version}"),
            build_id: format!("build-{build_number}"),
        },
        id,
        version,
        status,
        environment: Some(environment),
        timestamp: at,
        commit,
        commit_url,
        triggered_by: pick_or(&catalog.triggered_by, "manual", rng),
        region,
        duration,
        service,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn health_check<R: Rng + ?Sized>(
    id: String,
    service: &str,
    region: &str,
    resource_type: &str,
    status: HealthStatus,
    catalog: &Catalog,
    rng: &mut R,
    at: DateTime<Utc>,
) -> HealthCheck {
    HealthCheck {
        id,
        service: service.to_string(),
        resource: resource_name(service, resource_type, rng),
        resource_type: resource_type.to_string(),
        status,
        message: message_for(status, catalog, rng),
        timestamp: at,
        last_checked: at,
        region: region.to_string(),
        metrics: metrics_for(status, rng),
    }
}

pub fn service_metrics<R: Rng + ?Sized>(rng: &mut R) -> ServiceMetrics {
    ServiceMetrics {
        cpu: round1(range_f64(rng, 10.0, 85.0)),
        memory: round1(range_f64(rng, 20.0, 90.0)),
        network: round1(range_f64(rng, 5.0, 70.0)),
        cost: round2(range_f64(rng, 150.0, 4_000.0)),
    }
}

pub fn service_record<R: Rng + ?Sized>(
    id: String,
    spec: &ServiceSpec,
    catalog: &Catalog,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Service {
    let environment = catalog.pick_environment(rng);

    let mut commits = (0..5)
        .map(|_| Commit {
            hash: commit_hash(rng),
            message: pick_or(&catalog.commit_messages, "update", rng),
            author: pick_or(&catalog.authors, "release-bot", rng),
            timestamp: now - Duration::minutes(rng.gen_range(10..60 * 24 * 14)),
        })
        .collect::<Vec<_>>();
    commits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut versions = (0..3).map(|_| semver(rng)).collect::<Vec<_>>();
    versions.dedup();

    let mut resources = BTreeMap::new();
    for _ in 0..rng.gen_range(1..=3) {
        let resource_type = catalog.pick_resource_type(rng);
        *resources.entry(resource_type).or_insert(0) += rng.gen_range(1..=4);
    }

    let mut tags = BTreeMap::new();
    tags.insert("environment".to_string(), environment.clone());
    tags.insert("tier".to_string(), spec.service_type.clone());
    let owner = pick_or(&catalog.authors, "sre-team", rng);
    tags.insert("owner".to_string(), owner);

    Service {
        id,
        name: spec.name.clone(),
        region: catalog.pick_region(rng),
        environment,
        service_type: spec.service_type.clone(),
        status: HealthStatus::Healthy,
        commits,
        versions,
        resources,
        metrics: service_metrics(rng),
        dependencies: spec.dependencies.clone(),
        tags,
    }
}

/// Worst-of summary of a service's checks, softened so one bad check
/// degrades rather than fails the service.
pub fn derive_service_status<'a>(
    statuses: impl IntoIterator<Item = &'a HealthStatus>,
) -> HealthStatus {
    let mut total = 0usize;
    let mut unhealthy = 0usize;
    let mut non_healthy = 0usize;
    for status in statuses {
        total += 1;
        if !status.is_healthy() {
            non_healthy += 1;
        }
        if *status == HealthStatus::Unhealthy {
            unhealthy += 1;
        }
    }

    if total == 0 || non_healthy == 0 {
        HealthStatus::Healthy
    } else if unhealthy * 2 > total {
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Degraded
    }
}

/// Random walk of cpu/memory/network, clamped to percentages.
pub fn drift_metrics<R: Rng + ?Sized>(metrics: &mut ServiceMetrics, rng: &mut R) {
    metrics.cpu = nudge(metrics.cpu, rng);
    metrics.memory = nudge(metrics.memory, rng);
    metrics.network = nudge(metrics.network, rng);
}

fn nudge<R: Rng + ?Sized>(value: f64, rng: &mut R) -> f64 {
    round1((value + range_f64(rng, -3.0, 3.0)).clamp(0.0, 100.0))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
