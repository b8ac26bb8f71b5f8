//! Static reference data the simulator draws from.

use rand::Rng;

use crate::sampler::{uniform_pick, weighted_pick, Weighted};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_ENVIRONMENT: &str = "production";
pub const DEFAULT_RESOURCE_TYPE: &str = "EC2 Instance";
pub const DEFAULT_SERVICE: &str = "malaphor-api";
pub const DEFAULT_RECOVERY_ACTION: &str = "Service restart";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub service_type: String,
    /// Services this one calls; an issue on any of them can cascade here.
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutageScenario {
    pub name: String,
    pub resource_types: Vec<String>,
    /// Services this outage usually hits; empty means any service.
    pub candidate_services: Vec<String>,
    pub messages: Vec<String>,
    pub recovery_minutes: (u32, u32),
}

impl OutageScenario {
    /// Used when the catalog carries no scenarios at all.
    pub fn generic() -> Self {
        Self {
            name: "Unexpected Service Disruption".to_string(),
            resource_types: Vec::new(),
            candidate_services: Vec::new(),
            messages: vec!["Service disruption detected".to_string()],
            recovery_minutes: (5, 15),
        }
    }

    pub fn recovery_bounds(&self) -> (u32, u32) {
        let (a, b) = self.recovery_minutes;
        (a.min(b), a.max(b))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub services: Vec<ServiceSpec>,
    pub regions: Vec<Weighted<String>>,
    pub environments: Vec<String>,
    pub resource_types: Vec<String>,
    pub scenarios: Vec<OutageScenario>,
    pub healthy_messages: Vec<String>,
    pub degraded_messages: Vec<String>,
    pub unhealthy_messages: Vec<String>,
    pub recovery_actions: Vec<String>,
    pub triggered_by: Vec<String>,
    pub commit_messages: Vec<String>,
    pub authors: Vec<String>,
}

impl Catalog {
    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|spec| spec.name.clone()).collect()
    }

    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|spec| spec.name == name)
    }

    pub fn pick_service<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        uniform_pick(&self.services, rng)
            .map(|spec| spec.name.clone())
            .unwrap_or_else(|| DEFAULT_SERVICE.to_string())
    }

    pub fn pick_region<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        weighted_pick(&self.regions, rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    pub fn pick_environment<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        pick_or(&self.environments, DEFAULT_ENVIRONMENT, rng)
    }

    pub fn pick_resource_type<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        pick_or(&self.resource_types, DEFAULT_RESOURCE_TYPE, rng)
    }

    pub fn pick_scenario<R: Rng + ?Sized>(&self, rng: &mut R) -> OutageScenario {
        uniform_pick(&self.scenarios, rng)
            .cloned()
            .unwrap_or_else(OutageScenario::generic)
    }

    pub fn pick_recovery_action<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        pick_or(&self.recovery_actions, DEFAULT_RECOVERY_ACTION, rng)
    }
}

pub(crate) fn pick_or<R: Rng + ?Sized>(items: &[String], fallback: &str, rng: &mut R) -> String {
    uniform_pick(items, rng)
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

fn service(name: &str, service_type: &str, dependencies: &[&str]) -> ServiceSpec {
    ServiceSpec {
        name: name.to_string(),
        service_type: service_type.to_string(),
        dependencies: strings(dependencies),
    }
}

fn scenario(
    name: &str,
    resource_types: &[&str],
    candidate_services: &[&str],
    messages: &[&str],
    recovery_minutes: (u32, u32),
) -> OutageScenario {
    OutageScenario {
        name: name.to_string(),
        resource_types: strings(resource_types),
        candidate_services: strings(candidate_services),
        messages: strings(messages),
        recovery_minutes,
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            services: vec![
                service(
                    "malaphor-api",
                    "api",
                    &["malaphor-auth", "malaphor-db", "malaphor-cache"],
                ),
                service(
                    "malaphor-web",
                    "frontend",
                    &["malaphor-api", "malaphor-auth"],
                ),
                service("malaphor-auth", "api", &["malaphor-db", "malaphor-cache"]),
                service("malaphor-db", "database", &[]),
                service("malaphor-cache", "cache", &[]),
                service(
                    "malaphor-worker",
                    "worker",
                    &["malaphor-db", "malaphor-queue"],
                ),
                service("malaphor-queue", "queue", &[]),
                service(
                    "malaphor-gateway",
                    "gateway",
                    &["malaphor-api", "malaphor-auth"],
                ),
                service(
                    "malaphor-analytics",
                    "worker",
                    &["malaphor-db", "malaphor-queue"],
                ),
                service(
                    "malaphor-notifier",
                    "worker",
                    &["malaphor-queue", "malaphor-api"],
                ),
            ],
            regions: vec![
                Weighted::new("us-east-1".to_string(), 0.4),
                Weighted::new("us-west-2".to_string(), 0.3),
                Weighted::new("eu-west-1".to_string(), 0.2),
                Weighted::new("ap-southeast-1".to_string(), 0.1),
            ],
            environments: strings(&["production", "staging", "development"]),
            resource_types: strings(&[
                "EC2 Instance",
                "RDS Database",
                "Lambda Function",
                "S3 Bucket",
                "Load Balancer",
                "ElastiCache Cluster",
                "ECS Service",
                "SQS Queue",
            ]),
            scenarios: vec![
                scenario(
                    "Database Connection Pool Exhaustion",
                    &["RDS Database", "EC2 Instance"],
                    &["malaphor-db", "malaphor-api", "malaphor-auth"],
                    &[
                        "Connection pool exhausted: 100/100 connections in use",
                        "Query latency above 5s threshold",
                        "Too many clients already",
                    ],
                    (5, 15),
                ),
                scenario(
                    "Memory Leak",
                    &["ECS Service", "EC2 Instance"],
                    &["malaphor-api", "malaphor-worker", "malaphor-analytics"],
                    &[
                        "Memory usage at 97% and climbing",
                        "Container OOMKilled, restarting",
                        "GC pause time exceeding 2s",
                    ],
                    (5, 15),
                ),
                scenario(
                    "Network Partition",
                    &["Load Balancer", "EC2 Instance"],
                    &[],
                    &[
                        "Packet loss above 30% between availability zones",
                        "Upstream connect timeout",
                        "Health probe unreachable",
                    ],
                    (5, 10),
                ),
                scenario(
                    "Cache Stampede",
                    &["ElastiCache Cluster"],
                    &["malaphor-cache"],
                    &[
                        "Cache hit ratio dropped below 20%",
                        "Eviction rate spiking",
                        "Cache node CPU saturated",
                    ],
                    (5, 12),
                ),
                scenario(
                    "Queue Backlog",
                    &["SQS Queue", "Lambda Function"],
                    &["malaphor-queue", "malaphor-worker", "malaphor-notifier"],
                    &[
                        "Message age exceeds 15 minutes",
                        "Consumer lag above 50k messages",
                        "Lambda concurrency limit reached",
                    ],
                    (8, 15),
                ),
                scenario(
                    "Expired TLS Certificate",
                    &["Load Balancer"],
                    &["malaphor-gateway", "malaphor-web"],
                    &[
                        "TLS handshake failed: certificate has expired",
                        "Clients rejecting certificate chain",
                    ],
                    (5, 15),
                ),
            ],
            healthy_messages: strings(&[
                "All systems operational",
                "Response time within threshold",
                "Health probe passing",
                "Resource utilization normal",
            ]),
            degraded_messages: strings(&[
                "Elevated response times",
                "Intermittent errors observed",
                "Resource utilization high",
                "Increased retry rate",
            ]),
            unhealthy_messages: strings(&[
                "Service unreachable",
                "Error rate above 10%",
                "Health probe failing",
                "Instance failed status checks",
            ]),
            recovery_actions: strings(&[
                DEFAULT_RECOVERY_ACTION,
                "Failover to backup",
                "Scaled out instances",
                "Rolled back deployment",
                "Cleared connection pool",
                "Flushed cache",
            ]),
            triggered_by: strings(&[
                "github-actions",
                "argo-rollouts",
                "jenkins",
                "scheduled-release",
                "manual",
            ]),
            commit_messages: strings(&[
                "fix: handle empty payloads",
                "feat: add pagination to listings",
                "chore: bump dependencies",
                "perf: cache hot lookups",
                "refactor: split request handlers",
                "fix: retry transient upstream errors",
            ]),
            authors: strings(&["platform-bot", "sre-team", "backend-team", "release-bot"]),
        }
    }
}
