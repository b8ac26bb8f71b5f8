//! Exact-match filters for the read accessors.
//!
//! Every field is optional; an empty filter matches everything. `limit` caps
//! the number of records returned after filtering.

use fleet_core::types::{Deployment, DeploymentStatus, HealthCheck, HealthStatus, Service};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentFilter {
    pub service: Option<String>,
    pub status: Option<DeploymentStatus>,
    pub environment: Option<String>,
    pub region: Option<String>,
    pub limit: Option<usize>,
}

impl DeploymentFilter {
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn status(mut self, status: DeploymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, deployment: &Deployment) -> bool {
        eq(&self.service, &deployment.service)
            && self.status.map_or(true, |status| status == deployment.status)
            && self.environment.as_ref().map_or(true, |environment| {
                deployment.environment.as_deref() == Some(environment.as_str())
            })
            && eq(&self.region, &deployment.region)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthCheckFilter {
    pub service: Option<String>,
    pub status: Option<HealthStatus>,
    pub region: Option<String>,
    pub limit: Option<usize>,
}

impl HealthCheckFilter {
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn status(mut self, status: HealthStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, check: &HealthCheck) -> bool {
        eq(&self.service, &check.service)
            && self.status.map_or(true, |status| status == check.status)
            && eq(&self.region, &check.region)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFilter {
    /// Matches the service name.
    pub name: Option<String>,
    pub service_type: Option<String>,
    pub status: Option<HealthStatus>,
    pub environment: Option<String>,
    pub region: Option<String>,
    pub limit: Option<usize>,
}

impl ServiceFilter {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = Some(service_type.into());
        self
    }

    pub fn status(mut self, status: HealthStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, service: &Service) -> bool {
        eq(&self.name, &service.name)
            && eq(&self.service_type, &service.service_type)
            && self.status.map_or(true, |status| status == service.status)
            && eq(&self.environment, &service.environment)
            && eq(&self.region, &service.region)
    }
}

fn eq(wanted: &Option<String>, actual: &str) -> bool {
    wanted.as_deref().map_or(true, |wanted| wanted == actual)
}

/// Clone the matching records, honoring `limit`.
pub(crate) fn select<T: Clone>(
    items: &[T],
    limit: Option<usize>,
    matches: impl Fn(&T) -> bool,
) -> Vec<T> {
    items
        .iter()
        .filter(|item| matches(item))
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        let items = [1, 2, 3];
        assert_eq!(select(&items, None, |_| true), vec![1, 2, 3]);
        assert_eq!(select(&items, Some(2), |_| true), vec![1, 2]);
        assert_eq!(select(&items, Some(0), |_| true), Vec::<i32>::new());
        assert_eq!(select(&items, None, |item| *item > 1), vec![2, 3]);
    }

    #[test]
    fn builders_set_fields() {
        let filter = DeploymentFilter::default()
            .service("malaphor-api")
            .status(DeploymentStatus::Failure)
            .environment("production")
            .region("us-east-1")
            .limit(5);
        assert_eq!(filter.service.as_deref(), Some("malaphor-api"));
        assert_eq!(filter.status, Some(DeploymentStatus::Failure));
        assert_eq!(filter.limit, Some(5));

        let filter = HealthCheckFilter::default()
            .status(HealthStatus::Degraded)
            .region("eu-west-1");
        assert_eq!(filter.status, Some(HealthStatus::Degraded));
        assert_eq!(filter.service, None);

        let filter = ServiceFilter::default()
            .service_type("worker")
            .name("malaphor-worker");
        assert_eq!(filter.service_type.as_deref(), Some("worker"));
        assert_eq!(filter.name.as_deref(), Some("malaphor-worker"));
    }

    #[test]
    fn string_match_is_exact() {
        assert!(eq(&None, "anything"));
        assert!(eq(&Some("us-east-1".to_string()), "us-east-1"));
        assert!(!eq(&Some("us-east".to_string()), "us-east-1"));
        assert!(!eq(&Some("US-EAST-1".to_string()), "us-east-1"));
    }
}
