//! The distribution-preserving swap.
//!
//! Health mutations never set a status directly. They exchange statuses
//! between two checks, so the per-status counts stay fixed.

use chrono::{DateTime, Utc};
use fleet_core::types::HealthCheck;
use rand::Rng;

use crate::generator;
use crate::sampler::uniform_pick;

/// Exchange status, message and metrics between two checks.
pub fn swap_statuses(checks: &mut [HealthCheck], a: usize, b: usize, now: DateTime<Utc>) {
    if a == b || a >= checks.len() || b >= checks.len() {
        return;
    }
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    let (head, tail) = checks.split_at_mut(high);
    let first = &mut head[low];
    let second = &mut tail[0];

    std::mem::swap(&mut first.status, &mut second.status);
    std::mem::swap(&mut first.message, &mut second.message);
    std::mem::swap(&mut first.metrics, &mut second.metrics);
    for check in [first, second] {
        check.timestamp = now;
        check.last_checked = now;
    }
}

/// Uniformly pick the index of a check matching `predicate`.
pub fn find_partner<R, F>(checks: &[HealthCheck], rng: &mut R, predicate: F) -> Option<usize>
where
    R: Rng + ?Sized,
    F: Fn(&HealthCheck) -> bool,
{
    let candidates = checks
        .iter()
        .enumerate()
        .filter(|(_, check)| predicate(check))
        .map(|(index, _)| index)
        .collect::<Vec<_>>();
    uniform_pick(&candidates, rng).copied()
}

/// Like [`find_partner`], trying each predicate in order until one matches.
pub fn find_partner_preferring<R, F>(
    checks: &[HealthCheck],
    rng: &mut R,
    predicates: &[F],
) -> Option<usize>
where
    R: Rng + ?Sized,
    F: Fn(&HealthCheck) -> bool,
{
    predicates
        .iter()
        .find_map(|predicate| find_partner(checks, rng, predicate))
}

/// Give a check a new message and fresh metrics for its current status.
pub fn restyle<R: Rng + ?Sized>(check: &mut HealthCheck, message: String, rng: &mut R) {
    check.message = message;
    check.metrics = generator::metrics_for(check.status, rng);
}

/// Whether `message` names `service` as a whole word.
///
/// `malaphor-api` matches "issue in malaphor-api:" but not
/// "malaphor-api-v2".
pub fn mentions_service(message: &str, service: &str) -> bool {
    if service.is_empty() {
        return false;
    }
    let is_name_char = |ch: char| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_';
    message.match_indices(service).any(|(start, _)| {
        let before = message[..start].chars().next_back();
        let after = message[start + service.len()..].chars().next();
        !before.is_some_and(is_name_char) && !after.is_some_and(is_name_char)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::types::{CheckMetrics, HealthStatus};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn check(id: &str, service: &str, status: HealthStatus) -> HealthCheck {
        HealthCheck {
            id: id.to_string(),
            service: service.to_string(),
            resource: format!("{service}-ec2-instance-001"),
            resource_type: "EC2 Instance".to_string(),
            status,
            message: format!("{status} message"),
            timestamp: Utc::now(),
            last_checked: Utc::now(),
            region: "us-east-1".to_string(),
            metrics: CheckMetrics {
                response_time: 100.0,
                success_rate: 99.5,
            },
        }
    }

    #[test]
    fn swap_exchanges_status_but_not_identity() {
        let mut checks = vec![
            check("hc-1", "malaphor-api", HealthStatus::Healthy),
            check("hc-2", "malaphor-db", HealthStatus::Unhealthy),
        ];
        swap_statuses(&mut checks, 1, 0, Utc::now());
        assert_eq!(checks[0].id, "hc-1");
        assert_eq!(checks[0].status, HealthStatus::Unhealthy);
        assert_eq!(checks[0].message, "unhealthy message");
        assert_eq!(checks[1].service, "malaphor-db");
        assert_eq!(checks[1].status, HealthStatus::Healthy);
    }

    #[test]
    fn swap_ignores_same_or_out_of_range_indices() {
        let mut checks = vec![check("hc-1", "a", HealthStatus::Healthy)];
        let before = checks.clone();
        swap_statuses(&mut checks, 0, 0, Utc::now());
        swap_statuses(&mut checks, 0, 3, Utc::now());
        assert_eq!(checks, before);
    }

    #[test]
    fn partner_search_honors_predicate_order() {
        let checks = vec![
            check("hc-1", "a", HealthStatus::Healthy),
            check("hc-2", "b", HealthStatus::Degraded),
            check("hc-3", "c", HealthStatus::Unhealthy),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            find_partner(&checks, &mut rng, |c| c.status == HealthStatus::Degraded),
            Some(1)
        );
        assert_eq!(find_partner(&checks, &mut rng, |c| c.service == "z"), None);

        let predicates: [Box<dyn Fn(&HealthCheck) -> bool>; 2] = [
            Box::new(|c| c.service == "z"),
            Box::new(|c| c.status == HealthStatus::Unhealthy),
        ];
        assert_eq!(
            find_partner_preferring(&checks, &mut rng, &predicates),
            Some(2)
        );
    }

    #[test]
    fn restyle_matches_metrics_to_status() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut target = check("hc-1", "a", HealthStatus::Unhealthy);
        restyle(&mut target, "down".to_string(), &mut rng);
        assert_eq!(target.message, "down");
        assert!(generator::metrics_match_status(target.status, &target.metrics));
    }

    #[test]
    fn mentions_service_needs_word_boundaries() {
        assert!(mentions_service(
            "Upstream issue in malaphor-api: Memory Leak",
            "malaphor-api"
        ));
        assert!(mentions_service("malaphor-api", "malaphor-api"));
        assert!(!mentions_service("malaphor-api-v2 slow", "malaphor-api"));
        assert!(!mentions_service("xmalaphor-api slow", "malaphor-api"));
        assert!(!mentions_service("all good", "malaphor-api"));
        assert!(!mentions_service("anything", ""));
    }
}
