//! Validation for simulator configuration.

use serde::{Deserialize, Serialize};

use crate::config::SimulatorConfig;

const SHORT_TICK_WARN_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: ValidationLevel,
    pub code: &'static str,
    pub message: String,
}

pub trait Validate {
    fn validate(&self) -> Vec<ValidationIssue>;
}

impl Validate for SimulatorConfig {
    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.scheduler.tick_interval_ms == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "scheduler.tick_interval.zero",
                message: "tick interval cannot be 0".to_string(),
            });
        } else if self.scheduler.tick_interval_ms < SHORT_TICK_WARN_MS {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                code: "scheduler.tick_interval.low",
                message: format!(
                    "tick interval {}ms is very low; subscribers will be flooded with snapshots",
                    self.scheduler.tick_interval_ms
                ),
            });
        }

        for (name, value) in self.probabilities.named() {
            if !(0.0..=1.0).contains(&value) {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Error,
                    code: "probabilities.out_of_range",
                    message: format!("probability {name} = {value} must be within 0.0..=1.0"),
                });
            }
        }

        if self.limits.max_deployments == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "limits.max_deployments.zero",
                message: "max_deployments must be greater than zero".to_string(),
            });
        }

        if self.limits.max_deployments < self.fixtures.initial_deployments {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                code: "limits.max_deployments.below_fixtures",
                message: format!(
                    "max_deployments {} is below initial_deployments {}; the first spawn will trim the seeded history",
                    self.limits.max_deployments, self.fixtures.initial_deployments
                ),
            });
        }

        if self.fixtures.total_checks() == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "fixtures.checks.empty",
                message: "fixtures must seed at least one health check".to_string(),
            });
        }

        if self.fixtures.healthy == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                code: "fixtures.healthy.zero",
                message: "no healthy checks are seeded; recovery swaps will find no partners"
                    .to_string(),
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimulatorConfig::default().validate().is_empty());
    }

    #[test]
    fn zero_interval_is_an_error() {
        let mut config = SimulatorConfig::default();
        config.scheduler.tick_interval_ms = 0;
        let issues = config.validate();
        let flagged = issues.iter().any(|issue| {
            issue.code == "scheduler.tick_interval.zero" && issue.level == ValidationLevel::Error
        });
        assert!(flagged);
    }

    #[test]
    fn short_interval_is_a_warning() {
        let mut config = SimulatorConfig::default();
        config.scheduler.tick_interval_ms = 10;
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].level, ValidationLevel::Warning);
    }

    #[test]
    fn probability_outside_unit_interval_is_reported_by_name() {
        let mut config = SimulatorConfig::default();
        config.probabilities.cascade = 1.5;
        config.probabilities.inject_issue = -0.1;
        let issues = config.validate();
        let messages = issues
            .iter()
            .filter(|issue| issue.code == "probabilities.out_of_range")
            .map(|issue| issue.message.clone())
            .collect::<Vec<_>>();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().any(|m| m.contains("cascade")));
        assert!(messages.iter().any(|m| m.contains("inject_issue")));
    }

    #[test]
    fn empty_fixtures_are_rejected() {
        let mut config = SimulatorConfig::default();
        config.fixtures.healthy = 0;
        config.fixtures.degraded = 0;
        config.fixtures.unhealthy = 0;
        let codes = config
            .validate()
            .into_iter()
            .map(|issue| issue.code)
            .collect::<Vec<_>>();
        assert!(codes.contains(&"fixtures.checks.empty"));
        assert!(codes.contains(&"fixtures.healthy.zero"));
    }
}
