//! Reconciliation decision.
//!
//! Turns the result of describing a rule into exactly one outcome:
//! create it, update it, leave it alone, or refuse to touch it.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::config::DesiredRuleSpec;
use crate::error::PortParseError;
use crate::gcloud::{DescribeResult, RemoteRule};

use super::diff::{RuleDiff, RuleDiffEngine};

/// Reason reported when the remote rule is not an ingress rule.
pub const NON_INGRESS_REASON: &str = "cannot mutate a non-ingress rule";

/// State of the remote rule as seen by the decision.
#[derive(Debug, Clone, Copy)]
pub enum RuleState<'a> {
    /// No rule of that name exists.
    NoRule,
    /// The rule exists and governs inbound traffic.
    Ingress(&'a RemoteRule),
    /// The rule exists with another direction.
    NonIngress(&'a RemoteRule),
}

/// The single action an invocation takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// Create the rule from the desired spec.
    Create {
        /// Rule to create.
        spec: DesiredRuleSpec,
    },
    /// Replace the differing fields of an existing rule.
    Update {
        /// Rule name.
        name: String,
        /// Fields to replace.
        diff: RuleDiff,
    },
    /// The rule already matches.
    NoOp {
        /// Rule name.
        name: String,
    },
    /// The rule must not be changed.
    Rejected {
        /// Rule name.
        name: String,
        /// Direction of the existing rule.
        direction: String,
        /// Why the rule was rejected.
        reason: String,
    },
}

impl<'a> RuleState<'a> {
    /// Classifies a describe result.
    #[must_use]
    pub fn classify(described: &'a DescribeResult) -> Self {
        match described.rule() {
            None => Self::NoRule,
            Some(rule) if rule.is_ingress() => Self::Ingress(rule),
            Some(rule) => Self::NonIngress(rule),
        }
    }
}

/// Decides what to do with the rule.
///
/// The diff is only computed for an existing ingress rule.
///
/// # Errors
///
/// Returns an error if either side lists a malformed port range.
pub fn decide(
    spec: &DesiredRuleSpec,
    described: &DescribeResult,
    engine: &RuleDiffEngine,
) -> Result<ReconciliationOutcome, PortParseError> {
    let outcome = match RuleState::classify(described) {
        RuleState::NoRule => ReconciliationOutcome::Create { spec: spec.clone() },
        RuleState::NonIngress(rule) => ReconciliationOutcome::Rejected {
            name: spec.name.clone(),
            direction: rule.direction_label().to_string(),
            reason: String::from(NON_INGRESS_REASON),
        },
        RuleState::Ingress(rule) => {
            let diff = engine.compute(spec, rule)?;
            if diff.is_empty() {
                ReconciliationOutcome::NoOp {
                    name: spec.name.clone(),
                }
            } else {
                ReconciliationOutcome::Update {
                    name: spec.name.clone(),
                    diff,
                }
            }
        }
    };

    debug!("Decision for {}: {}", spec.name, outcome.action());
    Ok(outcome)
}

impl ReconciliationOutcome {
    /// Returns the short action name.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::NoOp { .. } => "no-op",
            Self::Rejected { .. } => "rejected",
        }
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Create { spec } => &spec.name,
            Self::Update { name, .. } | Self::NoOp { name } | Self::Rejected { name, .. } => name,
        }
    }

    /// Returns true if applying the outcome changes the remote rule.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(self, Self::Create { .. } | Self::Update { .. })
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { spec } => write!(f, "Create firewall rule '{}'", spec.name),
            Self::Update { name, diff } => {
                write!(f, "Update firewall rule '{name}' ({diff})")
            }
            Self::NoOp { name } => write!(f, "Firewall rule '{name}' already up to date"),
            Self::Rejected {
                name,
                direction,
                reason,
            } => write!(f, "Rejected '{name}': {reason} (direction {direction})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcloud::AllowedEntry;
    use crate::planner::PortSpec;

    fn spec() -> DesiredRuleSpec {
        DesiredRuleSpec {
            name: String::from("allow-ssh"),
            project: String::from("demo"),
            network: String::from("default"),
            tcp_ports: PortSpec::new("22"),
            udp_ports: PortSpec::default(),
            target_tags: vec![String::from("ssh")],
            source_ranges: vec![String::from("0.0.0.0/0")],
            description: String::new(),
        }
    }

    fn matching_rule(direction: &str) -> RemoteRule {
        RemoteRule {
            name: String::from("allow-ssh"),
            direction: Some(direction.to_string()),
            allowed: vec![AllowedEntry {
                ip_protocol: String::from("tcp"),
                ports: vec![String::from("22")],
            }],
            target_tags: vec![String::from("ssh")],
            source_ranges: vec![String::from("0.0.0.0/0")],
            ..RemoteRule::default()
        }
    }

    #[test]
    fn test_not_found_creates() {
        let outcome = decide(&spec(), &DescribeResult::NotFound, &RuleDiffEngine::new()).unwrap();
        assert_eq!(outcome, ReconciliationOutcome::Create { spec: spec() });
        assert!(outcome.is_mutation());
    }

    #[test]
    fn test_not_found_never_diffs() {
        // Malformed ports would fail the diff, so this proves it is skipped.
        let mut spec = spec();
        spec.tcp_ports = PortSpec::new("a-b");
        let outcome = decide(&spec, &DescribeResult::NotFound, &RuleDiffEngine::new()).unwrap();
        assert_eq!(outcome.action(), "create");
    }

    #[test]
    fn test_egress_is_rejected() {
        let described = DescribeResult::Found(matching_rule("EGRESS"));
        let outcome = decide(&spec(), &described, &RuleDiffEngine::new()).unwrap();
        assert_eq!(
            outcome,
            ReconciliationOutcome::Rejected {
                name: String::from("allow-ssh"),
                direction: String::from("EGRESS"),
                reason: String::from(NON_INGRESS_REASON),
            }
        );
        assert!(!outcome.is_mutation());
    }

    #[test]
    fn test_missing_direction_is_rejected() {
        let mut rule = matching_rule("INGRESS");
        rule.direction = None;
        let outcome =
            decide(&spec(), &DescribeResult::Found(rule), &RuleDiffEngine::new()).unwrap();
        assert_eq!(outcome.action(), "rejected");
    }

    #[test]
    fn test_matching_ingress_is_noop() {
        let described = DescribeResult::Found(matching_rule("INGRESS"));
        let outcome = decide(&spec(), &described, &RuleDiffEngine::new()).unwrap();
        assert_eq!(
            outcome,
            ReconciliationOutcome::NoOp {
                name: String::from("allow-ssh")
            }
        );
    }

    #[test]
    fn test_drifted_ingress_updates() {
        let mut rule = matching_rule("INGRESS");
        rule.source_ranges = vec![String::from("10.0.0.0/8")];
        let outcome =
            decide(&spec(), &DescribeResult::Found(rule), &RuleDiffEngine::new()).unwrap();
        let ReconciliationOutcome::Update { name, diff } = outcome else {
            panic!("expected update");
        };
        assert_eq!(name, "allow-ssh");
        assert_eq!(diff.source_ranges.as_deref(), Some("0.0.0.0/0"));
        assert_eq!(diff.changed_fields(), vec!["source-ranges"]);
    }

    #[test]
    fn test_display() {
        let outcome = ReconciliationOutcome::NoOp {
            name: String::from("allow-ssh"),
        };
        assert_eq!(outcome.to_string(), "Firewall rule 'allow-ssh' already up to date");
    }
}
