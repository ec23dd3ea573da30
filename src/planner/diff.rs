//! Diff engine for comparing a desired rule with the provider's copy.
//!
//! Ports, target tags, source ranges and description are compared
//! independently. A dimension that differs contributes its full desired value,
//! because `gcloud compute firewall-rules update` replaces each field wholesale.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::config::DesiredRuleSpec;
use crate::error::PortParseError;
use crate::gcloud::RemoteRule;

use super::ports::parse_ports;
use super::set_diff::{SetDiff, diff_sets};

/// Fields of a rule that the engine compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleField {
    /// TCP ports of the `allowed` list.
    TcpPorts,
    /// UDP ports of the `allowed` list.
    UdpPorts,
    /// Target tags.
    TargetTags,
    /// Source ranges.
    SourceRanges,
    /// Description.
    Description,
}

/// What changed in one field, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    /// Field that differs.
    pub field: RuleField,
    /// Values present in the desired rule only.
    pub added: Vec<String>,
    /// Values present in the remote rule only.
    pub removed: Vec<String>,
}

/// Changes needed to converge a remote rule.
///
/// Only dimensions that differ are set; an empty diff means the rule is
/// converged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleDiff {
    /// Full desired `--allow` value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow: Option<String>,
    /// Full desired comma-joined target tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_tags: Option<String>,
    /// Full desired comma-joined source ranges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ranges: Option<String>,
    /// Desired description, possibly empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Per-field additions and removals behind the values above.
    #[serde(skip)]
    pub changes: Vec<FieldChange>,
}

/// Engine for computing rule diffs.
#[derive(Debug, Default)]
pub struct RuleDiffEngine;

impl RuleDiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the diff between the desired rule and the remote rule.
    ///
    /// # Errors
    ///
    /// Returns an error if either side lists a malformed port range.
    pub fn compute(
        &self,
        desired: &DesiredRuleSpec,
        remote: &RemoteRule,
    ) -> Result<RuleDiff, PortParseError> {
        let mut diff = RuleDiff::default();

        let tcp = Self::diff_ports(desired.tcp_ports.tokens(), remote.ports_for("tcp"))?;
        let udp = Self::diff_ports(desired.udp_ports.tokens(), remote.ports_for("udp"))?;
        let ports_changed = !tcp.is_empty() || !udp.is_empty();
        diff.record(RuleField::TcpPorts, &tcp);
        diff.record(RuleField::UdpPorts, &udp);
        if ports_changed {
            diff.allow = Some(desired.allow());
        }

        let tags = diff_sets(
            desired.target_tags.iter().map(String::as_str),
            remote.target_tags.iter().map(String::as_str),
        );
        if diff.record(RuleField::TargetTags, &tags) {
            diff.target_tags = Some(desired.target_tags_value());
        }

        let sources = diff_sets(
            desired.source_ranges.iter().map(String::as_str),
            remote.source_ranges.iter().map(String::as_str),
        );
        if diff.record(RuleField::SourceRanges, &sources) {
            diff.source_ranges = Some(desired.source_ranges_value());
        }

        let current = remote.description_or_empty();
        if current != desired.description {
            debug!("description: '{current}' -> '{}'", desired.description);
            diff.changes.push(FieldChange {
                field: RuleField::Description,
                added: vec![desired.description.clone()],
                removed: vec![current.to_string()],
            });
            diff.description = Some(desired.description.clone());
        }

        Ok(diff)
    }

    /// Expands both port lists and diffs them.
    fn diff_ports<'a>(
        desired: impl Iterator<Item = &'a str>,
        existing: impl Iterator<Item = &'a str>,
    ) -> Result<SetDiff<super::ports::PortToken>, PortParseError> {
        Ok(diff_sets(parse_ports(desired)?, parse_ports(existing)?))
    }
}

impl RuleDiff {
    /// Returns true if the remote rule already matches.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.allow.is_none()
            && self.target_tags.is_none()
            && self.source_ranges.is_none()
            && self.description.is_none()
    }

    /// Returns the names of the `gcloud` fields that will be replaced.
    #[must_use]
    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("allow", self.allow.is_some()),
            ("target-tags", self.target_tags.is_some()),
            ("source-ranges", self.source_ranges.is_some()),
            ("description", self.description.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    /// Records a set diff as a field change; returns true if it is non-empty.
    fn record<T: Ord + ToString>(&mut self, field: RuleField, set: &SetDiff<T>) -> bool {
        if set.is_empty() {
            return false;
        }
        let added = to_strings(&set.additions);
        let removed = to_strings(&set.removals);
        debug!("{field}: add {added:?}, remove {removed:?}");
        self.changes.push(FieldChange {
            field,
            added,
            removed,
        });
        true
    }
}

fn to_strings<T: ToString>(values: &BTreeSet<T>) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TcpPorts => "TCP ports",
            Self::UdpPorts => "UDP ports",
            Self::TargetTags => "target tags",
            Self::SourceRanges => "source ranges",
            Self::Description => "description",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for RuleDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "no changes");
        }
        write!(f, "{}", self.changed_fields().join(", "))
    }
}
