//! `gcloud compute firewall-rules` data structures.
//!
//! This module defines the JSON shape returned by `gcloud ... describe
//! --format=json`. Fields the reconciler does not inspect are kept in
//! [`RemoteRule::extra`] so the rule can be written back out unchanged.

use serde::{Deserialize, Serialize};

/// Direction value for inbound rules.
pub const DIRECTION_INGRESS: &str = "INGRESS";

/// A firewall rule as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRule {
    /// Rule name.
    #[serde(default)]
    pub name: String,
    /// `INGRESS` or `EGRESS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Allowed protocol/port entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<AllowedEntry>,
    /// Instance tags the rule applies to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_tags: Vec<String>,
    /// Source CIDR ranges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ranges: Vec<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Every other field, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One `allowed` entry of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedEntry {
    /// Protocol name (`tcp`, `udp`, `icmp`, ...) or number.
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    /// Ports or port ranges; absent means all ports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
}

/// Outcome of looking a rule up by name.
#[derive(Debug, Clone, PartialEq)]
pub enum DescribeResult {
    /// The rule exists.
    Found(RemoteRule),
    /// No rule of that name exists in the project.
    NotFound,
}

impl RemoteRule {
    /// Returns true if the rule governs inbound traffic.
    #[must_use]
    pub fn is_ingress(&self) -> bool {
        self.direction.as_deref() == Some(DIRECTION_INGRESS)
    }

    /// Returns the direction, or `UNSPECIFIED` if the provider omitted it.
    #[must_use]
    pub fn direction_label(&self) -> &str {
        self.direction.as_deref().unwrap_or("UNSPECIFIED")
    }

    /// Returns the description, treating a missing one as empty.
    #[must_use]
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Collects the port tokens of every `allowed` entry for `protocol`.
    pub fn ports_for<'a>(&'a self, protocol: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.allowed
            .iter()
            .filter(move |entry| entry.ip_protocol == protocol)
            .flat_map(|entry| entry.ports.iter().map(String::as_str))
    }
}

impl DescribeResult {
    /// Returns the rule if it exists.
    #[must_use]
    pub const fn rule(&self) -> Option<&RemoteRule> {
        match self {
            Self::Found(rule) => Some(rule),
            Self::NotFound => None,
        }
    }

    /// Consumes the result, returning the rule if it exists.
    #[must_use]
    pub fn into_rule(self) -> Option<RemoteRule> {
        match self {
            Self::Found(rule) => Some(rule),
            Self::NotFound => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIBE_OUTPUT: &str = r#"{
  "allowed": [
    {"IPProtocol": "tcp", "ports": ["22", "20000-20005"]},
    {"IPProtocol": "udp", "ports": ["53"]},
    {"IPProtocol": "icmp"}
  ],
  "creationTimestamp": "2021-03-01T02:03:04.000-08:00",
  "description": "game servers",
  "direction": "INGRESS",
  "disabled": false,
  "id": "1234567890",
  "kind": "compute#firewall",
  "name": "allow-game",
  "network": "https://www.googleapis.com/compute/v1/projects/demo/global/networks/default",
  "priority": 1000,
  "sourceRanges": ["10.0.0.0/8"],
  "targetTags": ["game", "ssh"]
}"#;

    #[test]
    fn test_deserialize_describe_output() {
        let rule: RemoteRule = serde_json::from_str(DESCRIBE_OUTPUT).unwrap();
        assert_eq!(rule.name, "allow-game");
        assert!(rule.is_ingress());
        assert_eq!(rule.allowed.len(), 3);
        assert!(rule.allowed[2].ports.is_empty());
        assert_eq!(rule.target_tags, vec!["game", "ssh"]);
        assert_eq!(rule.description_or_empty(), "game servers");
        assert_eq!(rule.extra["priority"], 1000);
    }

    #[test]
    fn test_ports_for_protocol() {
        let rule: RemoteRule = serde_json::from_str(DESCRIBE_OUTPUT).unwrap();
        assert_eq!(rule.ports_for("tcp").collect::<Vec<_>>(), vec!["22", "20000-20005"]);
        assert_eq!(rule.ports_for("udp").collect::<Vec<_>>(), vec!["53"]);
        assert_eq!(rule.ports_for("sctp").count(), 0);
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let rule: RemoteRule = serde_json::from_str(DESCRIBE_OUTPUT).unwrap();
        let value = serde_json::to_value(&rule).unwrap();
        let original: serde_json::Value = serde_json::from_str(DESCRIBE_OUTPUT).unwrap();
        assert_eq!(value, original);
    }

    #[test]
    fn test_missing_direction() {
        let rule: RemoteRule = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert!(!rule.is_ingress());
        assert_eq!(rule.direction_label(), "UNSPECIFIED");
        assert_eq!(rule.description_or_empty(), "");
    }
}
