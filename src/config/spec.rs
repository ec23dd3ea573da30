//! Desired firewall rule types.
//!
//! [`DesiredRuleSpec`] is the fully resolved, immutable description of the
//! rule an invocation converges to. [`RuleInput`] is the partial form each
//! configuration source (command line, rule file, environment) produces
//! before they are merged.

use serde::{Deserialize, Serialize};

use crate::planner::{PortSpec, format_allow, split_tokens};

/// The desired state of one ingress firewall rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesiredRuleSpec {
    /// Rule name, unique within the project.
    pub name: String,
    /// GCP project holding the rule.
    pub project: String,
    /// VPC network the rule is attached to.
    pub network: String,
    /// Allowed TCP ports.
    pub tcp_ports: PortSpec,
    /// Allowed UDP ports.
    pub udp_ports: PortSpec,
    /// Instance tags the rule applies to.
    pub target_tags: Vec<String>,
    /// Source CIDR ranges.
    pub source_ranges: Vec<String>,
    /// Rule description; empty is a valid value.
    pub description: String,
}

/// Partially specified rule, as read from a single source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleInput {
    /// Rule name.
    #[serde(default)]
    pub name: Option<String>,
    /// GCP project.
    #[serde(default)]
    pub project: Option<String>,
    /// VPC network.
    #[serde(default)]
    pub network: Option<String>,
    /// TCP port list.
    #[serde(default, deserialize_with = "list::deserialize")]
    pub tcp: Option<String>,
    /// UDP port list.
    #[serde(default, deserialize_with = "list::deserialize")]
    pub udp: Option<String>,
    /// Target tags.
    #[serde(default, alias = "target_tags", deserialize_with = "list::deserialize")]
    pub tags: Option<String>,
    /// Source ranges.
    #[serde(default, alias = "source_ranges", deserialize_with = "list::deserialize")]
    pub source: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
}

impl DesiredRuleSpec {
    /// Returns the `--allow` value for this rule.
    #[must_use]
    pub fn allow(&self) -> String {
        format_allow(self.tcp_ports.as_str(), self.udp_ports.as_str())
    }

    /// Returns the comma-joined target tags.
    #[must_use]
    pub fn target_tags_value(&self) -> String {
        self.target_tags.join(",")
    }

    /// Returns the comma-joined source ranges.
    #[must_use]
    pub fn source_ranges_value(&self) -> String {
        self.source_ranges.join(",")
    }
}

impl RuleInput {
    /// Overlays `other` on top of `self`; fields set in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            name: other.name.or(self.name),
            project: other.project.or(self.project),
            network: other.network.or(self.network),
            tcp: other.tcp.or(self.tcp),
            udp: other.udp.or(self.udp),
            tags: other.tags.or(self.tags),
            source: other.source.or(self.source),
            description: other.description.or(self.description),
        }
    }

    /// Resolves the input into a rule, failing on the first missing field.
    ///
    /// `udp` and `description` default to empty.
    ///
    /// # Errors
    ///
    /// Returns the name of the first required field that is unset.
    pub fn into_spec(self) -> Result<DesiredRuleSpec, &'static str> {
        let name = self.name.ok_or("name")?;
        let tcp = self.tcp.ok_or("tcp")?;
        let source = self.source.ok_or("source")?;
        let tags = self.tags.ok_or("tags")?;
        let network = self.network.ok_or("network")?;
        let project = self.project.ok_or("project")?;

        Ok(DesiredRuleSpec {
            name,
            project,
            network,
            tcp_ports: PortSpec::new(tcp),
            udp_ports: PortSpec::new(self.udp.unwrap_or_default()),
            target_tags: split_list(&tags),
            source_ranges: split_list(&source),
            description: self.description.unwrap_or_default(),
        })
    }
}

/// Splits a comma-delimited list into owned, trimmed, non-empty items.
fn split_list(list: &str) -> Vec<String> {
    split_tokens(list).map(String::from).collect()
}

/// Accepts either a comma-delimited string, a scalar, or a sequence of
/// scalars, and normalises it to the comma-delimited form.
mod list {
    use serde::{Deserialize, Deserializer, de::Error};
    use serde_yaml::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        value.map(|v| join(&v).map_err(D::Error::custom)).transpose()
    }

    fn join(value: &Value) -> Result<String, String> {
        match value {
            Value::Sequence(items) => items
                .iter()
                .map(scalar)
                .collect::<Result<Vec<_>, _>>()
                .map(|items| items.join(",")),
            other => scalar(other),
        }
    }

    fn scalar(value: &Value) -> Result<String, String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Null => Ok(String::new()),
            other => Err(format!("expected a string, number or list, found {other:?}")),
        }
    }
}
