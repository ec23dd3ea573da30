//! Immutable `gcloud` requests.
//!
//! Each call builds one fully populated request value and renders its argv
//! from scratch; nothing is shared between calls.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::DesiredRuleSpec;
use crate::planner::RuleDiff;

use super::types::DIRECTION_INGRESS;

/// Command group for firewall rules.
const FIREWALL_RULES: [&str; 2] = ["compute", "firewall-rules"];

/// Output format requested from every firewall-rules command.
const FORMAT_JSON: &str = "--format=json";

/// A request that renders to `gcloud` arguments.
pub trait GcloudRequest {
    /// Returns the arguments passed to `gcloud`, excluding the program name.
    fn to_args(&self) -> Vec<String>;
}

/// `gcloud auth activate-service-account`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateServiceAccountRequest {
    /// Service account key file.
    pub key_file: PathBuf,
}

/// `gcloud compute firewall-rules describe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeRuleRequest {
    /// Rule name.
    pub name: String,
    /// GCP project.
    pub project: String,
}

/// `gcloud compute firewall-rules create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRuleRequest {
    /// Rule name.
    pub name: String,
    /// GCP project.
    pub project: String,
    /// `--allow` value.
    pub allow: String,
    /// Rule description.
    pub description: String,
    /// VPC network.
    pub network: String,
    /// Comma-joined source ranges.
    pub source_ranges: String,
    /// Comma-joined target tags.
    pub target_tags: String,
}

/// `gcloud compute firewall-rules update`.
///
/// Only fields that are set are sent; each one replaces the remote value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateRuleRequest {
    /// Rule name.
    pub name: String,
    /// GCP project.
    pub project: String,
    /// New `--allow` value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New comma-joined source ranges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ranges: Option<String>,
    /// New comma-joined target tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_tags: Option<String>,
}

impl ActivateServiceAccountRequest {
    /// Creates a request for the given key file.
    #[must_use]
    pub fn new(key_file: impl AsRef<Path>) -> Self {
        Self {
            key_file: key_file.as_ref().to_path_buf(),
        }
    }
}

impl DescribeRuleRequest {
    /// Creates a describe request.
    #[must_use]
    pub fn new(name: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
        }
    }
}

impl CreateRuleRequest {
    /// Builds the create request for a desired rule.
    #[must_use]
    pub fn from_spec(spec: &DesiredRuleSpec) -> Self {
        Self {
            name: spec.name.clone(),
            project: spec.project.clone(),
            allow: spec.allow(),
            description: spec.description.clone(),
            network: spec.network.clone(),
            source_ranges: spec.source_ranges_value(),
            target_tags: spec.target_tags_value(),
        }
    }
}

impl UpdateRuleRequest {
    /// Builds the update request for a diff.
    #[must_use]
    pub fn from_diff(name: &str, project: &str, diff: &RuleDiff) -> Self {
        Self {
            name: name.to_string(),
            project: project.to_string(),
            allow: diff.allow.clone(),
            description: diff.description.clone(),
            source_ranges: diff.source_ranges.clone(),
            target_tags: diff.target_tags.clone(),
        }
    }

    /// Returns true if the request would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.allow.is_none()
            && self.description.is_none()
            && self.source_ranges.is_none()
            && self.target_tags.is_none()
    }
}

impl GcloudRequest for ActivateServiceAccountRequest {
    fn to_args(&self) -> Vec<String> {
        vec![
            String::from("auth"),
            String::from("activate-service-account"),
            flag("key-file", &self.key_file.display().to_string()),
        ]
    }
}

impl GcloudRequest for DescribeRuleRequest {
    fn to_args(&self) -> Vec<String> {
        let mut args = firewall_command("describe", &self.name);
        args.push(flag("project", &self.project));
        args.push(String::from(FORMAT_JSON));
        args
    }
}

impl GcloudRequest for CreateRuleRequest {
    fn to_args(&self) -> Vec<String> {
        let mut args = firewall_command("create", &self.name);
        args.extend([
            flag("allow", &self.allow),
            flag("description", &self.description),
            flag("direction", DIRECTION_INGRESS),
            flag("network", &self.network),
            flag("source-ranges", &self.source_ranges),
            flag("target-tags", &self.target_tags),
            flag("project", &self.project),
            String::from(FORMAT_JSON),
        ]);
        args
    }
}

impl GcloudRequest for UpdateRuleRequest {
    fn to_args(&self) -> Vec<String> {
        let mut args = firewall_command("update", &self.name);
        args.push(flag("project", &self.project));
        let optional = [
            ("allow", &self.allow),
            ("description", &self.description),
            ("source-ranges", &self.source_ranges),
            ("target-tags", &self.target_tags),
        ];
        args.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| value.as_deref().map(|v| flag(name, v))),
        );
        args.push(String::from(FORMAT_JSON));
        args
    }
}

fn firewall_command(verb: &str, name: &str) -> Vec<String> {
    FIREWALL_RULES
        .iter()
        .copied()
        .chain([verb, name])
        .map(String::from)
        .collect()
}

fn flag(name: &str, value: &str) -> String {
    format!("--{name}={value}")
}

/// Renders a command line for logs, quoting arguments that need it.
#[must_use]
pub fn render_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(|arg| {
            if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('\'') {
                format!("'{}'", arg.replace('\'', r"'\''"))
            } else {
                arg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::PortSpec;

    fn spec() -> DesiredRuleSpec {
        DesiredRuleSpec {
            name: String::from("allow-game"),
            project: String::from("demo"),
            network: String::from("default"),
            tcp_ports: PortSpec::new("22,20000-20005"),
            udp_ports: PortSpec::new("53"),
            target_tags: vec![String::from("game"), String::from("ssh")],
            source_ranges: vec![String::from("10.0.0.0/8")],
            description: String::from("game servers"),
        }
    }

    #[test]
    fn test_create_args() {
        let args = CreateRuleRequest::from_spec(&spec()).to_args();
        assert_eq!(
            args,
            vec![
                "compute",
                "firewall-rules",
                "create",
                "allow-game",
                "--allow=tcp:22,tcp:20000-20005,udp:53",
                "--description=game servers",
                "--direction=INGRESS",
                "--network=default",
                "--source-ranges=10.0.0.0/8",
                "--target-tags=game,ssh",
                "--project=demo",
                "--format=json",
            ]
        );
    }

    #[test]
    fn test_update_args_only_changed_fields() {
        let diff = RuleDiff {
            target_tags: Some(String::from("game")),
            description: Some(String::new()),
            ..RuleDiff::default()
        };
        let request = UpdateRuleRequest::from_diff("allow-game", "demo", &diff);
        assert!(!request.is_empty());
        assert_eq!(
            request.to_args(),
            vec![
                "compute",
                "firewall-rules",
                "update",
                "allow-game",
                "--project=demo",
                "--description=",
                "--target-tags=game",
                "--format=json",
            ]
        );
    }

    #[test]
    fn test_empty_update() {
        let request = UpdateRuleRequest::from_diff("allow-game", "demo", &RuleDiff::default());
        assert!(request.is_empty());
    }

    #[test]
    fn test_describe_args() {
        let args = DescribeRuleRequest::new("allow-game", "demo").to_args();
        assert_eq!(
            args,
            vec![
                "compute",
                "firewall-rules",
                "describe",
                "allow-game",
                "--project=demo",
                "--format=json",
            ]
        );
    }

    #[test]
    fn test_auth_args() {
        let args = ActivateServiceAccountRequest::new("/secrets/key.json").to_args();
        assert_eq!(
            args,
            vec!["auth", "activate-service-account", "--key-file=/secrets/key.json"]
        );
    }

    #[test]
    fn test_render_command() {
        let args = vec![
            String::from("update"),
            String::from("--description=game servers"),
            String::from("--x=it's"),
        ];
        assert_eq!(
            render_command("gcloud", &args),
            r"gcloud update '--description=game servers' '--x=it'\''s'"
        );
    }
}
