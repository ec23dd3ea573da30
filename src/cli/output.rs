//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats, and the `json_out`
//! workflow command emitted after every run.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{DesiredRuleSpec, ValidationResult};
use crate::error::{FirewallError, Result};
use crate::gcloud::RemoteRule;
use crate::planner::{FieldChange, ReconciliationOutcome};
use crate::reconciler::ReconciliationReport;

use super::commands::OutputFormat;

/// Name of the workflow output carrying the final rule.
pub const JSON_OUT: &str = "json_out";

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Field change row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Add")]
    added: String,
    #[tabled(rename = "Remove")]
    removed: String,
}

/// Rule field row for table display.
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a reconciliation decision for display.
    #[must_use]
    pub fn format_outcome(&self, outcome: &ReconciliationOutcome) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(outcome).unwrap_or_default(),
            OutputFormat::Text => Self::format_outcome_text(outcome),
        }
    }

    /// Formats an outcome as text.
    fn format_outcome_text(outcome: &ReconciliationOutcome) -> String {
        let mut output = String::new();

        match outcome {
            ReconciliationOutcome::Create { spec } => {
                let _ = writeln!(output, "{} {outcome}", "+".green());
                output.push_str(&Table::new(Self::spec_rows(spec)).to_string());
                output.push('\n');
            }
            ReconciliationOutcome::Update { diff, .. } => {
                let _ = writeln!(output, "{} {outcome}", "~".yellow());
                let rows: Vec<ChangeRow> = diff.changes.iter().map(Self::change_row).collect();
                if !rows.is_empty() {
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }
            }
            ReconciliationOutcome::NoOp { .. } => {
                let _ = writeln!(output, "{} {outcome}", "✓".green());
            }
            ReconciliationOutcome::Rejected { .. } => {
                let _ = writeln!(output, "{} {outcome}", "✗".red());
            }
        }

        output
    }

    /// Formats the result of a reconciliation pass.
    #[must_use]
    pub fn format_report(&self, report: &ReconciliationReport, dry_run: bool) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = Self::format_outcome_text(&report.outcome);
                if dry_run && report.outcome.is_mutation() {
                    let _ = writeln!(
                        output,
                        "\n{} Dry run: no changes were made.",
                        "!".yellow()
                    );
                }
                output
            }
        }
    }

    /// Formats a remote rule, or its absence.
    #[must_use]
    pub fn format_rule(&self, rule: Option<&RemoteRule>) -> String {
        match self.format {
            OutputFormat::Json => rule
                .map(|r| serde_json::to_string_pretty(r).unwrap_or_default())
                .unwrap_or_else(|| String::from("null")),
            OutputFormat::Text => rule.map_or_else(
                || format!("{} Rule not found.\n", "✗".red()),
                |rule| {
                    let mut output = format!("\nFirewall rule: {}\n\n", rule.name.bold());
                    output.push_str(&Table::new(Self::remote_rows(rule)).to_string());
                    output.push('\n');
                    output
                },
            ),
        }
    }

    /// Formats validation warnings.
    #[must_use]
    pub fn format_warnings(&self, result: &ValidationResult) -> String {
        let mut output = String::new();
        for warning in &result.warnings {
            let _ = writeln!(output, "{} {warning}", "⚠".yellow());
        }
        output
    }

    fn change_row(change: &FieldChange) -> ChangeRow {
        ChangeRow {
            field: change.field.to_string(),
            added: Self::join(&change.added).green().to_string(),
            removed: Self::join(&change.removed).red().to_string(),
        }
    }

    fn spec_rows(spec: &DesiredRuleSpec) -> Vec<FieldRow> {
        vec![
            FieldRow {
                field: "allow",
                value: spec.allow(),
            },
            FieldRow {
                field: "target-tags",
                value: spec.target_tags_value(),
            },
            FieldRow {
                field: "source-ranges",
                value: spec.source_ranges_value(),
            },
            FieldRow {
                field: "network",
                value: spec.network.clone(),
            },
            FieldRow {
                field: "description",
                value: spec.description.clone(),
            },
        ]
    }

    fn remote_rows(rule: &RemoteRule) -> Vec<FieldRow> {
        let allowed = rule
            .allowed
            .iter()
            .map(|entry| {
                if entry.ports.is_empty() {
                    entry.ip_protocol.clone()
                } else {
                    format!("{}:{}", entry.ip_protocol, entry.ports.join(","))
                }
            })
            .collect::<Vec<_>>();

        vec![
            FieldRow {
                field: "direction",
                value: rule.direction_label().to_string(),
            },
            FieldRow {
                field: "allowed",
                value: allowed.join(" "),
            },
            FieldRow {
                field: "target-tags",
                value: Self::join(&rule.target_tags),
            },
            FieldRow {
                field: "source-ranges",
                value: Self::join(&rule.source_ranges),
            },
            FieldRow {
                field: "description",
                value: rule.description_or_empty().to_string(),
            },
        ]
    }

    fn join(values: &[String]) -> String {
        values.join(",")
    }
}

/// Encodes a value for a workflow command.
///
/// `%` is encoded first so the other escapes are not double-encoded.
#[must_use]
pub fn escape_workflow_value(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\n', "%0A")
        .replace('\r', "%0D")
}

/// Builds the `::set-output` line for the final rule (`{}` if absent).
///
/// # Errors
///
/// Returns an error if the rule cannot be serialized.
pub fn workflow_output(final_state: Option<&RemoteRule>) -> Result<String> {
    let json = match final_state {
        Some(rule) => {
            serde_json::to_string(rule).map_err(|e| FirewallError::internal(e.to_string()))?
        }
        None => String::from("{}"),
    };

    Ok(format!(
        "::set-output name={JSON_OUT}::{}",
        escape_workflow_value(&json)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcloud::AllowedEntry;
    use crate::planner::{PortSpec, RuleDiff, RuleField};

    fn rule() -> RemoteRule {
        RemoteRule {
            name: String::from("allow-game"),
            direction: Some(String::from("INGRESS")),
            allowed: vec![AllowedEntry {
                ip_protocol: String::from("tcp"),
                ports: vec![String::from("22")],
            }],
            description: Some(String::from("50% off\r\nsale")),
            ..RemoteRule::default()
        }
    }

    #[test]
    fn test_escape_order() {
        assert_eq!(escape_workflow_value("100%\r\n"), "100%25%0D%0A");
        assert_eq!(escape_workflow_value("%0A"), "%250A");
        assert_eq!(escape_workflow_value("plain"), "plain");
    }

    #[test]
    fn test_workflow_output_without_rule() {
        assert_eq!(workflow_output(None).unwrap(), "::set-output name=json_out::{}");
    }

    #[test]
    fn test_workflow_output_is_single_line() {
        let line = workflow_output(Some(&rule())).unwrap();
        assert!(line.starts_with("::set-output name=json_out::{"));
        assert!(!line.contains('\n'));
        assert!(!line.contains('\r'));
        assert!(line.contains("50%25 off"));
    }

    #[test]
    fn test_format_noop_text() {
        let outcome = ReconciliationOutcome::NoOp {
            name: String::from("allow-game"),
        };
        let text = OutputFormatter::new(OutputFormat::Text).format_outcome(&outcome);
        assert!(text.contains("already up to date"));
    }

    #[test]
    fn test_format_update_lists_changes() {
        let outcome = ReconciliationOutcome::Update {
            name: String::from("allow-game"),
            diff: RuleDiff {
                target_tags: Some(String::from("a,b")),
                changes: vec![FieldChange {
                    field: RuleField::TargetTags,
                    added: vec![String::from("b")],
                    removed: vec![],
                }],
                ..RuleDiff::default()
            },
        };
        let text = OutputFormatter::new(OutputFormat::Text).format_outcome(&outcome);
        assert!(text.contains("target-tags"));
        assert!(text.contains("Field"));
    }

    #[test]
    fn test_format_create_json() {
        let outcome = ReconciliationOutcome::Create {
            spec: DesiredRuleSpec {
                name: String::from("allow-game"),
                project: String::from("demo"),
                network: String::from("default"),
                tcp_ports: PortSpec::new("22"),
                udp_ports: PortSpec::default(),
                target_tags: vec![String::from("game")],
                source_ranges: vec![String::from("10.0.0.0/8")],
                description: String::new(),
            },
        };
        let json = OutputFormatter::new(OutputFormat::Json).format_outcome(&outcome);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["action"], "create");
        assert_eq!(value["spec"]["name"], "allow-game");
    }

    #[test]
    fn test_format_missing_rule() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        assert_eq!(formatter.format_rule(None), "null");
        assert!(formatter.format_rule(Some(&rule())).contains("\"IPProtocol\""));
    }
}
