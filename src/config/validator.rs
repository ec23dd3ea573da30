//! Validation of the desired rule.
//!
//! Every check runs before any remote call, so a malformed rule never reaches
//! `gcloud`.

use std::net::IpAddr;

use tracing::debug;

use crate::error::{ConfigError, FirewallError, Result};
use crate::planner::{PortSpec, parse_range};

use super::spec::DesiredRuleSpec;

/// Maximum length of rule names and tags.
const MAX_NAME_LEN: usize = 63;

/// Maximum length of a rule description.
const MAX_DESCRIPTION_LEN: usize = 2048;

/// Validator for desired rules.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a desired rule.
    ///
    /// # Errors
    ///
    /// Returns the first error if validation fails.
    pub fn validate(&self, spec: &DesiredRuleSpec) -> Result<ValidationResult> {
        let result = self.check(spec);

        if let Some(first_error) = result.errors.first() {
            return Err(FirewallError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )));
        }

        debug!("Rule validation passed");
        Ok(result)
    }

    /// Runs every check and collects all errors and warnings.
    #[must_use]
    pub fn check(&self, spec: &DesiredRuleSpec) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !is_valid_name(&spec.name) {
            result.error(
                "name",
                format!(
                    "Rule name '{}' is invalid. Must be 1-63 lowercase letters, digits or hyphens, starting with a letter.",
                    spec.name
                ),
            );
        }
        if spec.project.trim().is_empty() {
            result.error("project", "Project cannot be empty");
        }
        if spec.network.trim().is_empty() {
            result.error("network", "Network cannot be empty");
        }

        Self::validate_ports("tcp", &spec.tcp_ports, &mut result);
        Self::validate_ports("udp", &spec.udp_ports, &mut result);
        if spec.tcp_ports.is_empty() && spec.udp_ports.is_empty() {
            result
                .warnings
                .push(String::from("tcp/udp: Rule allows no ports"));
        }

        Self::validate_sources(&spec.source_ranges, &mut result);
        Self::validate_tags(&spec.target_tags, &mut result);

        if spec.description.len() > MAX_DESCRIPTION_LEN {
            result.error(
                "description",
                format!("Description exceeds {MAX_DESCRIPTION_LEN} characters"),
            );
        }

        result
    }

    /// Validates a port list.
    fn validate_ports(field: &str, ports: &PortSpec, result: &mut ValidationResult) {
        for token in ports.tokens() {
            if token.contains('-') {
                match parse_range(token) {
                    Ok((0, _)) => {
                        result.error(field, format!("Port range '{token}' starts at 0"));
                    }
                    Ok((start, end)) if start > end => {
                        result.error(
                            field,
                            format!("Port range '{token}' has start greater than end"),
                        );
                    }
                    Ok(_) => {}
                    Err(e) => result.error(field, e.to_string()),
                }
            } else {
                match token.parse::<u16>() {
                    Ok(0) | Err(_) => {
                        result.error(
                            field,
                            format!("Invalid port '{token}'. Expected 1-65535 or START-END."),
                        );
                    }
                    Ok(_) => {}
                }
            }
        }
    }

    /// Validates source CIDR ranges.
    fn validate_sources(sources: &[String], result: &mut ValidationResult) {
        if sources.is_empty() {
            result.error("source", "At least one source range is required");
        }

        for (i, source) in sources.iter().enumerate() {
            if !is_valid_cidr(source) {
                result.error(
                    &format!("source[{i}]"),
                    format!("Source range '{source}' is not a valid IP address or CIDR block"),
                );
            }
            if source == "0.0.0.0/0" {
                result
                    .warnings
                    .push(format!("source[{i}]: Rule is open to the whole internet"));
            }
        }
    }

    /// Validates target tags.
    fn validate_tags(tags: &[String], result: &mut ValidationResult) {
        if tags.is_empty() {
            result.warnings.push(String::from(
                "tags: No target tags, rule applies to every instance in the network",
            ));
        }

        for (i, tag) in tags.iter().enumerate() {
            if !is_valid_name(tag) {
                result.error(
                    &format!("tags[{i}]"),
                    format!("Target tag '{tag}' is invalid"),
                );
            }
        }
    }
}

/// Validates a GCP resource name: `[a-z]([-a-z0-9]{0,61}[a-z0-9])?`.
fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }

    let mut chars = name.chars();

    if let Some(first) = chars.next()
        && !first.is_ascii_lowercase() {
            return false;
        }

    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return false;
    }

    !name.ends_with('-')
}

/// Validates an address with an optional prefix length.
fn is_valid_cidr(source: &str) -> bool {
    let (address, prefix) = match source.split_once('/') {
        Some((address, prefix)) => (address, Some(prefix)),
        None => (source, None),
    };

    let Ok(address) = address.parse::<IpAddr>() else {
        return false;
    };

    let max_prefix = if address.is_ipv4() { 32 } else { 128 };
    prefix.is_none_or(|p| p.parse::<u8>().is_ok_and(|p| p <= max_prefix))
}

impl ValidationResult {
    /// Records an error.
    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
