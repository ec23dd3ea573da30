//! Configuration module for the desired firewall rule.
//!
//! This module handles:
//! - Rule types ([`DesiredRuleSpec`], [`RuleInput`])
//! - Loading from YAML files, environment variables and `.env`
//! - Validation of names, ports, source ranges and tags

mod parser;
mod spec;
mod validator;

pub use parser::{CREDENTIALS_ENV, ConfigParser, NETWORK_ENV, PROJECT_ENV};
pub use spec::{DesiredRuleSpec, RuleInput};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
