//! `gcloud` integration module.
//!
//! This module provides the client used to read and change firewall rules,
//! the request values it renders into `gcloud` arguments, and the rule types
//! it returns.

mod client;
mod request;
mod types;

pub use client::{
    DEFAULT_GCLOUD_PROGRAM, DEFAULT_TIMEOUT_SECS, GcloudClient, RuleClient, is_not_found,
    parse_rule,
};
#[cfg(test)]
pub use client::MockRuleClient;
pub use request::{
    ActivateServiceAccountRequest, CreateRuleRequest, DescribeRuleRequest, GcloudRequest,
    UpdateRuleRequest, render_command,
};
pub use types::{AllowedEntry, DIRECTION_INGRESS, DescribeResult, RemoteRule};
