//! CLI module for the firewall rule reconciler.
//!
//! This module provides the command-line interface and the output
//! written for humans and for workflow runners.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, RuleArgs};
pub use output::{JSON_OUT, OutputFormatter, escape_workflow_value, workflow_output};
