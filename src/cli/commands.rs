//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::RuleInput;
use crate::gcloud::{DEFAULT_GCLOUD_PROGRAM, DEFAULT_TIMEOUT_SECS};

/// firewall-rule - Idempotent GCP ingress firewall rule reconciler.
#[derive(Parser, Debug)]
#[command(name = "firewall-rule")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Timeout for each gcloud call, in seconds.
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Path to the gcloud binary.
    #[arg(long, global = true, env = "GCLOUD_BIN", default_value = DEFAULT_GCLOUD_PROGRAM)]
    pub gcloud: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or update the rule so it matches the arguments.
    Apply {
        /// Desired rule.
        #[command(flatten)]
        rule: RuleArgs,

        /// Print mutating gcloud commands instead of running them.
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Show what apply would do, without changing anything.
    Plan {
        /// Desired rule.
        #[command(flatten)]
        rule: RuleArgs,
    },

    /// Print the current remote rule.
    Show {
        /// Rule name.
        #[arg(long)]
        name: String,

        /// GCP project (or `FIREWALL_RULE_PROJECT`).
        #[arg(long)]
        project: Option<String>,
    },
}

/// Arguments describing the desired rule.
///
/// Every field may instead come from `--file`; flags given here win.
#[derive(Args, Debug, Clone, Default)]
pub struct RuleArgs {
    /// YAML file holding the rule.
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Rule name.
    #[arg(long)]
    pub name: Option<String>,

    /// TCP ports and ranges, comma separated (e.g. 22,20000-20005).
    #[arg(long)]
    pub tcp: Option<String>,

    /// UDP ports and ranges, comma separated.
    #[arg(long)]
    pub udp: Option<String>,

    /// Source CIDR ranges, comma separated.
    #[arg(long)]
    pub source: Option<String>,

    /// Target tags, comma separated.
    #[arg(long)]
    pub tags: Option<String>,

    /// VPC network.
    #[arg(long)]
    pub network: Option<String>,

    /// GCP project.
    #[arg(long)]
    pub project: Option<String>,

    /// Rule description.
    #[arg(long)]
    pub description: Option<String>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl From<RuleArgs> for RuleInput {
    fn from(args: RuleArgs) -> Self {
        Self {
            name: args.name,
            project: args.project,
            network: args.network,
            tcp: args.tcp,
            udp: args.udp,
            tags: args.tags,
            source: args.source,
            description: args.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "firewall-rule",
            "-vv",
            "apply",
            "--dry-run",
            "--name",
            "allow-game",
            "--tcp",
            "22,20000-20005",
            "--tags",
            "game",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.timeout_secs, DEFAULT_TIMEOUT_SECS);
        let Commands::Apply { rule, dry_run } = cli.command else {
            panic!("expected apply");
        };
        assert!(dry_run);
        assert!(rule.file.is_none());

        let input = RuleInput::from(rule);
        assert_eq!(input.name.as_deref(), Some("allow-game"));
        assert_eq!(input.tcp.as_deref(), Some("22,20000-20005"));
        assert!(input.udp.is_none());
    }

    #[test]
    fn test_parse_plan_with_file() {
        let cli = Cli::try_parse_from([
            "firewall-rule",
            "plan",
            "--file",
            "rule.yaml",
            "--description",
            "",
            "--timeout-secs",
            "30",
        ])
        .unwrap();

        assert_eq!(cli.timeout_secs, 30);
        let Commands::Plan { rule } = cli.command else {
            panic!("expected plan");
        };
        assert_eq!(rule.file, Some(PathBuf::from("rule.yaml")));
        assert_eq!(rule.description.as_deref(), Some(""));
    }
}
