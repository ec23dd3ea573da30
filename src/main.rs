//! firewall-rule CLI entrypoint.
//!
//! This is the main entrypoint for the firewall-rule command-line tool.

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use gcp_firewall_rule::cli::{Cli, Commands, OutputFormatter, RuleArgs, workflow_output};
use gcp_firewall_rule::config::{ConfigParser, ConfigValidator, DesiredRuleSpec};
use gcp_firewall_rule::error::{ConfigError, Result};
use gcp_firewall_rule::gcloud::{GcloudClient, RemoteRule, RuleClient};
use gcp_firewall_rule::reconciler::{Reconciler, ensure_mutable};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over `-v` when set.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let parser = ConfigParser::new();
    parser.load_dotenv()?;

    let client = GcloudClient::new()
        .with_program(cli.gcloud)
        .with_timeout(Duration::from_secs(cli.timeout_secs));

    match cli.command {
        Commands::Apply { rule, dry_run } => {
            cmd_apply(&parser, rule, &client.with_dry_run(dry_run), &formatter).await
        }
        Commands::Plan { rule } => cmd_plan(&parser, rule, &client, &formatter).await,
        Commands::Show { name, project } => {
            cmd_show(&parser, &name, project, &client, &formatter).await
        }
    }
}

/// Create or update the rule.
async fn cmd_apply(
    parser: &ConfigParser,
    args: RuleArgs,
    client: &GcloudClient,
    formatter: &OutputFormatter,
) -> Result<()> {
    let spec = load_rule(parser, args, formatter)?;
    if client.is_dry_run() {
        info!("Dry run: mutating gcloud commands will only be printed");
    }
    authenticate(client).await?;

    let report = Reconciler::new(client).reconcile(&spec).await?;
    eprint!("{}", formatter.format_report(&report, client.is_dry_run()));

    emit_workflow_output(report.final_state.as_ref())
}

/// Show what apply would do.
async fn cmd_plan(
    parser: &ConfigParser,
    args: RuleArgs,
    client: &GcloudClient,
    formatter: &OutputFormatter,
) -> Result<()> {
    let spec = load_rule(parser, args, formatter)?;
    authenticate(client).await?;

    let outcome = Reconciler::new(client).plan(&spec).await?;
    eprint!("{}", formatter.format_outcome(&outcome));

    ensure_mutable(outcome)?;
    Ok(())
}

/// Print the current remote rule.
async fn cmd_show(
    parser: &ConfigParser,
    name: &str,
    project: Option<String>,
    client: &GcloudClient,
    formatter: &OutputFormatter,
) -> Result<()> {
    let project = project
        .or(parser.env_overrides().project)
        .ok_or_else(|| ConfigError::missing_field("project"))?;
    authenticate(client).await?;

    let rule = client.describe(name, &project).await?.into_rule();
    eprint!("{}", formatter.format_rule(rule.as_ref()));

    emit_workflow_output(rule.as_ref())
}

/// Resolves and validates the desired rule.
fn load_rule(
    parser: &ConfigParser,
    args: RuleArgs,
    formatter: &OutputFormatter,
) -> Result<DesiredRuleSpec> {
    let file = args.file.clone();
    let spec = parser.resolve_rule(file.as_deref(), args.into())?;

    let result = ConfigValidator::new().validate(&spec)?;
    if result.warning_count() > 0 {
        warn!("Rule has {} warning(s)", result.warning_count());
        eprint!("{}", formatter.format_warnings(&result));
    }

    info!("Rule {} in project {}", spec.name, spec.project);
    debug!("Desired allow: {}", spec.allow());
    Ok(spec)
}

/// Activates the service account named by the environment.
async fn authenticate(client: &GcloudClient) -> Result<()> {
    let key_file = ConfigParser::get_credentials_path()?;
    client.authenticate(&key_file).await
}

/// Writes the `json_out` workflow command to stdout.
fn emit_workflow_output(final_state: Option<&RemoteRule>) -> Result<()> {
    let line = workflow_output(final_state)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    Ok(())
}
