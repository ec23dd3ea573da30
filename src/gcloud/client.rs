//! `gcloud` CLI client implementation.
//!
//! This module provides the [`RuleClient`] seam used by the reconciler and a
//! [`GcloudClient`] that fulfils it by running the `gcloud` binary.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, trace};

use crate::error::{GcloudError, Result};

use super::request::{
    ActivateServiceAccountRequest, CreateRuleRequest, DescribeRuleRequest, GcloudRequest,
    UpdateRuleRequest, render_command,
};
use super::types::{DescribeResult, RemoteRule};

/// Default `gcloud` program name.
pub const DEFAULT_GCLOUD_PROGRAM: &str = "gcloud";

/// Default timeout for a single `gcloud` call in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Fragments of `gcloud` error output that mean the rule does not exist.
const NOT_FOUND_MARKERS: &[&str] = &["was not found", "notFound", "HTTPError 404"];

/// Access to firewall rules in a cloud project.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleClient: Send + Sync {
    /// Activates a service account for subsequent calls.
    async fn authenticate(&self, key_file: &Path) -> Result<()>;

    /// Looks a rule up by name.
    ///
    /// A missing rule is [`DescribeResult::NotFound`], not an error.
    async fn describe(&self, name: &str, project: &str) -> Result<DescribeResult>;

    /// Creates a rule.
    async fn create(&self, request: &CreateRuleRequest) -> Result<()>;

    /// Replaces fields of an existing rule.
    async fn update(&self, request: &UpdateRuleRequest) -> Result<()>;
}

/// Client that runs the `gcloud` CLI.
#[derive(Debug, Clone)]
pub struct GcloudClient {
    /// Program to execute.
    program: String,
    /// Per-call timeout.
    timeout: Duration,
    /// Log mutating commands instead of running them.
    dry_run: bool,
}

/// Captured output of a finished command.
#[derive(Debug)]
struct CommandOutput {
    success: bool,
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl Default for GcloudClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GcloudClient {
    /// Creates a client that runs `gcloud` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: String::from(DEFAULT_GCLOUD_PROGRAM),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            dry_run: false,
        }
    }

    /// Sets the program to execute.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets dry-run mode.
    ///
    /// Authentication and mutations are logged instead of executed; describe
    /// calls still run.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns true if the client is in dry-run mode.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Runs a command and captures its output.
    async fn run(&self, args: &[String]) -> Result<CommandOutput> {
        let command_line = render_command(&self.program, args);
        trace!("Running: {command_line}");

        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| GcloudError::Timeout {
                command: command_line.clone(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| GcloudError::SpawnFailed {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Runs a command that must succeed.
    async fn run_checked(&self, args: &[String]) -> Result<CommandOutput> {
        let output = self.run(args).await?;
        if output.success {
            return Ok(output);
        }
        Err(GcloudError::CommandFailed {
            command: render_command(&self.program, args),
            code: output.code,
            stderr: output.stderr,
        }
        .into())
    }

    /// Runs a mutating command, or logs it in dry-run mode.
    async fn run_mutation(&self, args: &[String]) -> Result<()> {
        if self.dry_run {
            info!("Dry run: {}", render_command(&self.program, args));
            return Ok(());
        }
        let output = self.run_checked(args).await?;
        debug!("gcloud output: {}", output.stdout.trim());
        Ok(())
    }
}

#[async_trait]
impl RuleClient for GcloudClient {
    async fn authenticate(&self, key_file: &Path) -> Result<()> {
        info!("Activating service account from {}", key_file.display());
        let request = ActivateServiceAccountRequest::new(key_file);
        self.run_mutation(&request.to_args()).await
    }

    async fn describe(&self, name: &str, project: &str) -> Result<DescribeResult> {
        debug!("Describing firewall rule {name} in {project}");
        let args = DescribeRuleRequest::new(name, project).to_args();
        let output = self.run(&args).await?;

        if !output.success {
            if is_not_found(&output.stderr) {
                debug!("Firewall rule {name} does not exist");
                return Ok(DescribeResult::NotFound);
            }
            return Err(GcloudError::CommandFailed {
                command: render_command(&self.program, &args),
                code: output.code,
                stderr: output.stderr,
            }
            .into());
        }

        parse_rule(&output.stdout).map(DescribeResult::Found)
    }

    async fn create(&self, request: &CreateRuleRequest) -> Result<()> {
        info!("Creating firewall rule {}", request.name);
        self.run_mutation(&request.to_args()).await
    }

    async fn update(&self, request: &UpdateRuleRequest) -> Result<()> {
        info!("Updating firewall rule {}", request.name);
        self.run_mutation(&request.to_args()).await
    }
}

/// Returns true if `gcloud` error output reports a missing resource.
#[must_use]
pub fn is_not_found(stderr: &str) -> bool {
    NOT_FOUND_MARKERS.iter().any(|marker| stderr.contains(marker))
}

/// Parses `describe --format=json` output.
///
/// # Errors
///
/// Returns an error if the output is not a firewall rule object.
pub fn parse_rule(stdout: &str) -> Result<RemoteRule> {
    serde_json::from_str(stdout)
        .map_err(|e| GcloudError::invalid_response(format!("Failed to parse rule: {e}")).into())
}
