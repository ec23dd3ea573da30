//! Reconciler for converging a firewall rule.
//!
//! One pass describes the remote rule, decides on a single action, applies it
//! and describes the rule again for reporting. There is no retry and no
//! version check: callers must not run two passes for the same rule name
//! concurrently.

use tracing::{error, info};

use crate::config::DesiredRuleSpec;
use crate::error::{ReconcileError, Result};
use crate::gcloud::{CreateRuleRequest, RemoteRule, RuleClient, UpdateRuleRequest};
use crate::planner::{ReconciliationOutcome, RuleDiffEngine, decide};

/// Reconciler for a single firewall rule.
pub struct Reconciler<'a, C: RuleClient> {
    /// Cloud rule client.
    client: &'a C,
    /// Diff engine.
    diff_engine: RuleDiffEngine,
}

/// Result of a reconciliation pass.
#[derive(Debug, serde::Serialize)]
pub struct ReconciliationReport {
    /// Action that was taken.
    pub outcome: ReconciliationOutcome,
    /// Remote rule after the pass, if it exists.
    pub final_state: Option<RemoteRule>,
}

impl<'a, C: RuleClient> Reconciler<'a, C> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(client: &'a C) -> Self {
        Self {
            client,
            diff_engine: RuleDiffEngine::new(),
        }
    }

    /// Decides what a pass would do, without changing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule cannot be described or has malformed ports.
    pub async fn plan(&self, spec: &DesiredRuleSpec) -> Result<ReconciliationOutcome> {
        info!("Planning firewall rule {} in {}", spec.name, spec.project);

        let described = self.client.describe(&spec.name, &spec.project).await?;
        Ok(decide(spec, &described, &self.diff_engine)?)
    }

    /// Performs a full reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is not an ingress rule or any `gcloud`
    /// call fails. Nothing is mutated in the first case.
    pub async fn reconcile(&self, spec: &DesiredRuleSpec) -> Result<ReconciliationReport> {
        let outcome = ensure_mutable(self.plan(spec).await?)?;

        match &outcome {
            ReconciliationOutcome::Create { spec } => {
                self.client
                    .create(&CreateRuleRequest::from_spec(spec))
                    .await?;
                info!("Created new firewall rule");
            }
            ReconciliationOutcome::Update { name, diff } => {
                let request = UpdateRuleRequest::from_diff(name, &spec.project, diff);
                self.client.update(&request).await?;
                info!("Updated firewall rule ({diff})");
            }
            ReconciliationOutcome::NoOp { .. } => {
                info!("Firewall rule already up to date");
            }
            ReconciliationOutcome::Rejected { .. } => {}
        }

        let final_state = self
            .client
            .describe(&spec.name, &spec.project)
            .await?
            .into_rule();

        Ok(ReconciliationReport {
            outcome,
            final_state,
        })
    }
}

/// Turns a rejected outcome into an error.
///
/// # Errors
///
/// Returns [`ReconcileError::NonIngressRule`] for a rejected outcome.
pub fn ensure_mutable(outcome: ReconciliationOutcome) -> Result<ReconciliationOutcome> {
    if let ReconciliationOutcome::Rejected {
        name, direction, ..
    } = outcome
    {
        error!("Refusing to change {direction} rule {name}");
        return Err(ReconcileError::NonIngressRule { name, direction }.into());
    }
    Ok(outcome)
}

impl std::fmt::Display for ReconciliationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.outcome)?;
        if self.final_state.is_none() {
            write!(f, " (rule not present after reconciliation)")?;
        }
        Ok(())
    }
}
