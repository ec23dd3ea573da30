// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # GCP Firewall Rule
//!
//! An idempotent reconciler for a single GCP ingress firewall rule.
//!
//! ## Overview
//!
//! Given the desired rule (name, TCP/UDP ports, source ranges, target tags,
//! network, description), one invocation converges the remote rule to it:
//!
//! - Create the rule if it does not exist
//! - Update only the fields that differ if it does
//! - Do nothing if it already matches
//! - Refuse to touch a rule that is not an ingress rule
//!
//! ## Architecture
//!
//! 1. **Desired State**: Built from the command line, a YAML file and the environment
//! 2. **Observed State**: Read with `gcloud compute firewall-rules describe`
//! 3. **Reconciler**: Compares states and runs at most one `create` or `update`
//!
//! Port ranges are expanded before comparison, so `20000-20002` equals
//! `20000,20001,20002`.
//!
//! ## Modules
//!
//! - [`config`]: Rule loading and validation
//! - [`gcloud`]: `gcloud` client, requests and rule types
//! - [`planner`]: Port parsing, diff computation and the reconciliation decision
//! - [`reconciler`]: Reconciliation pass
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! name: allow-game
//! project: my-project
//! network: default
//! tcp: 22,20000-20005
//! udp: 53
//! tags: [game]
//! source: 10.0.0.0/8
//! description: game servers
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod gcloud;
pub mod planner;
pub mod reconciler;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, DesiredRuleSpec};
pub use error::{FirewallError, Result};
pub use gcloud::{DescribeResult, GcloudClient, RemoteRule, RuleClient};
pub use planner::{ReconciliationOutcome, RuleDiff, RuleDiffEngine};
pub use reconciler::{ReconciliationReport, Reconciler};
