//! Planning module for firewall rule changes.
//!
//! This module expands port lists, compares the desired rule with the remote
//! one, and decides which single action converges them.

mod diff;
mod plan;
mod ports;
mod set_diff;

pub use diff::{FieldChange, RuleDiff, RuleDiffEngine, RuleField};
pub use plan::{NON_INGRESS_REASON, ReconciliationOutcome, RuleState, decide};
pub use ports::{PortSet, PortSpec, PortToken, format_allow, parse_port_list, parse_ports, split_tokens};
pub use set_diff::{Blank, SetDiff, diff_sets};

pub(crate) use ports::parse_range;
