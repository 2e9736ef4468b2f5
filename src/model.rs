//! Core data model for tierfix.
//!
//! Issues flow through capability tiers; dispatch attempts produce
//! outcomes; pending issues are batched into campaigns; unresolved ones
//! escalate to stronger tiers or to a human.

mod campaign;
mod escalation;
mod issue;
mod outcome;
mod status;
mod tier;

pub use campaign::Campaign;
pub use escalation::Escalation;
pub use issue::Issue;
pub use outcome::{Outcome, UNKNOWN};
pub use status::{EscalationTarget, IssueStatus, OutcomeStatus};
pub use tier::{AgentClass, IssueTier, ModelClass, Tier};
