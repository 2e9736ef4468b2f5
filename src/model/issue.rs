//! Issue: one detected problem, tracked through its remediation lifecycle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{EscalationTarget, IssueStatus, IssueTier, Tier};

/// One issue record in the manifest.
///
/// Created by an external detector in `pending`. Field names follow the
/// detector's camelCase JSON. Keys this crate doesn't know about are kept
/// in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub file: String,
    pub line: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,

    pub rule_id: String,

    #[serde(default)]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,

    #[serde(default = "default_tier")]
    pub tier: IssueTier,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default)]
    pub status: IssueStatus,

    /// Set only while `status` is `escalated`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalate_to: Option<EscalationTarget>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_task_id: Option<String>,

    /// Automatic re-dispatches this issue has had after escalating.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub escalations: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issue {
    /// The last path segment of `file`, for compact listings.
    pub fn file_name(&self) -> &str {
        self.file.rsplit('/').next().unwrap_or(&self.file)
    }

    /// `line:column`, with `?` for an unknown column.
    pub fn position(&self) -> String {
        match self.column {
            Some(column) => format!("{}:{column}", self.line),
            None => format!("{}:?", self.line),
        }
    }

    /// `escalate_to` implies `escalated`.
    pub fn is_consistent(&self) -> bool {
        self.escalate_to.is_none() || self.status == IssueStatus::Escalated
    }
}

/// Detectors that predate tiers leave it out; those issues were
/// always handled at the middle tier.
fn default_tier() -> IssueTier {
    IssueTier::Known(Tier::Contextual)
}

#[allow(clippy::trivially_copy_pass_by_ref)] // Signature fixed by serde.
fn is_zero(n: &u32) -> bool {
    *n == 0
}
