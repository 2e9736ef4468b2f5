//! Human review backlog: issues the automated tiers have handed off.

use std::fmt::{self, Write};

use jiff::Timestamp;

use crate::model::{EscalationTarget, Issue, IssueStatus, OutcomeStatus, Tier};
use crate::storage::OutcomeBook;

/// Why an issue is waiting on a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklogReason {
    MarkedForReview,
    EscalatedToHuman,
    UnrecognizedTarget,
    EscalationLimit,
    /// Escalated to the top tier and not fixed there (yet).
    JudgmentUnresolved,
}

impl fmt::Display for BacklogReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MarkedForReview => "marked for human review",
            Self::EscalatedToHuman => "escalated to human",
            Self::UnrecognizedTarget => "unrecognized escalation target",
            Self::EscalationLimit => "escalation limit reached",
            Self::JudgmentUnresolved => "judgment-tier escalation not fixed",
        })
    }
}

/// One issue in the backlog, with context from its latest outcome.
#[derive(Debug, Clone)]
pub struct BacklogItem<'a> {
    pub issue: &'a Issue,
    pub reason: BacklogReason,
    pub escalation_reason: Option<String>,
    pub handoff: Option<String>,
}

/// The backlog, in manifest order. Each issue appears at most once.
pub fn collect<'a>(
    issues: &'a [Issue],
    outcomes: &OutcomeBook,
    max_escalations: u32,
) -> Vec<BacklogItem<'a>> {
    issues
        .iter()
        .filter_map(|issue| {
            let latest = outcomes.get(&issue.id);
            let reason = backlog_reason(issue, latest.map(|o| &o.status), max_escalations)?;
            Some(BacklogItem {
                issue,
                reason,
                escalation_reason: issue
                    .outcome_reason
                    .clone()
                    .or_else(|| latest.and_then(|o| o.reason.clone())),
                handoff: latest.and_then(|o| o.handoff.clone()),
            })
        })
        .collect()
}

fn backlog_reason(
    issue: &Issue,
    latest: Option<&OutcomeStatus>,
    max_escalations: u32,
) -> Option<BacklogReason> {
    if issue.status == IssueStatus::HumanReview {
        return Some(BacklogReason::MarkedForReview);
    }
    match (&issue.status, issue.escalate_to.as_ref()) {
        (_, Some(EscalationTarget::Human)) => Some(BacklogReason::EscalatedToHuman),
        (IssueStatus::Escalated, Some(EscalationTarget::Unrecognized(_))) => {
            Some(BacklogReason::UnrecognizedTarget)
        }
        (IssueStatus::Escalated, Some(EscalationTarget::Tier(_)))
            if issue.escalations >= max_escalations =>
        {
            Some(BacklogReason::EscalationLimit)
        }
        (IssueStatus::Escalated, Some(EscalationTarget::Tier(Tier::Judgment)))
            if latest != Some(&OutcomeStatus::Fixed) =>
        {
            Some(BacklogReason::JudgmentUnresolved)
        }
        _ => None,
    }
}

/// Renders the backlog as markdown. `display_path` shortens file paths.
pub fn render<F>(items: &[BacklogItem<'_>], generated: Timestamp, display_path: F) -> String
where
    F: Fn(&str) -> &str,
{
    let mut out = String::new();
    let _ = writeln!(out, "# Human Review Backlog\n");
    let _ = writeln!(out, "Generated: {}\n", generated.strftime("%Y-%m-%d %H:%M:%S UTC"));

    if items.is_empty() {
        out.push_str("No items pending human review.\n");
        return out;
    }

    let _ = writeln!(out, "## Summary: {} items\n", items.len());

    for item in items {
        let issue = item.issue;
        let _ = writeln!(out, "### {}: {}\n", issue.id, issue.rule_id);
        let _ = writeln!(out, "- **File**: `{}`", display_path(&issue.file));
        let _ = writeln!(out, "- **Line**: {}", issue.position());
        let _ = writeln!(out, "- **Message**: {}", issue.message);
        let _ = writeln!(out, "- **Backlog Reason**: {}", item.reason);
        if let Some(reason) = &item.escalation_reason {
            let _ = writeln!(out, "- **Escalation Reason**: {reason}");
        }
        out.push('\n');

        if let Some(handoff) = item.handoff.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            let _ = writeln!(out, "#### Handoff Context\n\n{handoff}\n");
        }
    }

    out
}
