//! Escalation engine: folding outcomes back into the manifest, and
//! collecting the escalations that are due for re-dispatch.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Escalation, EscalationTarget, Issue, IssueStatus, Outcome, Tier};
use crate::storage::{self, OutcomeBook, Storage, find_by_status};

/// Counts from one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// Issues whose record changed.
    pub updated: usize,

    /// Outcomes already reflected in their issue.
    pub unchanged: usize,

    /// Outcomes from a dispatch older than the issue's latest.
    pub stale: usize,

    /// Outcomes for issue ids the manifest doesn't have.
    pub missing: usize,

    pub total: usize,
}

/// Applies every stored outcome to the manifest and commits it.
pub fn reconcile(storage: &Storage) -> storage::Result<ReconcileSummary> {
    let outcomes = storage.load_outcomes()?;
    let mut manifest = storage.load_issues_for_update()?;

    let summary = apply_outcomes(&mut manifest.data, &outcomes);
    if summary.updated > 0 {
        storage.commit_issues(&mut manifest)?;
    }

    tracing::info!(
        updated = summary.updated,
        unchanged = summary.unchanged,
        stale = summary.stale,
        missing = summary.missing,
        total = summary.total,
        "reconciled outcomes"
    );
    Ok(summary)
}

/// Applies outcomes to issues in place. Running it twice changes nothing
/// the second time.
pub fn apply_outcomes(issues: &mut [Issue], outcomes: &OutcomeBook) -> ReconcileSummary {
    let index: HashMap<String, usize> = issues
        .iter()
        .enumerate()
        .map(|(n, issue)| (issue.id.clone(), n))
        .collect();

    let mut summary = ReconcileSummary {
        total: outcomes.len(),
        ..ReconcileSummary::default()
    };

    for (issue_id, outcome) in outcomes {
        let Some(&n) = index.get(issue_id) else {
            tracing::debug!(issue = %issue_id, "outcome for an issue not in the manifest");
            summary.missing += 1;
            continue;
        };
        let issue = &mut issues[n];

        match freshness(issue, outcome) {
            Freshness::Stale => {
                tracing::debug!(
                    issue = %issue_id,
                    task = ?outcome.task_id,
                    latest = ?issue.last_task_id,
                    "skipping stale outcome"
                );
                summary.stale += 1;
            }
            Freshness::Applied => summary.unchanged += 1,
            Freshness::Fresh => {
                if !outcome.status.is_recognized() {
                    tracing::warn!(
                        issue = %issue_id,
                        status = %outcome.status,
                        "applying unrecognized outcome status"
                    );
                }
                let before = issue.clone();
                apply(issue, outcome);
                if *issue == before {
                    summary.unchanged += 1;
                } else {
                    summary.updated += 1;
                }
            }
        }
    }

    summary
}

enum Freshness {
    Stale,
    Applied,
    Fresh,
}

/// Dispatch ids order outcomes against the issue's latest dispatch. An
/// outcome from the latest dispatch is only applied while that dispatch
/// is still in flight, so an operator reset sticks.
fn freshness(issue: &Issue, outcome: &Outcome) -> Freshness {
    match (outcome.task_id.as_deref(), issue.last_task_id.as_deref()) {
        (Some(task), Some(latest)) if task < latest => Freshness::Stale,
        (Some(task), Some(latest)) if task == latest && issue.status != IssueStatus::InProgress => {
            Freshness::Applied
        }
        (None, Some(_)) => Freshness::Stale,
        _ => Freshness::Fresh,
    }
}

fn apply(issue: &mut Issue, outcome: &Outcome) {
    let status = outcome.status.issue_status();

    issue.escalate_to = if status == IssueStatus::Escalated {
        Some(
            outcome
                .escalate_to
                .clone()
                .unwrap_or_else(|| issue.tier.known().map_or(EscalationTarget::Human, next_target)),
        )
    } else {
        None
    };
    issue.status = status;
    if let Some(reason) = &outcome.reason {
        issue.outcome_reason = Some(reason.clone());
    }
    if let Some(task_id) = &outcome.task_id {
        issue.last_task_id = Some(task_id.clone());
    }
}

/// Where an escalation that names no target goes: one tier up, and from
/// the top tier to a human.
fn next_target(tier: Tier) -> EscalationTarget {
    match tier {
        Tier::Mechanical => EscalationTarget::Tier(Tier::Contextual),
        Tier::Contextual => EscalationTarget::Tier(Tier::Judgment),
        Tier::Judgment => EscalationTarget::Human,
    }
}

/// Escalated issues due for automatic re-dispatch, in manifest order.
///
/// Targets of `human` or anything unrecognized are left out, as are issues
/// that have used up `max_escalations`.
pub fn pending_escalations(
    issues: &[Issue],
    outcomes: &OutcomeBook,
    max_escalations: u32,
) -> Vec<Escalation> {
    find_by_status(issues, &IssueStatus::Escalated)
        .into_iter()
        .filter(|issue| issue.escalations < max_escalations)
        .filter_map(|issue| {
            let target = issue.escalate_to.as_ref()?.tier()?;
            let reason = issue
                .outcome_reason
                .clone()
                .or_else(|| outcomes.get(&issue.id).and_then(|o| o.reason.clone()))
                .unwrap_or_default();

            Some(Escalation {
                issue_id: issue.id.clone(),
                target_tier: target,
                target_model: target.model(),
                original_tier: issue.tier.clone(),
                file: issue.file.clone(),
                line: issue.line,
                rule_id: issue.rule_id.clone(),
                message: issue.message.clone(),
                escalation_reason: reason,
            })
        })
        .collect()
}

/// The re-dispatch prompt for an escalation. `handoff` is the previous
/// attempt's notes, if it left any.
pub fn escalation_prompt(escalation: &Escalation, handoff: Option<&str>) -> String {
    let mut prompt = format!(
        "Fix this escalated lint issue (previously escalated from {original} tier):\n\
         - File: {file}\n\
         - Line: {line}\n\
         - Rule: {rule}\n\
         - Message: {message}\n\
         - Issue ID: {id}\n\
         \n\
         Previous escalation reason: {reason}\n",
        original = escalation.original_tier,
        file = escalation.file,
        line = escalation.line,
        rule = escalation.rule_id,
        message = escalation.message,
        id = escalation.issue_id,
        reason = escalation.escalation_reason,
    );

    if let Some(handoff) = handoff.map(str::trim).filter(|h| !h.is_empty()) {
        prompt.push_str("\nHandoff from the previous attempt:\n");
        prompt.push_str(handoff);
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "\nYou have {target}-tier capability. The previous tier couldn't fix this.\n\
         \n\
         Instructions:\n\
         1. Read the surrounding code and anything the reason above points at.\n\
         2. Make the fix.\n\
         3. If it still needs more than you can give, escalate again with a clear reason.\n\
         4. End with an Outcome block (## Outcome, with Status, Tier, Escalate To, Reason, \
         Changes Made, Handoff).\n",
        target = escalation.target_tier,
    ));
    prompt
}
