//! Read-only reports: status, escalations, human-backlog.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use jiff::Timestamp;
use serde::Serialize;

use crate::backlog;
use crate::config::Config;
use crate::escalation::{escalation_prompt, pending_escalations};
use crate::model::{Escalation, Issue, IssueStatus, Tier};
use crate::storage::{OutcomeBook, Storage, find_by_tier_and_status};

use super::format::format_escalation_line;

/// Aggregate counts over the manifest and outcome stores.
#[derive(Debug, Serialize)]
struct StatusReport {
    total: usize,
    by_status: BTreeMap<String, usize>,
    by_tier: BTreeMap<String, usize>,
    /// Pending issues per tier, i.e. fresh work for `next-batch`.
    pending_by_tier: BTreeMap<String, usize>,
    escalated_to: BTreeMap<String, usize>,
    /// In progress, with no stored outcome from their latest dispatch.
    stuck: Vec<String>,
    outcomes: usize,
    unresolved_outcomes: usize,
}

impl StatusReport {
    fn new(issues: &[Issue], outcomes: &OutcomeBook, unresolved: &OutcomeBook) -> Self {
        let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_tier: BTreeMap<String, usize> = BTreeMap::new();
        let mut escalated_to: BTreeMap<String, usize> = BTreeMap::new();
        for issue in issues {
            *by_status.entry(issue.status.to_string()).or_default() += 1;
            *by_tier.entry(issue.tier.to_string()).or_default() += 1;
            if let Some(target) = &issue.escalate_to {
                *escalated_to.entry(target.as_str().to_string()).or_default() += 1;
            }
        }

        let pending_by_tier = Tier::ALL
            .iter()
            .map(|&tier| {
                let pending = find_by_tier_and_status(issues, tier, &IssueStatus::Pending);
                (tier.to_string(), pending.len())
            })
            .collect();

        let stuck = issues
            .iter()
            .filter(|issue| issue.status == IssueStatus::InProgress)
            .filter(|issue| {
                let answered = outcomes.get(&issue.id).and_then(|o| o.task_id.as_deref());
                issue.last_task_id.is_none() || answered != issue.last_task_id.as_deref()
            })
            .map(|issue| issue.id.clone())
            .collect();

        Self {
            total: issues.len(),
            by_status,
            by_tier,
            pending_by_tier,
            escalated_to,
            stuck,
            outcomes: outcomes.len(),
            unresolved_outcomes: unresolved.len(),
        }
    }
}

pub(super) fn cmd_status(storage: &Storage) -> Result<(), String> {
    let issues = storage
        .load_issues()
        .map_err(|e| format!("failed to load issues: {e}"))?;
    let outcomes = storage
        .load_outcomes()
        .map_err(|e| format!("failed to load outcomes: {e}"))?;
    let unresolved = storage
        .load_unresolved_outcomes()
        .map_err(|e| format!("failed to load unresolved outcomes: {e}"))?;

    let report = StatusReport::new(&issues, &outcomes, &unresolved);
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| format!("failed to serialize status: {e}"))?;
    println!("{json}");
    Ok(())
}

/// An escalation with its ready-to-send prompt.
#[derive(Debug, Serialize)]
struct EscalationDispatch<'a> {
    #[serde(flatten)]
    escalation: &'a Escalation,
    prompt: String,
}

pub(super) fn cmd_escalations(config: &Config, storage: &Storage, json: bool) -> Result<(), String> {
    let issues = storage
        .load_issues()
        .map_err(|e| format!("failed to load issues: {e}"))?;
    let outcomes = storage
        .load_outcomes()
        .map_err(|e| format!("failed to load outcomes: {e}"))?;

    let escalations = pending_escalations(&issues, &outcomes, config.max_escalations);
    let dispatches: Vec<EscalationDispatch<'_>> = escalations
        .iter()
        .map(|escalation| {
            let handoff = outcomes
                .get(&escalation.issue_id)
                .and_then(|o| o.handoff.as_deref());
            EscalationDispatch {
                escalation,
                prompt: escalation_prompt(escalation, handoff),
            }
        })
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&dispatches)
            .map_err(|e| format!("failed to serialize escalations: {e}"))?;
        println!("{out}");
        return Ok(());
    }

    if dispatches.is_empty() {
        println!("No pending escalations");
        return Ok(());
    }
    println!("{} pending escalations:", dispatches.len());
    for d in &dispatches {
        println!("  {}", format_escalation_line(d.escalation));
    }
    for d in &dispatches {
        println!("\n--- {} ---\n{}", d.escalation.issue_id, d.prompt);
    }
    Ok(())
}

pub(super) fn cmd_human_backlog(
    config: &Config,
    storage: &Storage,
    out: Option<PathBuf>,
) -> Result<(), String> {
    let issues = storage
        .load_issues()
        .map_err(|e| format!("failed to load issues: {e}"))?;
    let outcomes = storage
        .load_outcomes()
        .map_err(|e| format!("failed to load outcomes: {e}"))?;

    let items = backlog::collect(&issues, &outcomes, config.max_escalations);
    let report = backlog::render(&items, Timestamp::now(), |p| config.display_path(p));
    print!("{report}");

    let path = out.unwrap_or_else(|| config.in_state_dir(&config.human_backlog));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
    }
    fs::write(&path, &report).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    eprintln!("Wrote {} items to {}", items.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::fixtures::{issue, outcome};
    use crate::model::{EscalationTarget, IssueTier, OutcomeStatus};
    use crate::storage::tests::test_storage;

    #[test]
    fn status_counts_and_stuck_issues() {
        let mut answered = issue("lint-0001", "r", "/r/a.ts", Tier::Mechanical);
        answered.status = IssueStatus::InProgress;
        answered.last_task_id = Some("t1".into());
        let mut silent = issue("lint-0002", "r", "/r/b.ts", Tier::Mechanical);
        silent.status = IssueStatus::InProgress;
        silent.last_task_id = Some("t2".into());
        let mut escalated = issue("lint-0003", "r", "/r/c.ts", Tier::Contextual);
        escalated.status = IssueStatus::Escalated;
        escalated.escalate_to = Some(EscalationTarget::Human);
        let mut odd = issue("lint-0004", "r", "/r/d.ts", Tier::Mechanical);
        odd.tier = IssueTier::Unrecognized("cosmic".into());
        let issues = vec![answered, silent, escalated, odd];

        let mut outcomes = OutcomeBook::new();
        outcomes.insert("lint-0001".into(), outcome("lint-0001", OutcomeStatus::Fixed, "t1"));

        let report = StatusReport::new(&issues, &outcomes, &OutcomeBook::new());

        assert_eq!(report.total, 4);
        assert_eq!(report.by_status["in_progress"], 2);
        assert_eq!(report.by_status["pending"], 1);
        assert_eq!(report.by_status["escalated"], 1);
        assert_eq!(report.by_tier["mechanical"], 2);
        assert_eq!(report.by_tier["cosmic"], 1);
        assert_eq!(report.pending_by_tier["mechanical"], 0);
        assert_eq!(report.pending_by_tier["judgment"], 0);
        assert_eq!(report.escalated_to["human"], 1);
        assert_eq!(report.stuck, vec!["lint-0002"]);
        assert_eq!(report.outcomes, 1);
        assert_eq!(report.unresolved_outcomes, 0);
    }

    #[test]
    fn human_backlog_is_written_to_the_configured_path() {
        let (state, storage) = test_storage();
        let mut handed_off = issue("lint-0001", "no-eval", "/r/a.ts", Tier::Judgment);
        handed_off.status = IssueStatus::Escalated;
        handed_off.escalate_to = Some(EscalationTarget::Human);
        storage.save_issues(&[handed_off]).unwrap();

        let config = Config {
            state_dir: state.path().to_path_buf(),
            ..Config::default()
        };
        cmd_human_backlog(&config, &storage, None).unwrap();

        let written = fs::read_to_string(config.in_state_dir(&config.human_backlog)).unwrap();
        assert!(written.contains("### lint-0001: no-eval"));
        assert!(written.contains("## Summary: 1 items"));
    }

    #[test]
    fn escalation_json_carries_the_prompt() {
        let mut up = issue("lint-0001", "no-explicit-any", "/r/a.ts", Tier::Mechanical);
        up.status = IssueStatus::Escalated;
        up.escalate_to = Some(EscalationTarget::Tier(Tier::Contextual));
        up.outcome_reason = Some("Needs type context".into());
        let escalations = pending_escalations(&[up], &OutcomeBook::new(), 2);

        let dispatch = EscalationDispatch {
            escalation: &escalations[0],
            prompt: escalation_prompt(&escalations[0], Some("see types.ts")),
        };
        let value = serde_json::to_value(&dispatch).unwrap();

        assert_eq!(value["issue_id"], "lint-0001");
        assert_eq!(value["target_tier"], "contextual");
        assert_eq!(value["ruleId"], "no-explicit-any");
        let prompt = value["prompt"].as_str().unwrap();
        assert!(prompt.contains("Previous escalation reason: Needs type context"));
        assert!(prompt.contains("see types.ts"));
    }
}
