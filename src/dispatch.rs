//! Dispatch selection and registration.
//!
//! Selection is a pure filter over the manifest. Registration is the only
//! path that moves an issue out of `pending` or `escalated`: it records
//! which issue a dispatch was sent for and marks the issue in flight.

use serde::Serialize;

use crate::model::{EscalationTarget, Issue, IssueStatus, IssueTier, ModelClass, Tier};
use crate::storage::{Filing, Storage, StorageError, file_outcome};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("issue not found: {0}")]
    IssueNotFound(String),

    #[error("issue {id} is {status} and won't be dispatched")]
    TerminalStatus { id: String, status: IssueStatus },

    #[error("issue {id} is escalated to {target} and won't be dispatched")]
    NotDispatchable { id: String, target: EscalationTarget },

    #[error("issue {id} has unrecognized tier '{tier}'")]
    UnrecognizedTier { id: String, tier: String },

    #[error("dispatch {dispatch_id} is already registered for {issue_id}")]
    AlreadyRegistered {
        dispatch_id: String,
        issue_id: String,
    },

    #[error("no unresolved outcome for dispatch {0}")]
    UnknownDispatch(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Whether `issue` may be dispatched at `tier` right now.
///
/// Pending issues go out at their own tier; escalated ones at their
/// escalation target, until they've used up `max_escalations`.
/// Everything else, in-flight issues included, stays put.
pub fn is_dispatchable(issue: &Issue, tier: Tier, max_escalations: u32) -> bool {
    match issue.status {
        IssueStatus::Pending => issue.tier == tier,
        IssueStatus::Escalated => {
            issue.escalate_to.as_ref().and_then(EscalationTarget::tier) == Some(tier)
                && issue.escalations < max_escalations
        }
        _ => false,
    }
}

/// The first `count` dispatchable issues at `tier`, in manifest order.
pub fn next_batch(issues: &[Issue], tier: Tier, count: usize, max_escalations: u32) -> Vec<&Issue> {
    issues
        .iter()
        .filter(|i| is_dispatchable(i, tier, max_escalations))
        .take(count)
        .collect()
}

/// Records `dispatch_id → issue_id` and marks the issue in progress.
///
/// Nothing is written unless the issue exists, isn't terminal, has a
/// known tier, and (when escalated) is headed for a tier rather than a
/// human.
pub fn register_dispatch(
    storage: &Storage,
    dispatch_id: &str,
    issue_id: &str,
) -> Result<Issue, DispatchError> {
    let mut manifest = storage.load_issues_for_update()?;
    let issue = manifest
        .data
        .iter_mut()
        .find(|i| i.id == issue_id)
        .ok_or_else(|| DispatchError::IssueNotFound(issue_id.to_string()))?;
    if issue.status.is_terminal() {
        return Err(DispatchError::TerminalStatus {
            id: issue.id.clone(),
            status: issue.status.clone(),
        });
    }
    if issue.status == IssueStatus::Escalated
        && let Some(target) = &issue.escalate_to
        && target.tier().is_none()
    {
        return Err(DispatchError::NotDispatchable {
            id: issue.id.clone(),
            target: target.clone(),
        });
    }
    if let IssueTier::Unrecognized(tier) = dispatch_tier(issue) {
        return Err(DispatchError::UnrecognizedTier {
            id: issue.id.clone(),
            tier,
        });
    }

    let mut map = storage.load_dispatch_map_for_update()?;
    match map.data.get(dispatch_id) {
        Some(existing) if existing != issue_id => {
            return Err(DispatchError::AlreadyRegistered {
                dispatch_id: dispatch_id.to_string(),
                issue_id: existing.clone(),
            });
        }
        Some(_) => {}
        None => {
            map.data.insert(dispatch_id.to_string(), issue_id.to_string());
            storage.commit_dispatch_map(&mut map)?;
        }
    }

    begin_dispatch(issue, dispatch_id);
    let registered = issue.clone();
    storage.commit_issues(&mut manifest)?;

    tracing::info!(
        dispatch = dispatch_id,
        issue = issue_id,
        tier = %registered.tier,
        "registered dispatch"
    );
    Ok(registered)
}

/// Moves an issue in flight. Re-dispatching an escalation raises the
/// tier to its target and counts the escalation.
fn begin_dispatch(issue: &mut Issue, dispatch_id: &str) {
    if issue.status == IssueStatus::Escalated
        && let Some(target) = issue.escalate_to.as_ref().and_then(EscalationTarget::tier)
    {
        issue.tier = target.into();
        issue.escalations += 1;
    }
    issue.escalate_to = None;
    issue.status = IssueStatus::InProgress;
    issue.last_task_id = Some(dispatch_id.to_string());
}

/// Puts an issue back to `pending`, e.g. after its dispatch died without
/// an outcome. `last_task_id` is kept so older outcomes stay stale.
pub fn reset(storage: &Storage, issue_id: &str) -> Result<Issue, DispatchError> {
    let mut manifest = storage.load_issues_for_update()?;
    let issue = manifest
        .data
        .iter_mut()
        .find(|i| i.id == issue_id)
        .ok_or_else(|| DispatchError::IssueNotFound(issue_id.to_string()))?;

    let previous = std::mem::replace(&mut issue.status, IssueStatus::Pending);
    issue.escalate_to = None;
    let reset = issue.clone();
    storage.commit_issues(&mut manifest)?;

    tracing::info!(issue = issue_id, from = %previous, "reset issue to pending");
    Ok(reset)
}

/// Attributes an unresolved outcome to `issue_id` by hand, and records the
/// dispatch so a re-parse attributes it the same way.
pub fn assign_outcome(
    storage: &Storage,
    dispatch_id: &str,
    issue_id: &str,
) -> Result<Filing, DispatchError> {
    let issues = storage.load_issues()?;
    if !issues.iter().any(|i| i.id == issue_id) {
        return Err(DispatchError::IssueNotFound(issue_id.to_string()));
    }

    let mut unresolved = storage.load_unresolved_outcomes_for_update()?;
    let mut outcome = unresolved
        .data
        .remove(dispatch_id)
        .ok_or_else(|| DispatchError::UnknownDispatch(dispatch_id.to_string()))?;
    outcome.issue_id = Some(issue_id.to_string());
    if outcome.task_id.is_none() {
        outcome.task_id = Some(dispatch_id.to_string());
    }

    let mut map = storage.load_dispatch_map_for_update()?;
    map.data
        .entry(dispatch_id.to_string())
        .or_insert_with(|| issue_id.to_string());

    let mut resolved = storage.load_outcomes_for_update()?;
    let filing = file_outcome(&mut resolved.data, &mut unresolved.data, outcome);

    storage.commit_dispatch_map(&mut map)?;
    storage.commit_outcomes(&mut resolved)?;
    storage.commit_unresolved_outcomes(&mut unresolved)?;

    tracing::info!(dispatch = dispatch_id, issue = issue_id, ?filing, "assigned outcome");
    Ok(filing)
}

/// A ready-to-send dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchInfo {
    pub issue_id: String,
    /// `None` for an issue whose tier isn't recognized.
    pub model: Option<ModelClass>,
    pub prompt: String,
    pub file: String,
}

impl DispatchInfo {
    pub fn new(issue: &Issue) -> Self {
        Self {
            issue_id: issue.id.clone(),
            model: dispatch_tier(issue).known().map(Tier::model),
            prompt: dispatch_prompt(issue),
            file: issue.file.clone(),
        }
    }
}

/// The tier an issue goes out at: its escalation target while escalated,
/// otherwise its own.
pub fn dispatch_tier(issue: &Issue) -> IssueTier {
    match (&issue.status, issue.escalate_to.as_ref().and_then(EscalationTarget::tier)) {
        (IssueStatus::Escalated, Some(target)) => target.into(),
        _ => issue.tier.clone(),
    }
}

/// The prompt for a single-issue dispatch.
pub fn dispatch_prompt(issue: &Issue) -> String {
    let tier = dispatch_tier(issue);
    let column = issue
        .column
        .map_or_else(|| "?".to_string(), |c| c.to_string());
    let fix_hint = issue
        .fix_hint
        .as_deref()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or(crate::campaign::DEFAULT_FIX_HINT);

    format!(
        "Fix this lint issue:\n\
         - File: {file}\n\
         - Line: {line}, Column: {column}\n\
         - Rule: {rule}\n\
         - Message: {message}\n\
         - Issue ID: {id}\n\
         - Current Tier: {tier}\n\
         {previous}\
         \n\
         Fix hint: {fix_hint}\n\
         \n\
         Instructions:\n\
         1. Read about 30 lines around line {line} for context.\n\
         2. Decide whether this fix is within {tier} capability \
         (mechanical: pattern replacement only; contextual: needs code understanding; \
         judgment: needs architectural decisions).\n\
         3. If it is, make the fix.\n\
         4. If it isn't, escalate with a clear reason and handoff notes.\n\
         5. End with an Outcome block:\n\
         \n\
         ## Outcome\n\
         - **Status**: fixed | escalate | skip\n\
         - **Tier**: {tier}\n\
         - **Escalate To**: contextual | judgment | human (only when escalating)\n\
         - **Reason**: why\n\
         - **Changes Made**: what changed\n\
         - **Handoff**: what the next attempt should know\n\
         \n\
         Your assessment matters. A thoughtful escalation helps the team as much as a good fix.",
        file = issue.file,
        line = issue.line,
        rule = issue.rule_id,
        message = issue.message,
        id = issue.id,
        previous = previous_attempt(issue),
    )
}

fn previous_attempt(issue: &Issue) -> String {
    match (&issue.status, issue.outcome_reason.as_deref()) {
        (IssueStatus::Escalated, Some(reason)) => {
            format!("- Escalated from {} tier: {reason}\n", issue.tier)
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::fixtures::{issue, outcome};
    use crate::model::OutcomeStatus;
    use crate::storage::tests::test_storage;

    fn escalated(id: &str, from: Tier, to: EscalationTarget) -> Issue {
        let mut i = issue(id, "no-explicit-any", "/r/a.ts", from);
        i.status = IssueStatus::Escalated;
        i.escalate_to = Some(to);
        i
    }

    fn mixed_manifest() -> Vec<Issue> {
        let mut in_flight = issue("lint-0002", "no-console", "/r/b.ts", Tier::Mechanical);
        in_flight.status = IssueStatus::InProgress;
        let mut fixed = issue("lint-0004", "no-console", "/r/d.ts", Tier::Mechanical);
        fixed.status = IssueStatus::Fixed;

        vec![
            issue("lint-0001", "no-console", "/r/a.ts", Tier::Mechanical),
            in_flight,
            issue("lint-0003", "no-console", "/r/c.ts", Tier::Contextual),
            fixed,
            escalated("lint-0005", Tier::Mechanical, EscalationTarget::Tier(Tier::Contextual)),
            escalated("lint-0006", Tier::Contextual, EscalationTarget::Human),
            issue("lint-0007", "no-console", "/r/e.ts", Tier::Mechanical),
        ]
    }

    fn ids<'a>(issues: &[&'a Issue]) -> Vec<&'a str> {
        issues.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn never_selects_in_progress() {
        let issues = mixed_manifest();
        for count in 0..=issues.len() {
            for tier in Tier::ALL {
                assert!(
                    next_batch(&issues, tier, count, 2)
                        .iter()
                        .all(|i| i.status != IssueStatus::InProgress)
                );
            }
        }
    }

    #[test]
    fn selects_pending_at_tier_and_escalations_to_tier() {
        let issues = mixed_manifest();

        assert_eq!(
            ids(&next_batch(&issues, Tier::Mechanical, 10, 2)),
            vec!["lint-0001", "lint-0007"]
        );
        assert_eq!(
            ids(&next_batch(&issues, Tier::Contextual, 10, 2)),
            vec!["lint-0003", "lint-0005"]
        );
        assert!(next_batch(&issues, Tier::Judgment, 10, 2).is_empty());
        assert_eq!(ids(&next_batch(&issues, Tier::Mechanical, 1, 2)), vec!["lint-0001"]);
    }

    #[test]
    fn escalation_cap_stops_redispatch() {
        let mut capped = escalated("lint-0001", Tier::Contextual, EscalationTarget::Tier(Tier::Judgment));
        capped.escalations = 2;
        assert!(!is_dispatchable(&capped, Tier::Judgment, 2));
        assert!(is_dispatchable(&capped, Tier::Judgment, 3));
    }

    #[test]
    fn register_marks_in_progress_and_records_map() {
        let (_dir, storage) = test_storage();
        storage.save_issues(&mixed_manifest()).unwrap();

        let registered = register_dispatch(&storage, "task-0100", "lint-0001").unwrap();

        assert_eq!(registered.status, IssueStatus::InProgress);
        assert_eq!(registered.last_task_id.as_deref(), Some("task-0100"));
        let issues = storage.load_issues().unwrap();
        assert_eq!(issues[0].status, IssueStatus::InProgress);
        assert!(next_batch(&issues, Tier::Mechanical, 10, 2).iter().all(|i| i.id != "lint-0001"));
        assert_eq!(
            storage.load_dispatch_map().unwrap().get("task-0100").map(String::as_str),
            Some("lint-0001")
        );
    }

    #[test]
    fn register_escalated_raises_tier() {
        let (_dir, storage) = test_storage();
        storage.save_issues(&mixed_manifest()).unwrap();

        let registered = register_dispatch(&storage, "task-0200", "lint-0005").unwrap();

        assert_eq!(registered.tier, Tier::Contextual);
        assert_eq!(registered.escalate_to, None);
        assert_eq!(registered.escalations, 1);
        assert!(registered.is_consistent());
    }

    #[test]
    fn register_refuses_unknown_and_terminal_without_writing() {
        let (_dir, storage) = test_storage();
        storage.save_issues(&mixed_manifest()).unwrap();

        let err = register_dispatch(&storage, "task-0300", "lint-9999").unwrap_err();
        assert!(matches!(err, DispatchError::IssueNotFound(_)));

        let err = register_dispatch(&storage, "task-0301", "lint-0004").unwrap_err();
        assert!(matches!(err, DispatchError::TerminalStatus { .. }));

        assert!(storage.load_dispatch_map().unwrap().is_empty());
        assert_eq!(storage.load_issues().unwrap(), mixed_manifest());
    }

    #[test]
    fn register_refuses_human_escalations_and_unknown_tiers() {
        let (_dir, storage) = test_storage();
        let mut manifest = mixed_manifest();
        manifest[0].tier = IssueTier::Unrecognized("cosmic".into());
        storage.save_issues(&manifest).unwrap();

        let err = register_dispatch(&storage, "task-0310", "lint-0006").unwrap_err();
        assert!(matches!(
            err,
            DispatchError::NotDispatchable { ref target, .. } if *target == EscalationTarget::Human
        ));

        let err = register_dispatch(&storage, "task-0311", "lint-0001").unwrap_err();
        assert!(matches!(err, DispatchError::UnrecognizedTier { ref tier, .. } if tier == "cosmic"));

        assert!(storage.load_dispatch_map().unwrap().is_empty());
        let stored = storage.load_issues().unwrap();
        assert_eq!(stored, manifest);
        assert_eq!(stored[5].status, IssueStatus::Escalated);
        assert_eq!(stored[5].escalate_to, Some(EscalationTarget::Human));
    }

    #[test]
    fn unknown_tier_is_never_selected() {
        let mut manifest = mixed_manifest();
        manifest[0].tier = IssueTier::Unrecognized("cosmic".into());

        for tier in Tier::ALL {
            assert!(!ids(&next_batch(&manifest, tier, 10, 2)).contains(&"lint-0001"));
        }
        assert_eq!(DispatchInfo::new(&manifest[0]).model, None);
    }

    #[test]
    fn dispatch_ids_are_not_reassigned() {
        let (_dir, storage) = test_storage();
        storage.save_issues(&mixed_manifest()).unwrap();

        register_dispatch(&storage, "task-0400", "lint-0001").unwrap();
        register_dispatch(&storage, "task-0400", "lint-0001").unwrap();
        let err = register_dispatch(&storage, "task-0400", "lint-0007").unwrap_err();
        assert!(matches!(err, DispatchError::AlreadyRegistered { .. }));
    }

    #[test]
    fn reset_returns_issue_to_pending() {
        let (_dir, storage) = test_storage();
        storage.save_issues(&mixed_manifest()).unwrap();

        let reset_issue = reset(&storage, "lint-0006").unwrap();
        assert_eq!(reset_issue.status, IssueStatus::Pending);
        assert_eq!(reset_issue.escalate_to, None);

        assert!(matches!(
            reset(&storage, "nope").unwrap_err(),
            DispatchError::IssueNotFound(_)
        ));
    }

    #[test]
    fn assign_outcome_moves_unresolved_to_issue() {
        let (_dir, storage) = test_storage();
        storage.save_issues(&mixed_manifest()).unwrap();

        let mut unresolved = storage.load_unresolved_outcomes_for_update().unwrap();
        let mut orphan = outcome("lint-0002", OutcomeStatus::Fixed, "task-0500");
        orphan.issue_id = None;
        unresolved.data.insert("task-0500".into(), orphan);
        storage.commit_unresolved_outcomes(&mut unresolved).unwrap();

        let filing = assign_outcome(&storage, "task-0500", "lint-0002").unwrap();

        assert_eq!(filing, Filing::Updated);
        assert!(storage.load_unresolved_outcomes().unwrap().is_empty());
        let outcomes = storage.load_outcomes().unwrap();
        assert_eq!(outcomes["lint-0002"].task_id.as_deref(), Some("task-0500"));
        assert_eq!(
            storage.load_dispatch_map().unwrap().get("task-0500").map(String::as_str),
            Some("lint-0002")
        );

        assert!(matches!(
            assign_outcome(&storage, "task-0500", "lint-0002").unwrap_err(),
            DispatchError::UnknownDispatch(_)
        ));
    }

    #[test]
    fn prompt_names_issue_and_outcome_contract() {
        let prompt = dispatch_prompt(&issue("lint-0001", "no-console", "/r/a.ts", Tier::Mechanical));
        assert!(prompt.contains("- Issue ID: lint-0001"));
        assert!(prompt.contains("- Line: 10, Column: 4"));
        assert!(prompt.contains("Current Tier: mechanical"));
        assert!(prompt.contains("## Outcome"));
        assert!(prompt.contains(crate::campaign::DEFAULT_FIX_HINT));
        assert!(!prompt.contains("Escalated from"));
    }

    #[test]
    fn escalated_prompt_targets_the_escalation_tier() {
        let mut i = escalated("lint-0005", Tier::Mechanical, EscalationTarget::Tier(Tier::Contextual));
        i.outcome_reason = Some("needs the caller's types".into());

        let info = DispatchInfo::new(&i);

        assert_eq!(info.model, Some(ModelClass::Sonnet));
        assert!(info.prompt.contains("Current Tier: contextual"));
        assert!(info.prompt.contains("- Escalated from mechanical tier: needs the caller's types\n"));
    }
}
