//! Output formatting for CLI display.

use crate::model::{Campaign, Escalation, Issue, Tier};

/// Shorten `text` to at most `max` characters, marking the cut with `...`.
pub(super) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// `lint-0001: widget.ts:12 [no-console]`
pub(super) fn format_batch_line(issue: &Issue) -> String {
    format!(
        "{}: {}:{} [{}]",
        issue.id,
        issue.file_name(),
        issue.line,
        issue.rule_id
    )
}

pub(super) fn format_escalation_line(escalation: &Escalation) -> String {
    format!(
        "{}: {} → {} [{}] {}:{}\n    Reason: {}",
        escalation.issue_id,
        escalation.original_tier,
        escalation.target_tier,
        escalation.rule_id,
        escalation.file.rsplit('/').next().unwrap_or(&escalation.file),
        escalation.line,
        truncate(&escalation.escalation_reason, 100),
    )
}

/// Per-tier overview of campaigns, cheapest tier first.
pub(super) fn format_campaign_summary(campaigns: &[Campaign]) -> String {
    let issues: usize = campaigns.iter().map(|c| c.issue_count).sum();
    let mut out = format!(
        "=== Campaign Summary ===\n\nTotal: {} campaigns, {issues} issues\n",
        campaigns.len()
    );

    for tier in Tier::ALL {
        let in_tier: Vec<&Campaign> = campaigns.iter().filter(|c| c.tier == tier).collect();
        if in_tier.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "\n--- {} ({} / {}) ---\n",
            tier.as_str().to_uppercase(),
            tier.agent(),
            tier.model()
        ));
        for c in in_tier {
            out.push_str(&format!(
                "  {}: {} issues in {} files [{}]\n",
                c.campaign_id, c.issue_count, c.file_count, c.project
            ));
        }
    }

    out
}

/// A dispatchable brief for one campaign.
pub(super) fn format_task_description<F>(campaign: &Campaign, display_path: F) -> String
where
    F: Fn(&str) -> &str,
{
    let files: Vec<String> = campaign
        .files
        .iter()
        .map(|(file, lines)| {
            let lines: Vec<String> = lines.iter().map(u32::to_string).collect();
            format!("- {}: lines {}", display_path(file), lines.join(", "))
        })
        .collect();

    format!(
        "Campaign: {rule} ({issues} issues, {file_count} files)\n\
         Tier: {tier}\n\
         Fix pattern: {hint}\n\
         \n\
         Files:\n\
         {files}\n\
         \n\
         Instructions:\n\
         1. Fix every listed occurrence of {rule}, one file at a time.\n\
         2. Keep each change minimal and behavior-preserving.\n\
         3. Leave any occurrence that needs more than {tier} capability and list it as an escalation.\n\
         4. End with an Outcome block (## Outcome, with Status, Tier, Escalate To, Reason, Changes Made, Handoff).\n\
         \n\
         Issue IDs: {ids}",
        rule = campaign.rule_id,
        issues = campaign.issue_count,
        file_count = campaign.file_count,
        tier = campaign.tier,
        hint = campaign.fix_hint,
        files = files.join("\n"),
        ids = campaign.issue_ids.join(", "),
    )
}
