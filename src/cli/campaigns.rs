//! The campaigns command: per-rule batches of pending issues.

use crate::campaign::{CampaignGenerator, ConventionResolver};
use crate::config::Config;
use crate::model::{Campaign, Issue, Tier};
use crate::storage::Storage;

use super::format::{format_campaign_summary, format_task_description};

/// Narrows the generated campaigns. Unset fields match everything.
#[derive(Debug, Default)]
pub(super) struct CampaignFilter {
    pub tier: Option<Tier>,
    pub agent: Option<String>,
    pub project: Option<String>,
}

impl CampaignFilter {
    fn matches(&self, campaign: &Campaign) -> bool {
        self.tier.is_none_or(|t| campaign.tier == t)
            && self
                .agent
                .as_deref()
                .is_none_or(|a| campaign.agent_type.as_str() == a)
            && self.project.as_deref().is_none_or(|p| campaign.project == p)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum View {
    Json,
    Summary,
    TaskDescriptions,
}

pub(super) fn cmd_campaigns(
    config: &Config,
    storage: &Storage,
    filter: &CampaignFilter,
    view: View,
) -> Result<(), String> {
    let issues = storage
        .load_issues()
        .map_err(|e| format!("failed to load issues: {e}"))?;
    let campaigns = filtered_campaigns(config, &issues, filter)?;

    match view {
        View::Json => {
            let json = serde_json::to_string_pretty(&campaigns)
                .map_err(|e| format!("failed to serialize campaigns: {e}"))?;
            println!("{json}");
        }
        View::Summary => print!("{}", format_campaign_summary(&campaigns)),
        View::TaskDescriptions => {
            let briefs: Vec<String> = campaigns
                .iter()
                .map(|c| format_task_description(c, |p| config.display_path(p)))
                .collect();
            println!("{}", briefs.join("\n\n---\n\n"));
        }
    }
    Ok(())
}

fn filtered_campaigns(
    config: &Config,
    issues: &[Issue],
    filter: &CampaignFilter,
) -> Result<Vec<Campaign>, String> {
    let resolver = ConventionResolver::new(&config.module_conventions)?;
    let generator = CampaignGenerator::new(&config.campaign, &resolver, &config.projects);
    let mut campaigns = generator.generate(issues);
    campaigns.retain(|c| filter.matches(c));
    tracing::debug!(count = campaigns.len(), "generated campaigns");
    Ok(campaigns)
}
