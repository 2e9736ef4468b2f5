//! Campaign generation: batching pending issues for dispatch.
//!
//! Pending issues are grouped by (rule, tier). A group that touches more
//! distinct files than its tier allows is split by module, and a module
//! that's still too large is cut into fixed-size file chunks. Campaign
//! ids derive only from the rule, tier, module, and chunk index, so an
//! unchanged manifest always yields the same ids.

mod module;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::config::{CampaignConfig, ProjectMarker};
use crate::model::{Campaign, Issue, IssueStatus, Tier};

pub use module::{ConventionResolver, ModuleResolver};

/// Used when the first issue of a campaign carries no hint.
pub const DEFAULT_FIX_HINT: &str = "Review the rule documentation and fix accordingly";

/// Project tag for issues no marker recognizes.
pub const UNKNOWN_PROJECT: &str = "unknown";

pub struct CampaignGenerator<'a> {
    limits: &'a CampaignConfig,
    resolver: &'a dyn ModuleResolver,
    projects: &'a [ProjectMarker],
}

impl<'a> CampaignGenerator<'a> {
    pub fn new(
        limits: &'a CampaignConfig,
        resolver: &'a dyn ModuleResolver,
        projects: &'a [ProjectMarker],
    ) -> Self {
        Self {
            limits,
            resolver,
            projects,
        }
    }

    /// Maximum distinct files per campaign at `tier`.
    pub fn max_files(&self, tier: Tier) -> usize {
        match tier {
            Tier::Mechanical => self.limits.mechanical_max_files,
            Tier::Contextual | Tier::Judgment => self.limits.max_files,
        }
    }

    /// Campaigns covering every pending issue exactly once, cheapest tier
    /// first and largest first within a tier.
    pub fn generate(&self, issues: &[Issue]) -> Vec<Campaign> {
        let mut groups: BTreeMap<(&str, Tier), Vec<&Issue>> = BTreeMap::new();
        for issue in issues.iter().filter(|i| i.status == IssueStatus::Pending) {
            let Some(tier) = issue.tier.known() else {
                tracing::debug!(issue = %issue.id, tier = %issue.tier, "unrecognized tier, not batched");
                continue;
            };
            groups
                .entry((issue.rule_id.as_str(), tier))
                .or_default()
                .push(issue);
        }

        let slugs = RuleSlugs::new(groups.keys().copied());

        let mut ordered: Vec<_> = groups.into_iter().collect();
        ordered.sort_by(|((rule_a, tier_a), a), ((rule_b, tier_b), b)| {
            b.len()
                .cmp(&a.len())
                .then_with(|| rule_a.cmp(rule_b))
                .then_with(|| tier_a.cmp(tier_b))
        });

        let mut ids = IdRegistry::default();
        let mut campaigns = Vec::new();
        for ((rule_id, tier), group) in ordered {
            let base = slugs.base_id(rule_id, tier);
            self.split_group(&base, tier, &group, &mut ids, &mut campaigns);
        }

        campaigns.sort_by(|a, b| {
            a.tier
                .cmp(&b.tier)
                .then_with(|| b.issue_count.cmp(&a.issue_count))
        });
        campaigns
    }

    fn split_group(
        &self,
        base: &str,
        tier: Tier,
        group: &[&Issue],
        ids: &mut IdRegistry,
        campaigns: &mut Vec<Campaign>,
    ) {
        let limit = self.max_files(tier);
        if distinct_files(group).len() <= limit {
            campaigns.push(self.build(ids.claim(base.to_string()), tier, group));
            return;
        }

        let mut modules: BTreeMap<String, Vec<&Issue>> = BTreeMap::new();
        for issue in group {
            modules
                .entry(self.resolver.resolve_module(&issue.file))
                .or_default()
                .push(issue);
        }

        for (module, members) in modules {
            let module_id = format!("{base}--{}", slugify(&module));
            let files = distinct_files(&members);
            if files.len() <= limit {
                campaigns.push(self.build(ids.claim(module_id), tier, &members));
                continue;
            }

            let files: Vec<&str> = files.into_iter().collect();
            for (index, chunk) in files.chunks(limit).enumerate() {
                let chunk: HashSet<&str> = chunk.iter().copied().collect();
                let chunk_issues: Vec<&Issue> = members
                    .iter()
                    .copied()
                    .filter(|i| chunk.contains(i.file.as_str()))
                    .collect();
                let id = format!("{module_id}--{}", index + 1);
                campaigns.push(self.build(ids.claim(id), tier, &chunk_issues));
            }
        }
    }

    fn build(&self, campaign_id: String, tier: Tier, issues: &[&Issue]) -> Campaign {
        let first = issues[0];

        let mut files: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        for issue in issues {
            files.entry(issue.file.clone()).or_default().push(issue.line);
        }
        for lines in files.values_mut() {
            lines.sort_unstable();
            lines.dedup();
        }

        Campaign {
            campaign_id,
            rule_id: first.rule_id.clone(),
            tier,
            agent_type: tier.agent(),
            model: tier.model(),
            project: project_of(first, self.projects),
            issue_count: issues.len(),
            file_count: files.len(),
            fix_hint: first
                .fix_hint
                .clone()
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FIX_HINT.to_string()),
            files,
            issue_ids: issues.iter().map(|i| i.id.clone()).collect(),
        }
    }
}

/// The issue's own project tag, else the first configured marker found in
/// its path.
pub fn project_of(issue: &Issue, projects: &[ProjectMarker]) -> String {
    if let Some(project) = issue.project.as_deref().filter(|p| !p.is_empty()) {
        return project.to_string();
    }
    projects
        .iter()
        .find(|p| issue.file.contains(&p.marker))
        .map_or_else(|| UNKNOWN_PROJECT.to_string(), |p| p.name.clone())
}

/// Lowercase, with every run of other characters collapsed to `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let trimmed = slug.trim_end_matches('-').len();
    slug.truncate(trimmed);
    slug
}

fn distinct_files<'i>(issues: &[&'i Issue]) -> BTreeSet<&'i str> {
    issues.iter().map(|i| i.file.as_str()).collect()
}

/// Base ids per (rule, tier).
struct RuleSlugs {
    short_collisions: HashSet<String>,
    multi_tier_rules: HashSet<String>,
}

impl RuleSlugs {
    fn new<'r>(keys: impl Iterator<Item = (&'r str, Tier)>) -> Self {
        let mut rules_by_slug: HashMap<String, BTreeSet<&str>> = HashMap::new();
        let mut tiers_by_rule: HashMap<&str, BTreeSet<Tier>> = HashMap::new();
        for (rule_id, tier) in keys {
            rules_by_slug
                .entry(short_slug(rule_id))
                .or_default()
                .insert(rule_id);
            tiers_by_rule.entry(rule_id).or_default().insert(tier);
        }

        Self {
            short_collisions: rules_by_slug
                .into_iter()
                .filter(|(_, rules)| rules.len() > 1)
                .map(|(slug, _)| slug)
                .collect(),
            multi_tier_rules: tiers_by_rule
                .into_iter()
                .filter(|(_, tiers)| tiers.len() > 1)
                .map(|(rule, _)| rule.to_string())
                .collect(),
        }
    }

    fn base_id(&self, rule_id: &str, tier: Tier) -> String {
        let short = short_slug(rule_id);
        let mut id = if self.short_collisions.contains(&short) {
            slugify(rule_id)
        } else {
            short
        };
        if id.is_empty() {
            id.push_str("rule");
        }
        if self.multi_tier_rules.contains(rule_id) {
            id = format!("{id}--{tier}");
        }
        id
    }
}

fn short_slug(rule_id: &str) -> String {
    slugify(rule_id.rsplit('/').next().unwrap_or(rule_id))
}

/// Keeps ids unique when two module names slug to the same text.
#[derive(Default)]
struct IdRegistry {
    seen: HashSet<String>,
}

impl IdRegistry {
    fn claim(&mut self, id: String) -> String {
        if self.seen.insert(id.clone()) {
            return id;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{id}-{n}");
            if self.seen.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
