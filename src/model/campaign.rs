//! Campaign: a dispatchable batch of same-rule, same-tier issues.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{AgentClass, ModelClass, Tier};

/// A derived view over pending issues. Never persisted as state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Campaign {
    pub campaign_id: String,
    pub rule_id: String,
    pub tier: Tier,
    pub agent_type: AgentClass,
    pub model: ModelClass,
    pub project: String,
    pub issue_count: usize,
    pub file_count: usize,
    pub fix_hint: String,

    /// File path to its sorted, de-duplicated implicated lines.
    pub files: BTreeMap<String, Vec<u32>>,

    pub issue_ids: Vec<String>,
}
