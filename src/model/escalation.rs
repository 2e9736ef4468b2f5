//! Escalation descriptor: everything a re-dispatch prompt needs.

use serde::Serialize;

use super::{IssueTier, ModelClass, Tier};

/// A pending escalation, normalized for re-dispatch at a stronger tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Escalation {
    pub issue_id: String,
    pub target_tier: Tier,
    pub target_model: ModelClass,
    pub original_tier: IssueTier,
    pub file: String,
    pub line: u32,
    #[serde(rename = "ruleId")]
    pub rule_id: String,
    pub message: String,
    pub escalation_reason: String,
}
