//! Closed status vocabularies with normalization at every ingestion boundary.
//!
//! Each type serializes as a plain string. Values outside the known
//! vocabulary are preserved verbatim in an `Other`/`Unrecognized`
//! variant so an operator can still inspect them after a load/save cycle.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Tier;

/// Where an issue stands in its remediation lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IssueStatus {
    #[default]
    Pending,
    InProgress,
    Fixed,
    Escalated,
    Skipped,
    Failed,
    HumanReview,
    Other(String),
}

impl IssueStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Fixed => "fixed",
            Self::Escalated => "escalated",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::HumanReview => "human_review",
            Self::Other(raw) => raw,
        }
    }

    /// Terminal statuses are never moved by automatic dispatch.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Fixed | Self::Skipped | Self::HumanReview)
    }
}

impl From<String> for IssueStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "in_progress" => Self::InProgress,
            "fixed" => Self::Fixed,
            // Outcome spellings leak into manifests written by older tooling.
            "escalated" | "escalate" => Self::Escalated,
            "skipped" | "skip" => Self::Skipped,
            "failed" => Self::Failed,
            "human_review" => Self::HumanReview,
            _ => Self::Other(raw),
        }
    }
}

impl From<IssueStatus> for String {
    fn from(status: IssueStatus) -> Self {
        match status {
            IssueStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The status an agent reported for one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutcomeStatus {
    Fixed,
    Escalate,
    Skip,
    /// Anything outside the synonym table, kept as written.
    Other(String),
}

impl OutcomeStatus {
    /// Normalize an agent-written status word.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fixed" | "resolved" | "done" | "complete" | "completed" => Self::Fixed,
            "escalate" | "escalated" => Self::Escalate,
            "skip" | "skipped" => Self::Skip,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Fixed => "fixed",
            Self::Escalate => "escalate",
            Self::Skip => "skip",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// The issue status this outcome moves an issue to.
    pub fn issue_status(&self) -> IssueStatus {
        match self {
            Self::Fixed => IssueStatus::Fixed,
            Self::Escalate => IssueStatus::Escalated,
            Self::Skip => IssueStatus::Skipped,
            Self::Other(raw) => IssueStatus::Other(raw.clone()),
        }
    }
}

impl From<String> for OutcomeStatus {
    fn from(raw: String) -> Self {
        Self::normalize(&raw)
    }
}

impl From<OutcomeStatus> for String {
    fn from(status: OutcomeStatus) -> Self {
        match status {
            OutcomeStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an escalated issue should go next.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EscalationTarget {
    Tier(Tier),
    Human,
    /// Not a tier or `human`; never auto-dispatched.
    Unrecognized(String),
}

impl EscalationTarget {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("human") {
            return Self::Human;
        }
        match Tier::parse(raw) {
            Some(tier) => Self::Tier(tier),
            None => Self::Unrecognized(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Tier(tier) => tier.as_str(),
            Self::Human => "human",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// The tier to auto-dispatch to, if any.
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Self::Tier(tier) => Some(*tier),
            Self::Human | Self::Unrecognized(_) => None,
        }
    }
}

impl From<String> for EscalationTarget {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<EscalationTarget> for String {
    fn from(target: EscalationTarget) -> Self {
        match target {
            EscalationTarget::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EscalationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_synonyms_normalize() {
        for word in ["fixed", "Resolved", "DONE", "complete", "COMPLETED"] {
            assert_eq!(OutcomeStatus::normalize(word), OutcomeStatus::Fixed, "{word}");
        }
        assert_eq!(OutcomeStatus::normalize("Escalated"), OutcomeStatus::Escalate);
        assert_eq!(OutcomeStatus::normalize("skipped"), OutcomeStatus::Skip);
    }

    #[test]
    fn unrecognized_outcome_status_is_kept_verbatim() {
        let status = OutcomeStatus::normalize("Partial");
        assert_eq!(status, OutcomeStatus::Other("Partial".into()));
        assert!(!status.is_recognized());
        assert_eq!(String::from(status), "Partial");
    }

    #[test]
    fn issue_status_normalizes_legacy_spellings() {
        let statuses: Vec<IssueStatus> =
            serde_json::from_str(r#"["escalate", "skip", "in_progress", "weird"]"#).unwrap();
        assert_eq!(
            statuses,
            vec![
                IssueStatus::Escalated,
                IssueStatus::Skipped,
                IssueStatus::InProgress,
                IssueStatus::Other("weird".into()),
            ]
        );
        assert_eq!(
            serde_json::to_string(&statuses).unwrap(),
            r#"["escalated","skipped","in_progress","weird"]"#
        );
    }

    #[test]
    fn escalation_target_parses_tiers_aliases_and_human() {
        assert_eq!(
            EscalationTarget::parse("Contextual"),
            EscalationTarget::Tier(Tier::Contextual)
        );
        assert_eq!(
            EscalationTarget::parse("opus"),
            EscalationTarget::Tier(Tier::Judgment)
        );
        assert_eq!(EscalationTarget::parse("HUMAN"), EscalationTarget::Human);

        let other = EscalationTarget::parse("wizard");
        assert_eq!(other.tier(), None);
        assert_eq!(other.as_str(), "wizard");
    }
}
