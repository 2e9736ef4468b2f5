//! Capability tiers and the agent/model classes derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How much reasoning a fixing attempt is presumed to need.
///
/// Ordered from cheapest to most capable, so `Ord` doubles as the
/// dispatch priority used when sorting campaigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Pattern replacement only.
    Mechanical,

    /// Needs code understanding.
    Contextual,

    /// Needs architectural decisions.
    Judgment,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Mechanical, Tier::Contextual, Tier::Judgment];

    /// Normalize a free-text tier label.
    ///
    /// Accepts the canonical names and the model aliases that agents and
    /// older manifests use interchangeably (`haiku`, `sonnet`, `opus`).
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "mechanical" | "haiku" => Some(Self::Mechanical),
            "contextual" | "sonnet" => Some(Self::Contextual),
            "judgment" | "judgement" | "opus" => Some(Self::Judgment),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mechanical => "mechanical",
            Self::Contextual => "contextual",
            Self::Judgment => "judgment",
        }
    }

    /// The model strength assigned to work at this tier.
    pub fn model(self) -> ModelClass {
        match self {
            Self::Mechanical => ModelClass::Haiku,
            Self::Contextual => ModelClass::Sonnet,
            Self::Judgment => ModelClass::Opus,
        }
    }

    /// The agent class assigned to campaigns at this tier.
    pub fn agent(self) -> AgentClass {
        match self {
            Self::Mechanical => AgentClass::QualitySweep,
            Self::Contextual => AgentClass::QualityDeep,
            Self::Judgment => AgentClass::QualityArchitect,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An issue's tier as the manifest records it.
///
/// Labels outside the vocabulary are kept verbatim so the record still
/// loads and saves; such issues are never dispatched or batched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IssueTier {
    Known(Tier),
    Unrecognized(String),
}

impl IssueTier {
    pub fn known(&self) -> Option<Tier> {
        match self {
            Self::Known(tier) => Some(*tier),
            Self::Unrecognized(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(tier) => tier.as_str(),
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl From<Tier> for IssueTier {
    fn from(tier: Tier) -> Self {
        Self::Known(tier)
    }
}

impl From<String> for IssueTier {
    fn from(raw: String) -> Self {
        match Tier::parse(&raw) {
            Some(tier) => Self::Known(tier),
            None => Self::Unrecognized(raw),
        }
    }
}

impl From<IssueTier> for String {
    fn from(tier: IssueTier) -> Self {
        match tier {
            IssueTier::Known(tier) => tier.as_str().to_string(),
            IssueTier::Unrecognized(raw) => raw,
        }
    }
}

impl PartialEq<Tier> for IssueTier {
    fn eq(&self, other: &Tier) -> bool {
        self.known() == Some(*other)
    }
}

impl fmt::Display for IssueTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model strength a dispatch runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelClass {
    Haiku,
    Sonnet,
    Opus,
}

impl ModelClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Haiku => "haiku",
            Self::Sonnet => "sonnet",
            Self::Opus => "opus",
        }
    }
}

impl fmt::Display for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent class a campaign is handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentClass {
    QualitySweep,
    QualityDeep,
    QualityArchitect,
}

impl AgentClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QualitySweep => "quality-sweep",
            Self::QualityDeep => "quality-deep",
            Self::QualityArchitect => "quality-architect",
        }
    }
}

impl fmt::Display for AgentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
