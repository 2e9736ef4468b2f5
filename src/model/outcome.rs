//! Outcome: the structured result recovered from one dispatch transcript.

use jiff::Timestamp;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{EscalationTarget, OutcomeStatus, Tier};

/// Placeholder written for an issue id or tier that couldn't be recovered.
pub const UNKNOWN: &str = "unknown";

/// The parsed result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// `None` when the transcript never named its issue and no dispatch
    /// registration covers it.
    #[serde(default, with = "unknown_label")]
    pub issue_id: Option<String>,

    pub status: OutcomeStatus,

    /// The tier the attempt reported running at.
    #[serde(default, with = "unknown_tier")]
    pub tier: Option<Tier>,

    #[serde(default)]
    pub escalate_to: Option<EscalationTarget>,

    #[serde(default)]
    pub reason: Option<String>,

    #[serde(default)]
    pub changes: Option<String>,

    #[serde(default)]
    pub handoff: Option<String>,

    /// The dispatch identifier whose transcript produced this outcome.
    #[serde(default)]
    pub task_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub parsed_at: Option<Timestamp>,
}

impl Outcome {
    /// Newer-wins: dispatch identifiers increase with creation order, so a
    /// later-sorting id supersedes. An outcome without an id never does.
    pub fn supersedes(&self, existing: &Outcome) -> bool {
        match (&self.task_id, &existing.task_id) {
            (Some(new), Some(old)) => new > old,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// `Option<String>` stored as the string itself, or `"unknown"` for `None`.
mod unknown_label {
    use super::{Deserialize, Deserializer, Serializer, UNKNOWN};

    #[allow(clippy::ref_option)] // Signature fixed by serde.
    pub(super) fn serialize<S: Serializer>(
        value: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(UNKNOWN))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.is_empty() && s != UNKNOWN))
    }
}

/// `Option<Tier>` stored as the tier name, or `"unknown"` for `None`.
mod unknown_tier {
    use super::{Deserialize, Deserializer, Serializer, Tier, UNKNOWN};

    #[allow(clippy::ref_option)] // Signature fixed by serde.
    pub(super) fn serialize<S: Serializer>(
        value: &Option<Tier>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.map_or(UNKNOWN, Tier::as_str))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Tier>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(Tier::parse))
    }
}

/// Older outcome files carry naive local timestamps; those load as `None`
/// rather than failing the whole store.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Timestamp>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse::<Timestamp>().ok()))
}
