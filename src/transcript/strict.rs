//! Strict outcome format: a fenced `outcome` JSON block.
//!
//! ````text
//! ## Outcome
//! ```outcome
//! {"version": 1, "status": "escalate", "tier": "mechanical",
//!  "escalate_to": "contextual", "reason": "needs type context"}
//! ```
//! ````
//!
//! Canonical values only. Anything off-schema is rejected so the tolerant
//! parser gets its turn.

use serde::Deserialize;

use crate::model::{EscalationTarget, OutcomeStatus, Tier};

use super::OutcomeFields;

const VERSION: u32 = 1;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StrictOutcome {
    version: u32,
    status: StrictStatus,
    #[serde(default)]
    tier: Option<Tier>,
    #[serde(default)]
    escalate_to: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    changes: Option<String>,
    #[serde(default)]
    handoff: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum StrictStatus {
    Fixed,
    Escalate,
    Skip,
}

/// Parse the first fenced `outcome` block in `section`.
pub fn parse(section: &str) -> Option<OutcomeFields> {
    let body = fenced_block(section)?;
    let strict: StrictOutcome = match serde_json::from_str(body) {
        Ok(strict) => strict,
        Err(e) => {
            tracing::debug!(error = %e, "fenced outcome block is not valid strict JSON");
            return None;
        }
    };
    if strict.version != VERSION {
        tracing::debug!(version = strict.version, "unsupported outcome block version");
        return None;
    }

    let escalate_to = match strict.escalate_to.as_deref().map(EscalationTarget::parse) {
        Some(EscalationTarget::Unrecognized(raw)) => {
            tracing::debug!(target = %raw, "strict outcome names an unknown escalation target");
            return None;
        }
        target => target,
    };

    Some(OutcomeFields {
        status: match strict.status {
            StrictStatus::Fixed => OutcomeStatus::Fixed,
            StrictStatus::Escalate => OutcomeStatus::Escalate,
            StrictStatus::Skip => OutcomeStatus::Skip,
        },
        tier: strict.tier,
        escalate_to,
        reason: non_empty(strict.reason),
        changes: non_empty(strict.changes),
        handoff: non_empty(strict.handoff),
    })
}

fn fenced_block(section: &str) -> Option<&str> {
    let open = section.find("```outcome")?;
    let rest = &section[open + "```outcome".len()..];
    let rest = &rest[rest.find('\n')? + 1..];
    let close = rest.find("```")?;
    Some(&rest[..close])
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
