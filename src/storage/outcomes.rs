//! Outcome stores: the latest outcome per issue, and the ones nobody claimed.
//!
//! The resolved store holds at most one outcome per issue id; a later
//! dispatch replaces an earlier one, never the reverse. Outcomes whose
//! issue couldn't be identified wait in the unresolved store, keyed by
//! dispatch id, until their dispatch is attributed.

use std::collections::{BTreeMap, HashSet};

use crate::model::{Outcome, UNKNOWN};

use super::{Result, Snapshot, Storage, commit_store, read_store};

/// Outcomes keyed by issue id (resolved) or dispatch id (unresolved).
pub type OutcomeBook = BTreeMap<String, Outcome>;

impl Storage {
    /// Loads the latest outcome per issue id.
    pub fn load_outcomes(&self) -> Result<OutcomeBook> {
        Ok(self.load_outcomes_for_update()?.data)
    }

    pub fn load_outcomes_for_update(&self) -> Result<Snapshot<OutcomeBook>> {
        read_store(&self.paths.outcomes)
    }

    pub fn commit_outcomes(&self, snapshot: &mut Snapshot<OutcomeBook>) -> Result<()> {
        snapshot.revision = commit_store(&self.paths.outcomes, &snapshot.revision, &snapshot.data)?;
        Ok(())
    }

    /// Loads outcomes whose issue couldn't be identified, keyed by dispatch id.
    pub fn load_unresolved_outcomes(&self) -> Result<OutcomeBook> {
        Ok(self.load_unresolved_outcomes_for_update()?.data)
    }

    pub fn load_unresolved_outcomes_for_update(&self) -> Result<Snapshot<OutcomeBook>> {
        read_store(&self.paths.unresolved_outcomes)
    }

    pub fn commit_unresolved_outcomes(&self, snapshot: &mut Snapshot<OutcomeBook>) -> Result<()> {
        snapshot.revision = commit_store(
            &self.paths.unresolved_outcomes,
            &snapshot.revision,
            &snapshot.data,
        )?;
        Ok(())
    }
}

/// What filing one outcome did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filing {
    /// Stored as the issue's current outcome.
    Updated,

    /// An outcome from a later dispatch was already stored.
    Kept,

    /// No issue id; parked in the unresolved store.
    Unresolved,
}

/// Files a freshly parsed outcome into the two stores.
pub fn file_outcome(
    resolved: &mut OutcomeBook,
    unresolved: &mut OutcomeBook,
    outcome: Outcome,
) -> Filing {
    let Some(issue_id) = outcome.issue_id.clone() else {
        let key = outcome.task_id.clone().unwrap_or_else(|| UNKNOWN.to_string());
        unresolved.insert(key, outcome);
        return Filing::Unresolved;
    };

    if let Some(task_id) = &outcome.task_id {
        unresolved.remove(task_id);
    }

    match resolved.get(&issue_id) {
        Some(existing) if !outcome.supersedes(existing) => {
            tracing::debug!(
                issue = %issue_id,
                task = outcome.task_id.as_deref().unwrap_or(UNKNOWN),
                "keeping outcome from a later dispatch"
            );
            Filing::Kept
        }
        _ => {
            resolved.insert(issue_id, outcome);
            Filing::Updated
        }
    }
}

/// Dispatch ids whose outcome is already attributed to an issue.
pub fn resolved_dispatch_ids(resolved: &OutcomeBook) -> HashSet<&str> {
    resolved
        .values()
        .filter_map(|o| o.task_id.as_deref())
        .collect()
}
