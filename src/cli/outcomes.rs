//! Outcome commands: parse-outcomes, reconcile, assign-outcome.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::dispatch::assign_outcome;
use crate::escalation::reconcile;
use crate::storage::{Filing, Storage, file_outcome, resolved_dispatch_ids};
use crate::transcript::{self, TranscriptParser};

/// Counts from one parse-outcomes run.
#[derive(Debug, Default)]
struct ParseSummary {
    /// Transcripts looked at.
    total: usize,
    /// Already attributed in the outcome store.
    known: usize,
    unreadable: usize,
    /// Outcome sections recovered.
    parsed: usize,
    /// Stored as their issue's current outcome.
    updated: usize,
    /// Recovered but attributed to no issue.
    unknown: usize,
    no_outcome: usize,
}

pub(super) fn cmd_parse(config: &Config, storage: &Storage, dir: Option<PathBuf>) -> Result<(), String> {
    let dir = dir.unwrap_or_else(|| config.in_state_dir(&config.transcripts_dir));
    let files = transcript::discover(&dir, &config.transcript_glob)
        .map_err(|e| format!("failed to list transcripts: {e}"))?;
    let parser = TranscriptParser::new(config.issue_id_regex()?);

    let dispatch_map = storage
        .load_dispatch_map()
        .map_err(|e| format!("failed to load dispatch map: {e}"))?;
    let mut resolved = storage
        .load_outcomes_for_update()
        .map_err(|e| format!("failed to load outcomes: {e}"))?;
    let mut unresolved = storage
        .load_unresolved_outcomes_for_update()
        .map_err(|e| format!("failed to load unresolved outcomes: {e}"))?;

    let known: HashSet<String> = resolved_dispatch_ids(&resolved.data)
        .into_iter()
        .map(String::from)
        .collect();

    let mut summary = ParseSummary {
        total: files.len(),
        ..ParseSummary::default()
    };
    for file in &files {
        if known.contains(&file.task_id) {
            summary.known += 1;
            continue;
        }
        let Some(content) = read_transcript(&file.path) else {
            summary.unreadable += 1;
            continue;
        };
        let Some(outcome) = parser.parse(&file.task_id, &content, &dispatch_map) else {
            tracing::debug!(task = %file.task_id, "no outcome section");
            summary.no_outcome += 1;
            continue;
        };

        summary.parsed += 1;
        match file_outcome(&mut resolved.data, &mut unresolved.data, outcome) {
            Filing::Updated => summary.updated += 1,
            Filing::Kept => {}
            Filing::Unresolved => {
                tracing::warn!(task = %file.task_id, "outcome names no known issue");
                summary.unknown += 1;
            }
        }
    }

    storage
        .commit_outcomes(&mut resolved)
        .map_err(|e| format!("failed to save outcomes: {e}"))?;
    storage
        .commit_unresolved_outcomes(&mut unresolved)
        .map_err(|e| format!("failed to save unresolved outcomes: {e}"))?;

    tracing::info!(?summary, dir = %dir.display(), "parsed transcripts");
    println!(
        "Parsed {} outcomes: {} updated, {} unknown issue, {} no outcome ({} transcripts, {} already known, {} unreadable)",
        summary.parsed,
        summary.updated,
        summary.unknown,
        summary.no_outcome,
        summary.total,
        summary.known,
        summary.unreadable,
    );
    Ok(())
}

fn read_transcript(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable transcript");
            None
        }
    }
}

pub(super) fn cmd_reconcile(storage: &Storage) -> Result<(), String> {
    let summary = reconcile(storage).map_err(|e| format!("failed to reconcile outcomes: {e}"))?;
    println!(
        "Updated {} of {} issues ({} unchanged, {} stale, {} not in manifest)",
        summary.updated, summary.total, summary.unchanged, summary.stale, summary.missing
    );
    Ok(())
}

pub(super) fn cmd_assign(storage: &Storage, dispatch_id: &str, issue_id: &str) -> Result<(), String> {
    let filing = assign_outcome(storage, dispatch_id, issue_id)
        .map_err(|e| format!("failed to assign outcome: {e}"))?;
    if filing == Filing::Kept {
        println!("Assigned {dispatch_id} → {issue_id}; a later outcome for {issue_id} is kept");
    } else {
        println!("Assigned {dispatch_id} → {issue_id}");
    }
    Ok(())
}
