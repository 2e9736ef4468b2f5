//! Dispatch commands: next-batch, write-batch, register-dispatch, reset.

use std::fs;
use std::path::PathBuf;

use crate::config::Config;
use crate::dispatch::{DispatchInfo, dispatch_prompt, next_batch, register_dispatch, reset};
use crate::model::Tier;
use crate::storage::Storage;

use super::BatchFormat;
use super::format::format_batch_line;

pub(super) fn cmd_next_batch(
    config: &Config,
    storage: &Storage,
    tier: Tier,
    count: usize,
    format: BatchFormat,
) -> Result<(), String> {
    let issues = storage
        .load_issues()
        .map_err(|e| format!("failed to load issues: {e}"))?;
    let batch = next_batch(&issues, tier, count, config.max_escalations);

    match format {
        BatchFormat::Json => {
            let infos: Vec<DispatchInfo> = batch.iter().copied().map(DispatchInfo::new).collect();
            let json = serde_json::to_string_pretty(&infos)
                .map_err(|e| format!("failed to serialize batch: {e}"))?;
            println!("{json}");
        }
        BatchFormat::Summary | BatchFormat::Prompts => {
            if batch.is_empty() {
                println!("No issues ready at {tier} tier");
                return Ok(());
            }
            println!("Next {} at {tier} tier:", batch.len());
            for issue in &batch {
                println!("  {}", format_batch_line(issue));
            }
            if format == BatchFormat::Prompts {
                for issue in &batch {
                    println!("\n--- {} ---\n{}", issue.id, dispatch_prompt(issue));
                }
            }
        }
    }
    Ok(())
}

pub(super) fn cmd_write_batch(
    config: &Config,
    storage: &Storage,
    tier: Tier,
    count: usize,
    out: Option<PathBuf>,
) -> Result<(), String> {
    let issues = storage
        .load_issues()
        .map_err(|e| format!("failed to load issues: {e}"))?;
    let batch = next_batch(&issues, tier, count, config.max_escalations);

    let dir = out.unwrap_or_else(|| config.in_state_dir(&config.batch_dir));
    fs::create_dir_all(&dir).map_err(|e| format!("failed to create {}: {e}", dir.display()))?;

    for issue in &batch {
        let path = dir.join(format!("{}.txt", issue.id));
        fs::write(&path, dispatch_prompt(issue))
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        println!("{}", issue.id);
    }
    eprintln!("Wrote {} prompts to {}", batch.len(), dir.display());
    Ok(())
}

pub(super) fn cmd_register(storage: &Storage, dispatch_id: &str, issue_id: &str) -> Result<(), String> {
    let issue = register_dispatch(storage, dispatch_id, issue_id)
        .map_err(|e| format!("failed to register dispatch: {e}"))?;
    println!("Registered {dispatch_id} → {issue_id} ({} tier)", issue.tier);
    Ok(())
}

pub(super) fn cmd_reset(storage: &Storage, issue_id: &str) -> Result<(), String> {
    reset(storage, issue_id).map_err(|e| format!("failed to reset issue: {e}"))?;
    println!("Reset {issue_id} to pending");
    Ok(())
}
