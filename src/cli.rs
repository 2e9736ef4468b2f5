//! CLI interface for tierfix.
//!
//! Each subcommand is non-interactive: arguments in, a count-based summary
//! or machine-readable output on stdout. Logs go to stderr.
//!
//! Commands follow the remediation loop:
//!
//! - `next-batch` / `write-batch` / `campaigns`: pick work to dispatch.
//! - `register-dispatch`: record that a dispatch went out.
//! - `parse-outcomes` → `reconcile`: fold transcripts back into the manifest.
//! - `escalations` / `human-backlog` / `status`: see what's left.

mod campaigns;
mod dispatch;
mod format;
mod outcomes;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::model::Tier;
use crate::storage::Storage;

/// tierfix: drive lint issues through tiers of fixing agents.
#[derive(Debug, Parser)]
#[command(name = "tierfix", version, after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Config file. Defaults to ./tierfix.toml, then ~/.tierfix/config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug detail to stderr. `RUST_LOG` overrides.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r"Workflow: one round of remediation
  1. tierfix next-batch mechanical 10 --format json
     → dispatch each prompt to an agent, then for each dispatch:
  2. tierfix register-dispatch a1b2c3 lint-0042
  3. tierfix parse-outcomes
  4. tierfix reconcile
  5. tierfix escalations
     → re-dispatch at the target tier, back to step 2
  6. tierfix human-backlog

Batching by rule:
  tierfix campaigns --summary
  tierfix campaigns --task-descriptions --tier mechanical";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse outcomes from a directory of dispatch transcripts.
    ///
    /// Transcripts already attributed in the outcome store are skipped.
    /// A later dispatch replaces an earlier outcome for the same issue.
    ParseOutcomes {
        /// Transcript directory (default: `transcripts-dir` from config).
        dir: Option<PathBuf>,
    },

    /// Record which issue a dispatch was sent for and mark it in progress.
    RegisterDispatch {
        dispatch_id: String,
        issue_id: String,
    },

    /// Apply stored outcomes to the issue manifest.
    #[command(alias = "update-manifest")]
    Reconcile,

    /// Print aggregate counts as JSON.
    Status,

    /// Show the next issues ready for dispatch at a tier.
    NextBatch {
        /// mechanical, contextual, or judgment (haiku/sonnet/opus also work).
        #[arg(value_parser = parse_tier)]
        tier: Tier,

        #[arg(default_value_t = 10)]
        count: usize,

        #[arg(long, value_enum, default_value_t = BatchFormat::Summary)]
        format: BatchFormat,
    },

    /// Write one prompt file per issue in the next batch.
    WriteBatch {
        #[arg(value_parser = parse_tier)]
        tier: Tier,

        #[arg(default_value_t = 10)]
        count: usize,

        /// Output directory (default: `batch-dir` from config).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Render the human review backlog and write it to disk.
    HumanBacklog {
        /// Write here instead of the configured `human-backlog` path.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List escalations due for re-dispatch, with their prompts.
    Escalations {
        /// Emit JSON instead of a listing.
        #[arg(long)]
        json: bool,
    },

    /// Group pending issues into per-rule campaigns.
    Campaigns {
        /// Per-tier overview instead of JSON.
        #[arg(long, conflicts_with = "task_descriptions")]
        summary: bool,

        /// One dispatchable brief per campaign.
        #[arg(long)]
        task_descriptions: bool,

        #[arg(long, value_parser = parse_tier)]
        tier: Option<Tier>,

        /// Agent class, e.g. `quality-sweep`.
        #[arg(long)]
        agent: Option<String>,

        #[arg(long)]
        project: Option<String>,
    },

    /// Put an issue back to pending (e.g. after its dispatch died).
    Reset { issue_id: String },

    /// Attribute an unresolved outcome to an issue by hand.
    AssignOutcome {
        dispatch_id: String,
        issue_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BatchFormat {
    /// One line per issue.
    Summary,
    /// Summary lines followed by ready-to-send prompts.
    Prompts,
    /// Dispatch objects: issue id, model, prompt, file.
    Json,
}

fn parse_tier(label: &str) -> Result<Tier, String> {
    Tier::parse(label).ok_or_else(|| {
        format!("unknown tier '{label}' (expected mechanical, contextual, or judgment)")
    })
}

/// Run a parsed command, returning an error message on failure.
pub fn run(command: Command, config: &Config, storage: &Storage) -> Result<(), String> {
    match command {
        Command::ParseOutcomes { dir } => outcomes::cmd_parse(config, storage, dir),
        Command::RegisterDispatch {
            dispatch_id,
            issue_id,
        } => dispatch::cmd_register(storage, &dispatch_id, &issue_id),
        Command::Reconcile => outcomes::cmd_reconcile(storage),
        Command::Status => report::cmd_status(storage),
        Command::NextBatch {
            tier,
            count,
            format,
        } => dispatch::cmd_next_batch(config, storage, tier, count, format),
        Command::WriteBatch { tier, count, out } => {
            dispatch::cmd_write_batch(config, storage, tier, count, out)
        }
        Command::HumanBacklog { out } => report::cmd_human_backlog(config, storage, out),
        Command::Escalations { json } => report::cmd_escalations(config, storage, json),
        Command::Campaigns {
            summary,
            task_descriptions,
            tier,
            agent,
            project,
        } => {
            let filter = campaigns::CampaignFilter {
                tier,
                agent,
                project,
            };
            let view = if summary {
                campaigns::View::Summary
            } else if task_descriptions {
                campaigns::View::TaskDescriptions
            } else {
                campaigns::View::Json
            };
            campaigns::cmd_campaigns(config, storage, &filter, view)
        }
        Command::Reset { issue_id } => dispatch::cmd_reset(storage, &issue_id),
        Command::AssignOutcome {
            dispatch_id,
            issue_id,
        } => outcomes::cmd_assign(storage, &dispatch_id, &issue_id),
    }
}
