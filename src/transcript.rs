//! Outcome recovery from agent transcripts.
//!
//! A transcript is line-delimited JSON written while a dispatched agent
//! worked one issue. Somewhere in the agent's text there should be an
//! `## Outcome` section. This module finds it, parses it (strict fenced
//! JSON first, tolerant markdown second), and works out which issue it
//! belongs to.

mod record;
mod scan;
mod section;
mod strict;
mod tolerant;

use std::collections::BTreeMap;

use jiff::Timestamp;
use regex::Regex;

use crate::model::{EscalationTarget, Outcome, OutcomeStatus, Tier};

use record::{Role, Transcript};
use section::find_section;

pub use scan::discover;

/// The fields an outcome section carries, before issue attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeFields {
    pub status: OutcomeStatus,
    pub tier: Option<Tier>,
    pub escalate_to: Option<EscalationTarget>,
    pub reason: Option<String>,
    pub changes: Option<String>,
    pub handoff: Option<String>,
}

/// Parse an outcome section body. `None` when it carries no status.
pub fn parse_outcome(section: &str) -> Option<OutcomeFields> {
    strict::parse(section).or_else(|| tolerant::parse(section))
}

/// What a transcript yielded: the winning outcome section and the issue id
/// found in the transcript text, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub issue_id: Option<String>,
    pub fields: OutcomeFields,
}

impl Recovered {
    /// Build the stored outcome. `registered` is the issue the dispatch map
    /// holds for this dispatch; it's used only when the text named none.
    pub fn into_outcome(
        self,
        task_id: &str,
        registered: Option<&str>,
        parsed_at: Timestamp,
    ) -> Outcome {
        let OutcomeFields {
            status,
            tier,
            escalate_to,
            reason,
            changes,
            handoff,
        } = self.fields;

        Outcome {
            issue_id: self.issue_id.or_else(|| registered.map(String::from)),
            status,
            tier,
            escalate_to,
            reason,
            changes,
            handoff,
            task_id: Some(task_id.to_string()),
            parsed_at: Some(parsed_at),
        }
    }
}

/// Extracts outcomes from transcript text.
pub struct TranscriptParser {
    issue_id: Regex,
}

impl TranscriptParser {
    pub fn new(issue_id: Regex) -> Self {
        Self { issue_id }
    }

    /// Parse one transcript into an outcome for `task_id`.
    pub fn parse(
        &self,
        task_id: &str,
        content: &str,
        dispatch_map: &BTreeMap<String, String>,
    ) -> Option<Outcome> {
        let recovered = self.recover(content)?;
        let registered = dispatch_map.get(task_id).map(String::as_str);
        Some(recovered.into_outcome(task_id, registered, Timestamp::now()))
    }

    /// Find the outcome section and the issue it belongs to.
    ///
    /// When the agent wrote several outcome sections, the last one that
    /// parses wins. The issue id is the first match in the prompt text,
    /// then in the text carrying the winning section, then anywhere in
    /// the agent's text.
    pub fn recover(&self, content: &str) -> Option<Recovered> {
        let transcript = Transcript::parse(content);
        if transcript.malformed > 0 {
            tracing::debug!(
                malformed = transcript.malformed,
                "transcript had malformed records"
            );
        }

        let mut prompt_issue = None;
        let mut agent_issue = None;
        let mut outcome: Option<(OutcomeFields, Option<String>)> = None;

        for record in &transcript.records {
            for text in &record.texts {
                match record.role {
                    Role::User => {
                        if prompt_issue.is_none() {
                            prompt_issue = self.find_issue_id(text);
                        }
                    }
                    Role::Agent => {
                        if agent_issue.is_none() {
                            agent_issue = self.find_issue_id(text);
                        }
                        if let Some(section) = find_section(text)
                            && let Some(fields) = parse_outcome(section)
                        {
                            outcome = Some((fields, self.find_issue_id(text)));
                        }
                    }
                }
            }
        }

        let (fields, outcome_issue) = outcome?;
        Some(Recovered {
            issue_id: prompt_issue.or(outcome_issue).or(agent_issue),
            fields,
        })
    }

    fn find_issue_id(&self, text: &str) -> Option<String> {
        self.issue_id.find(text).map(|m| m.as_str().to_string())
    }
}
