//! Transcript records: one JSON object per line, tagged by role.
//!
//! Only text segments matter here. Tool calls, tool results, and records
//! of other types are passed over. A line that isn't valid JSON is skipped
//! and counted; it never aborts the rest of the transcript.

use serde::Deserialize;
use serde_json::Value;

/// Who authored a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The dispatching side: prompts and follow-ups.
    User,

    /// The fixing agent.
    Agent,
}

/// The text segments of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptRecord {
    pub role: Role,
    pub texts: Vec<String>,
}

/// A transcript reduced to its text-bearing records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub records: Vec<TranscriptRecord>,

    /// Lines that weren't valid JSON.
    pub malformed: usize,
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    kind: String,

    #[serde(default)]
    message: Option<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: Option<RawContent>,
}

/// Content is either a bare string or a list of typed parts.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Parts(Vec<Value>),
}

impl Transcript {
    /// Parse line-delimited transcript records.
    pub fn parse(content: &str) -> Self {
        let mut transcript = Self::default();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let raw: RawRecord = match serde_json::from_str(line) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::debug!(line = index + 1, error = %e, "skipping malformed transcript record");
                    transcript.malformed += 1;
                    continue;
                }
            };

            let role = match raw.kind.as_str() {
                "user" => Role::User,
                "assistant" => Role::Agent,
                _ => continue,
            };

            let texts = raw
                .message
                .and_then(|m| m.content)
                .map(text_segments)
                .unwrap_or_default();
            if !texts.is_empty() {
                transcript.records.push(TranscriptRecord { role, texts });
            }
        }

        transcript
    }
}

fn text_segments(content: RawContent) -> Vec<String> {
    match content {
        RawContent::Text(text) => vec![text],
        RawContent::Parts(parts) => parts
            .into_iter()
            .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|part| part.get("text").and_then(Value::as_str).map(String::from))
            .collect(),
    }
}
