//! Tolerant outcome format: labelled fields in free-form markdown.
//!
//! Agents write the outcome block by hand, so every field has a short list
//! of spellings tried in order. The first pattern yielding a non-empty
//! value wins. Labels match case-insensitively, bold or plain:
//!
//! ```text
//! - **Status**: Resolved          Status: COMPLETED          **FIXED**
//! - **Tier:** haiku               tier: contextual
//! - **Escalate To**: sonnet       escalate_to: human
//! - **Reason**: text up to the next list item or label
//! - **Changes Made**: same extent as reason
//! - **Handoff**: everything to the end of the section
//! ```
//!
//! Without a status there is no outcome.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{EscalationTarget, OutcomeStatus, Tier};

use super::OutcomeFields;

/// `**label**:`, `**label:**`, `- **Label** :` and friends.
const BOLD: &str = r"\*\*\s*(?:{label})\s*:?\s*\*\*[ \t]*:?[ \t]*";

/// A plain label must be followed by a separator.
const PLAIN: &str = r"\b(?:{label})[ \t]*[:=][ \t]*";

fn label_patterns(label: &str, value: &str) -> Vec<Regex> {
    [BOLD, PLAIN]
        .into_iter()
        .map(|shape| {
            let pattern = format!("(?i){}{value}", shape.replace("{label}", label));
            Regex::new(&pattern).unwrap()
        })
        .collect()
}

/// Value is the next word, optionally bolded.
const WORD: &str = r"\**[ \t]*(\w+)";

static STATUS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let mut patterns = label_patterns("status", WORD);
    patterns.push(
        Regex::new(
            r"(?i)\*\*\s*(fixed|resolved|done|completed?|escalated?|skip(?:ped)?)\s*\*\*",
        )
        .unwrap(),
    );
    patterns
});

static TIER: LazyLock<Vec<Regex>> = LazyLock::new(|| label_patterns("tier", WORD));

static ESCALATE_TO: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let mut patterns = label_patterns(r"escalate[\s_-]*to", WORD);
    // Prose like "escalate to sonnet" only counts when it names a known target.
    patterns.push(
        Regex::new(
            r"(?i)\bescalate\s+to\s+\**(mechanical|contextual|judge?ment|haiku|sonnet|opus|human)\b",
        )
        .unwrap(),
    );
    patterns
});

static REASON: LazyLock<Vec<Regex>> =
    LazyLock::new(|| label_patterns("reason|problem|solution", ""));

static CHANGES: LazyLock<Vec<Regex>> =
    LazyLock::new(|| label_patterns(r"changes(?:\s+made)?", ""));

static HANDOFF: LazyLock<Vec<Regex>> =
    LazyLock::new(|| label_patterns(r"handoff(?:\s+notes)?", ""));

/// Every field label, for spotting where the next field starts.
const ANY_LABEL: &str =
    r"status|tier|escalate[\s_-]*to|reason|problem|solution|changes(?:\s+made)?|handoff(?:\s+notes)?";

/// Where a paragraph-valued field stops: a blank line, or a line that
/// opens a list item or another field's label.
static PARAGRAPH_END: LazyLock<Regex> = LazyLock::new(|| {
    let next_label = format!(
        r"\n[ \t]*(?i:\*\*[ \t]*(?:{ANY_LABEL})[ \t]*:?[ \t]*\*\*|(?:{ANY_LABEL})[ \t]*[:=])"
    );
    Regex::new(&format!(r"\n[ \t]*[-*\[]|\n[ \t]*\n|{next_label}")).unwrap()
});

#[derive(Clone, Copy)]
enum Extent {
    Paragraph,
    Rest,
}

/// Parse a tolerant outcome section.
pub fn parse(section: &str) -> Option<OutcomeFields> {
    let status = word(section, &STATUS).map(OutcomeStatus::normalize)?;

    Some(OutcomeFields {
        status,
        tier: word(section, &TIER).and_then(Tier::parse),
        escalate_to: word(section, &ESCALATE_TO).map(EscalationTarget::parse),
        reason: text(section, &REASON, Extent::Paragraph),
        changes: text(section, &CHANGES, Extent::Paragraph),
        handoff: text(section, &HANDOFF, Extent::Rest),
    })
}

fn word<'a>(section: &'a str, patterns: &[Regex]) -> Option<&'a str> {
    patterns.iter().find_map(|re| {
        re.captures(section)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
    })
}

fn text(section: &str, patterns: &[Regex], extent: Extent) -> Option<String> {
    patterns.iter().find_map(|re| {
        let label = re.find(section)?;
        let rest = &section[label.end()..];
        let value = match extent {
            Extent::Paragraph => PARAGRAPH_END
                .find(rest)
                .map_or(rest, |end| &rest[..end.start()]),
            Extent::Rest => rest,
        };
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_spellings_all_normalize_to_fixed() {
        for section in [
            "- **status**: Resolved",
            "Status: COMPLETED",
            "**FIXED**\n\nRemoved the unused import.",
            "- **Status:** done",
            "status = fixed",
        ] {
            let fields = parse(section).unwrap_or_else(|| panic!("no outcome in {section:?}"));
            assert_eq!(fields.status, OutcomeStatus::Fixed, "{section}");
        }
    }

    #[test]
    fn full_bulleted_outcome() {
        let section = "- **Status**: escalate\n\
                       - **Tier**: haiku\n\
                       - **Escalate To**: sonnet\n\
                       - **Reason**: The fix needs the caller's types\n  which live in another module.\n\
                       - **Changes Made**: none\n\
                       - **Handoff**: Look at `parseConfig` first.\n\nIt owns the shape.";

        let fields = parse(section).unwrap();

        assert_eq!(fields.status, OutcomeStatus::Escalate);
        assert_eq!(fields.tier, Some(Tier::Mechanical));
        assert_eq!(
            fields.escalate_to,
            Some(EscalationTarget::Tier(Tier::Contextual))
        );
        assert_eq!(
            fields.reason.as_deref(),
            Some("The fix needs the caller's types\n  which live in another module.")
        );
        assert_eq!(fields.changes.as_deref(), Some("none"));
        assert_eq!(
            fields.handoff.as_deref(),
            Some("Look at `parseConfig` first.\n\nIt owns the shape.")
        );
    }

    #[test]
    fn plain_labels_and_aliases() {
        let section = "status: skip\ntier: contextual\nproblem: generated file, not ours";

        let fields = parse(section).unwrap();

        assert_eq!(fields.status, OutcomeStatus::Skip);
        assert_eq!(fields.tier, Some(Tier::Contextual));
        assert_eq!(fields.reason.as_deref(), Some("generated file, not ours"));
        assert_eq!(fields.escalate_to, None);
    }

    #[test]
    fn unbulleted_fields_end_at_the_next_label() {
        let section = "status: escalate\n\
                       reason: needs types\n\
                       from the shared module\n\
                       changes: none\n\
                       **Handoff:** start at types.ts";

        let fields = parse(section).unwrap();

        assert_eq!(fields.reason.as_deref(), Some("needs types\nfrom the shared module"));
        assert_eq!(fields.changes.as_deref(), Some("none"));
        assert_eq!(fields.handoff.as_deref(), Some("start at types.ts"));
    }

    #[test]
    fn escalate_to_variants() {
        let underscored = parse("status: escalate\nescalate_to: human").unwrap();
        assert_eq!(underscored.escalate_to, Some(EscalationTarget::Human));

        let prose = parse("**ESCALATE**\nThis should escalate to opus.").unwrap();
        assert_eq!(prose.escalate_to, Some(EscalationTarget::Tier(Tier::Judgment)));

        let vague = parse("**ESCALATE**\nI would escalate to the next tier.").unwrap();
        assert_eq!(vague.escalate_to, None);

        let odd = parse("status: escalate\nescalate to: wizard").unwrap();
        assert_eq!(
            odd.escalate_to,
            Some(EscalationTarget::Unrecognized("wizard".into()))
        );
    }

    #[test]
    fn unknown_status_is_kept_and_unknown_tier_dropped() {
        let fields = parse("status: partial\ntier: gigantic").unwrap();
        assert_eq!(fields.status, OutcomeStatus::Other("partial".into()));
        assert_eq!(fields.tier, None);
    }

    #[test]
    fn no_status_means_no_outcome() {
        assert!(parse("- **Tier**: mechanical\n- **Reason**: unsure").is_none());
        assert!(parse("The status of this change is unclear.").is_none());
    }

    #[test]
    fn empty_field_values_are_absent() {
        let fields = parse("status: fixed\nreason:\n- changes: tidied").unwrap();
        assert_eq!(fields.reason, None);
        assert_eq!(fields.changes.as_deref(), Some("tidied"));
    }
}
