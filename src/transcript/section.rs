//! Locating the agent-authored `## Outcome` section inside a text segment.

use std::sync::LazyLock;

use regex::Regex;

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t]*#{2,3}[ \t]*outcome\b[^\n]*(?:\n|$)").unwrap());

/// The body of the first outcome section in `text`, if any.
///
/// The body runs from the line after the header to the next `##`
/// heading, two consecutive blank lines, or the end of the text.
pub fn find_section(text: &str) -> Option<&str> {
    let header = HEADER.find(text)?;
    let body = text[header.end()..].trim_start_matches(['\n', '\r']);

    // A heading right under the header leaves the section empty.
    let end = if body.starts_with("##") {
        0
    } else {
        [body.find("\n##"), body.find("\n\n\n")]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(body.len())
    };

    let section = body[..end].trim();
    (!section.is_empty()).then_some(section)
}
