//! Glossary term tags
//!
//! Compiled glossaries tag every entry with `[ID:TERM-nnn]`. A terminology
//! claim is only grounded when the id it cites is present in that text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn term_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[ID:([A-Za-z0-9][A-Za-z0-9_.\-]*)\]").expect("static regex")
    })
}

/// All well-formed term ids present in the glossary text.
pub fn term_ids(glossary_text: &str) -> BTreeSet<String> {
    term_tag_regex()
        .captures_iter(glossary_text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Accepts `TERM-001`, `ID:TERM-001`, or `[ID:TERM-001]`.
pub fn normalize_term_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);
    inner
        .strip_prefix("ID:")
        .unwrap_or(inner)
        .trim()
        .to_string()
}

/// One uploaded terminology pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Render entries as tagged glossary text, minting sequential ids.
pub fn compile(entries: &[GlossaryEntry]) -> String {
    entries
        .iter()
        .filter(|e| !e.source.trim().is_empty())
        .enumerate()
        .map(|(i, e)| {
            let mut line = format!(
                "[ID:TERM-{:03}] {} => {}",
                i + 1,
                e.source.trim(),
                e.target.trim()
            );
            if let Some(note) = e.note.as_deref().filter(|n| !n.trim().is_empty()) {
                line.push_str(&format!(" ({})", note.trim()));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_ids_extracts_tags() {
        let text = "[ID:TERM-001] Save => Speichern\n[ID:TERM-002] Cancel => Abbrechen\nnoise [ID:] [ID: X]";
        let ids = term_ids(text);
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec!["TERM-001".to_string(), "TERM-002".to_string()]
        );
    }

    #[test]
    fn test_term_ids_empty_glossary() {
        assert!(term_ids("").is_empty());
        assert!(term_ids("Save => Speichern").is_empty());
    }

    #[test]
    fn test_normalize_term_id() {
        assert_eq!(normalize_term_id("TERM-001"), "TERM-001");
        assert_eq!(normalize_term_id(" ID:TERM-001 "), "TERM-001");
        assert_eq!(normalize_term_id("[ID:TERM-001]"), "TERM-001");
    }

    #[test]
    fn test_compile_mints_sequential_ids() {
        let entries = vec![
            GlossaryEntry {
                source: "Save".to_string(),
                target: "Speichern".to_string(),
                note: None,
            },
            GlossaryEntry {
                source: " ".to_string(),
                target: "skipped".to_string(),
                note: None,
            },
            GlossaryEntry {
                source: "Workspace".to_string(),
                target: "Arbeitsbereich".to_string(),
                note: Some("product term".to_string()),
            },
        ];
        let text = compile(&entries);
        assert_eq!(
            text,
            "[ID:TERM-001] Save => Speichern\n[ID:TERM-002] Workspace => Arbeitsbereich (product term)"
        );
        assert_eq!(term_ids(&text).len(), 2);
    }
}
