//! Scene classification from free-text hints
//!
//! Keyword overlap only. Cheap, deterministic, and good enough to pick which
//! scene-specific skills go into the prompt.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneType {
    Navigation,
    Form,
    Dashboard,
    Modal,
    Table,
    Settings,
    ErrorPage,
    Generic,
}

impl SceneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneType::Navigation => "navigation",
            SceneType::Form => "form",
            SceneType::Dashboard => "dashboard",
            SceneType::Modal => "modal",
            SceneType::Table => "table",
            SceneType::Settings => "settings",
            SceneType::ErrorPage => "error_page",
            SceneType::Generic => "generic",
        }
    }
}

impl fmt::Display for SceneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword table, in tie-break order.
const SCENE_KEYWORDS: &[(SceneType, &[&str])] = &[
    (
        SceneType::Navigation,
        &[
            "navigation", "nav", "menu", "sidebar", "breadcrumb", "header", "footer", "toolbar",
            "link",
        ],
    ),
    (
        SceneType::Form,
        &[
            "form", "input", "field", "login", "sign in", "sign up", "register", "submit",
            "checkbox", "dropdown", "password",
        ],
    ),
    (
        SceneType::Dashboard,
        &[
            "dashboard", "chart", "graph", "metric", "widget", "overview", "analytics", "kpi",
            "statistics",
        ],
    ),
    (
        SceneType::Modal,
        &[
            "modal", "dialog", "popup", "pop-up", "alert", "confirm", "overlay", "toast",
            "tooltip",
        ],
    ),
    (
        SceneType::Table,
        &[
            "table", "grid", "row", "column", "spreadsheet", "cell", "pagination", "sort",
        ],
    ),
    (
        SceneType::Settings,
        &[
            "settings", "preferences", "toggle", "switch", "configuration", "options", "account",
            "privacy",
        ],
    ),
    (
        SceneType::ErrorPage,
        &[
            "error", "404", "500", "not found", "failed", "exception", "oops", "unavailable",
        ],
    ),
];

/// Whole-word matchers for `SCENE_KEYWORDS`, allowing a plural suffix.
fn keyword_matchers() -> &'static [(SceneType, Vec<Regex>)] {
    static MATCHERS: OnceLock<Vec<(SceneType, Vec<Regex>)>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        SCENE_KEYWORDS
            .iter()
            .map(|(scene, keywords)| {
                let patterns = keywords
                    .iter()
                    .map(|k| {
                        Regex::new(&format!(r"\b{}(?:s|es)?\b", regex::escape(k)))
                            .expect("escaped keyword")
                    })
                    .collect();
                (*scene, patterns)
            })
            .collect()
    })
}

/// Map a free-text scene hint to a scene category.
///
/// Returns the category with the most keyword hits; the first category in
/// table order wins a tie. Falls back to `Generic` when nothing matches.
/// Keywords match whole words only, so "form" doesn't fire on "information".
pub fn classify(text: &str) -> SceneType {
    let lower = text.to_lowercase();
    let mut best = SceneType::Generic;
    let mut best_hits = 0usize;

    for (scene, patterns) in keyword_matchers() {
        let hits = patterns.iter().filter(|re| re.is_match(&lower)).count();
        if hits > best_hits {
            best = *scene;
            best_hits = hits;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_hint() {
        assert_eq!(
            classify("settings page with toggle switches"),
            SceneType::Settings
        );
    }

    #[test]
    fn test_no_hits_is_generic() {
        for hint in ["", "   ", "a picture of a cat", "ЛОРЕМ ИПСУМ"] {
            assert_eq!(classify(hint), SceneType::Generic, "hint: {:?}", hint);
        }
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("LOGIN FORM"), SceneType::Form);
    }

    #[test]
    fn test_tie_keeps_first_category() {
        // one navigation hit, one modal hit
        assert_eq!(classify("menu dialog"), SceneType::Navigation);
        assert_eq!(classify("dialog menu"), SceneType::Navigation);
    }

    #[test]
    fn test_highest_count_wins() {
        assert_eq!(
            classify("confirm dialog shown as a modal over the menu"),
            SceneType::Modal
        );
    }

    #[test]
    fn test_keywords_match_whole_words() {
        assert_eq!(classify("account information"), SceneType::Settings);
        assert_eq!(classify("browser with an arrow icon"), SceneType::Generic);
        assert_eq!(classify("formatting of prices"), SceneType::Generic);
    }

    #[test]
    fn test_plural_keywords_match() {
        assert_eq!(classify("two forms with many fields"), SceneType::Form);
        assert_eq!(classify("sortable rows"), SceneType::Table);
    }

    #[test]
    fn test_scene_type_serializes_snake_case() {
        let value = serde_json::to_value(SceneType::ErrorPage).unwrap();
        assert_eq!(value, "error_page");
        assert_eq!(SceneType::ErrorPage.to_string(), "error_page");
    }
}
