//! Localization heuristics ("skills") injected into the model context
//!
//! The registry is static: a general set that applies to every screenshot
//! (some gated on the target language) and a per-scene set. Retrieval and
//! formatting are deterministic so the analysis and verification calls see
//! byte-identical heuristics.

use crate::scene::{classify, SceneType};
use std::fmt::Write as _;

/// Default cap on scene skills rendered into a prompt
pub const DEFAULT_MAX_SCENE_SKILLS: usize = 5;

/// Examples rendered per general skill
const MAX_EXAMPLES_PER_SKILL: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skill {
    pub name: &'static str,
    pub principle: &'static str,
    pub when_to_apply: &'static str,
    pub examples: &'static [&'static str],
    /// Only applies when the target language has this primary subtag
    pub language: Option<&'static str>,
}

impl Skill {
    fn applies_to(&self, target_language: &str) -> bool {
        match self.language {
            None => true,
            Some(lang) => primary_subtag(target_language) == lang,
        }
    }
}

/// `de-AT` / `de_DE` / `DE` -> `de`
pub(crate) fn primary_subtag(language: &str) -> String {
    language
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

const GENERAL_SKILLS: &[Skill] = &[
    Skill {
        name: "Truncation and overflow",
        principle: "Translated text must fit its container without clipping, ellipsis, or overlap.",
        when_to_apply: "Any label, button, or heading whose target text is longer than the source.",
        examples: &[
            "'Einstellungen speich…' cut off inside a fixed-width button",
            "Two-line wrap pushing an icon out of its row",
            "Text overlapping the adjacent control",
        ],
        language: None,
    },
    Skill {
        name: "Meaning over literalness",
        principle: "Judge whether the target conveys the source intent in this UI context, not word-for-word fidelity.",
        when_to_apply: "Short UI strings whose meaning depends on the surrounding control.",
        examples: &[
            "'Open' on a status badge translated as the verb instead of the state",
            "'Back' translated as a body part",
        ],
        language: None,
    },
    Skill {
        name: "Untranslated or placeholder text",
        principle: "Visible source-language text, raw keys, or unreplaced placeholders are defects.",
        when_to_apply: "Any string that still reads as source language or contains {0}, %s, or key.like.this.",
        examples: &["'settings.title' shown verbatim", "'Hello {username}' left unresolved"],
        language: None,
    },
    Skill {
        name: "Locale formatting",
        principle: "Dates, numbers, currency, and units follow the target locale's conventions.",
        when_to_apply: "Any numeric, date, time, or currency value on screen.",
        examples: &["1,234.56 vs 1.234,56", "MM/DD/YYYY shown to a de-DE user"],
        language: None,
    },
    Skill {
        name: "Consistency",
        principle: "The same source term maps to the same target term across the screen.",
        when_to_apply: "Repeated terms in titles, buttons, and body text.",
        examples: &["'Delete' rendered as both 'Löschen' and 'Entfernen' on one dialog"],
        language: None,
    },
    Skill {
        name: "Evidence only",
        principle: "Only report what is visible in the target screenshot; never infer hidden states.",
        when_to_apply: "Before filing any issue.",
        examples: &[],
        language: None,
    },
    Skill {
        name: "German compound words",
        principle: "Long compounds are correct German; flag them only when they break layout or are split incorrectly.",
        when_to_apply: "German targets with long nouns near container edges.",
        examples: &[
            "'Benutzerkontoeinstellungen' overflowing a tab",
            "'Benutzer Konto' written apart instead of 'Benutzerkonto'",
        ],
        language: Some("de"),
    },
];

const NAVIGATION_SKILLS: &[Skill] = &[
    Skill {
        name: "Menu label brevity",
        principle: "Navigation labels should be short nouns or verbs and must not wrap.",
        when_to_apply: "Top bars, sidebars, tab strips.",
        examples: &["'Home' rendered as a full sentence"],
        language: None,
    },
    Skill {
        name: "Active state wording",
        principle: "Selected and unselected states keep the same label text.",
        when_to_apply: "Highlighted menu items or tabs.",
        examples: &[],
        language: None,
    },
];

const FORM_SKILLS: &[Skill] = &[
    Skill {
        name: "Label-field association",
        principle: "Each label still describes the field it sits next to after translation.",
        when_to_apply: "Input fields, checkboxes, radio groups.",
        examples: &["'Name' translated as 'first name' next to a full-name field"],
        language: None,
    },
    Skill {
        name: "Placeholder and hint text",
        principle: "Placeholders and helper text are translated and fit the field.",
        when_to_apply: "Empty inputs showing grey placeholder text.",
        examples: &[],
        language: None,
    },
    Skill {
        name: "Validation messages",
        principle: "Error and required-field messages are complete sentences in the target language.",
        when_to_apply: "Red helper text, asterisks, inline errors.",
        examples: &[],
        language: None,
    },
];

const DASHBOARD_SKILLS: &[Skill] = &[
    Skill {
        name: "Axis and legend labels",
        principle: "Chart axes, legends, and tooltips are translated and not truncated.",
        when_to_apply: "Charts and graphs.",
        examples: &[],
        language: None,
    },
    Skill {
        name: "KPI units",
        principle: "Metric units and abbreviations follow target conventions.",
        when_to_apply: "Stat cards and counters.",
        examples: &["'1.2K' where the locale expects '1,2 Tsd.'"],
        language: None,
    },
];

const MODAL_SKILLS: &[Skill] = &[
    Skill {
        name: "Action button clarity",
        principle: "Confirm and cancel buttons state the action; the destructive one must be unambiguous.",
        when_to_apply: "Dialogs with two or more buttons.",
        examples: &["'OK' / 'OK' after translating 'Delete' / 'Keep'"],
        language: None,
    },
    Skill {
        name: "Title-body agreement",
        principle: "Dialog title and body describe the same action.",
        when_to_apply: "Any modal with a title.",
        examples: &[],
        language: None,
    },
];

const TABLE_SKILLS: &[Skill] = &[
    Skill {
        name: "Column header fit",
        principle: "Column headers fit their column or use an accepted abbreviation.",
        when_to_apply: "Table headers and grid columns.",
        examples: &[],
        language: None,
    },
    Skill {
        name: "Cell value formatting",
        principle: "Numbers, dates, and statuses inside cells are localized consistently per column.",
        when_to_apply: "Data cells.",
        examples: &[],
        language: None,
    },
];

const SETTINGS_SKILLS: &[Skill] = &[
    Skill {
        name: "Toggle semantics",
        principle: "A toggle label describes what ON means; negated or inverted wording is a mistranslation.",
        when_to_apply: "Switches and checkboxes on settings screens.",
        examples: &["'Disable notifications' translated as 'Benachrichtigungen aktivieren'"],
        language: None,
    },
    Skill {
        name: "Option description length",
        principle: "Secondary descriptions under options may wrap but must not be cut off.",
        when_to_apply: "Settings rows with a title and a description.",
        examples: &[],
        language: None,
    },
];

const ERROR_PAGE_SKILLS: &[Skill] = &[
    Skill {
        name: "Error tone",
        principle: "Error copy stays calm and actionable in the target language.",
        when_to_apply: "404/500 pages and failure banners.",
        examples: &[],
        language: None,
    },
    Skill {
        name: "Recovery action",
        principle: "The recovery button or link is translated and its meaning preserved.",
        when_to_apply: "'Try again', 'Go home', and similar links.",
        examples: &[],
        language: None,
    },
];

fn scene_skills(scene: SceneType) -> &'static [Skill] {
    match scene {
        SceneType::Navigation => NAVIGATION_SKILLS,
        SceneType::Form => FORM_SKILLS,
        SceneType::Dashboard => DASHBOARD_SKILLS,
        SceneType::Modal => MODAL_SKILLS,
        SceneType::Table => TABLE_SKILLS,
        SceneType::Settings => SETTINGS_SKILLS,
        SceneType::ErrorPage => ERROR_PAGE_SKILLS,
        SceneType::Generic => &[],
    }
}

/// Skills selected for one analysis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedSkillSet {
    pub general_skills: Vec<&'static Skill>,
    pub scene_skills: Vec<&'static Skill>,
    pub scene_type: SceneType,
}

/// Select the skills for a scene hint and target language.
pub fn retrieve(scene_hint: &str, target_language: &str) -> RetrievedSkillSet {
    let scene_type = classify(scene_hint);
    RetrievedSkillSet {
        general_skills: GENERAL_SKILLS
            .iter()
            .filter(|s| s.applies_to(target_language))
            .collect(),
        scene_skills: scene_skills(scene_type).iter().collect(),
        scene_type,
    }
}

/// Render the skill set as a compact prompt block.
pub fn format(set: &RetrievedSkillSet, max_scene_skills: usize) -> String {
    let mut out = String::from("## Localization heuristics\n\n### General\n");
    for skill in &set.general_skills {
        push_skill(&mut out, skill, MAX_EXAMPLES_PER_SKILL);
    }

    let scene: Vec<_> = set.scene_skills.iter().take(max_scene_skills).collect();
    if !scene.is_empty() {
        let _ = write!(out, "\n### Scene: {}\n", set.scene_type);
        for skill in scene {
            push_skill(&mut out, skill, MAX_EXAMPLES_PER_SKILL);
        }
    }

    out
}

fn push_skill(out: &mut String, skill: &Skill, max_examples: usize) {
    let _ = writeln!(
        out,
        "- **{}**: {} (apply when: {})",
        skill.name, skill.principle, skill.when_to_apply
    );
    let examples: Vec<&str> = skill.examples.iter().take(max_examples).copied().collect();
    if !examples.is_empty() {
        let _ = writeln!(out, "  e.g. {}", examples.join("; "));
    }
}
