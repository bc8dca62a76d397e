//! Report data model
//!
//! The same types serve as the wire format of the generation backend and as
//! the final outbound report, so field names follow the backend schema.

use crate::error::{LqaError, LqaResult};
use serde::{Deserialize, Deserializer, Serialize};

/// Upper bound of every score dimension
pub const MAX_SCORE: f64 = 5.0;

/// Kind of localization defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCategory {
    Layout,
    Mistranslation,
    Terminology,
    Formatting,
    Grammar,
    Style,
    Other,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 7] = [
        IssueCategory::Layout,
        IssueCategory::Mistranslation,
        IssueCategory::Terminology,
        IssueCategory::Formatting,
        IssueCategory::Grammar,
        IssueCategory::Style,
        IssueCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Layout => "Layout",
            IssueCategory::Mistranslation => "Mistranslation",
            IssueCategory::Terminology => "Terminology",
            IssueCategory::Formatting => "Formatting",
            IssueCategory::Grammar => "Grammar",
            IssueCategory::Style => "Style",
            IssueCategory::Other => "Other",
        }
    }
}

/// Severity level, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Critical, Severity::Major, Severity::Minor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Major => "Major",
            Severity::Minor => "Minor",
        }
    }
}

/// Overall grade, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl QualityLevel {
    pub const ALL: [QualityLevel; 5] = [
        QualityLevel::Excellent,
        QualityLevel::Good,
        QualityLevel::Fair,
        QualityLevel::Poor,
        QualityLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::Excellent => "Excellent",
            QualityLevel::Good => "Good",
            QualityLevel::Fair => "Fair",
            QualityLevel::Poor => "Poor",
            QualityLevel::Critical => "Critical",
        }
    }
}

/// The six scored dimensions, each on 0..=5
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub accuracy: f64,
    pub terminology: f64,
    pub layout: f64,
    pub grammar: f64,
    pub formatting: f64,
    pub tone: f64,
}

impl Default for Scores {
    fn default() -> Self {
        Self {
            accuracy: MAX_SCORE,
            terminology: MAX_SCORE,
            layout: MAX_SCORE,
            grammar: MAX_SCORE,
            formatting: MAX_SCORE,
            tone: MAX_SCORE,
        }
    }
}

impl Scores {
    /// Clamp every dimension into the scale. Non-finite values become 0.
    pub fn clamped(self) -> Self {
        fn clamp(v: f64) -> f64 {
            if v.is_finite() {
                v.clamp(0.0, MAX_SCORE)
            } else {
                0.0
            }
        }
        Self {
            accuracy: clamp(self.accuracy),
            terminology: clamp(self.terminology),
            layout: clamp(self.layout),
            grammar: clamp(self.grammar),
            formatting: clamp(self.formatting),
            tone: clamp(self.tone),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub location: String,
    #[serde(rename = "issueCategory")]
    pub category: IssueCategory,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_text: Option<String>,
    pub description: String,
    #[serde(rename = "suggestionRationale")]
    pub rationale: String,
    #[serde(rename = "suggestionsTarget")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossary_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossary_term_id: Option<String>,
}

impl Issue {
    /// Prefix the description with a marker unless it already carries it.
    pub(crate) fn mark(&mut self, marker: &str) {
        if !self.description.starts_with(marker) {
            self.description = format!("{} {}", marker, self.description);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overall {
    pub quality_level: QualityLevel,
    pub scores: Scores,
    pub scene_description: String,
    #[serde(rename = "mainProblemsSummary")]
    pub problems_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub severe_count: u32,
    pub major_count: u32,
    pub minor_count: u32,
    #[serde(rename = "optimizationAdvice")]
    pub advice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_advice: Option<String>,
}

/// Explicit `null` reads as the type's default, same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A screenshot-pair quality report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "screenshotId", default, deserialize_with = "null_as_default")]
    pub request_id: String,
    pub overall: Overall,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issues: Vec<Issue>,
    pub summary: Summary,
}

impl Report {
    /// Check constraints serde can't express. A violation fails the attempt.
    pub fn validate(&self) -> LqaResult<()> {
        for issue in &self.issues {
            if issue.id.trim().is_empty() {
                return Err(LqaError::protocol("issue with empty id"));
            }
            if !issue.suggestions.iter().any(|s| !s.trim().is_empty()) {
                return Err(LqaError::protocol(format!(
                    "issue '{}' has no suggestions",
                    issue.id
                )));
            }
        }
        Ok(())
    }

    pub fn count(&self, severity: Severity) -> u32 {
        self.issues.iter().filter(|i| i.severity == severity).count() as u32
    }

    pub fn has_category(&self, category: IssueCategory) -> bool {
        self.issues.iter().any(|i| i.category == category)
    }
}

/// Per-issue ruling from the verifier pass
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationVerdict {
    #[serde(rename = "id")]
    pub issue_id: String,
    pub is_valid: bool,
    pub reason: String,
    #[serde(default)]
    pub refined_severity: Option<Severity>,
    #[serde(default)]
    pub refined_rationale: Option<String>,
}

/// One screenshot pair to analyze
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub source_image: String,
    pub target_image: String,
    pub target_language: String,
    #[serde(default = "default_report_language")]
    pub report_language: String,
    #[serde(default)]
    pub glossary_text: Option<String>,
    #[serde(default)]
    pub scene_hint: String,
    #[serde(default = "new_request_id")]
    pub request_id: String,
}

fn default_report_language() -> String {
    "en".to_string()
}

pub fn new_request_id() -> String {
    format!("shot_{}", uuid::Uuid::new_v4().simple())
}

impl AnalysisRequest {
    pub fn new(
        source_image: impl Into<String>,
        target_image: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            source_image: source_image.into(),
            target_image: target_image.into(),
            target_language: target_language.into(),
            report_language: default_report_language(),
            glossary_text: None,
            scene_hint: String::new(),
            request_id: new_request_id(),
        }
    }

    pub fn with_report_language(mut self, lang: impl Into<String>) -> Self {
        self.report_language = lang.into();
        self
    }

    pub fn with_glossary(mut self, text: impl Into<String>) -> Self {
        self.glossary_text = Some(text.into());
        self
    }

    pub fn with_scene_hint(mut self, hint: impl Into<String>) -> Self {
        self.scene_hint = hint.into();
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    pub fn glossary(&self) -> &str {
        self.glossary_text.as_deref().unwrap_or("")
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_issue_uses_backend_field_names() {
        let value = serde_json::to_value(issue("1", IssueCategory::Layout, Severity::Major)).unwrap();
        assert_eq!(value["issueCategory"], "Layout");
        assert_eq!(value["suggestionRationale"], "The button is too narrow");
        assert_eq!(value["suggestionsTarget"][0], "Sichern");
        assert!(value.get("glossaryTermId").is_none());
    }

    #[test]
    fn test_report_missing_issues_defaults_to_empty() {
        let json = r#"{
            "screenshotId": "x",
            "overall": {
                "qualityLevel": "Good",
                "scores": {"accuracy": 5, "terminology": 5, "layout": 4, "grammar": 5, "formatting": 5, "tone": 5},
                "sceneDescription": "Login form",
                "mainProblemsSummary": "None"
            },
            "summary": {"severeCount": 0, "majorCount": 0, "minorCount": 0, "optimizationAdvice": "Ship it"}
        }"#;
        let report: Report = serde_json::from_str(json).unwrap();
        assert!(report.issues.is_empty());
        assert_eq!(report.overall.scores.layout, 4.0);
    }

    #[test]
    fn test_issue_missing_required_field_is_rejected() {
        let json = r#"{"id": "1", "location": "x", "issueCategory": "Layout", "severity": "Minor",
            "description": "d", "suggestionsTarget": ["s"]}"#;
        assert!(serde_json::from_str::<Issue>(json).is_err());
    }

    #[test]
    fn test_validate_rejects_blank_suggestions() {
        let mut bad = issue("1", IssueCategory::Grammar, Severity::Minor);
        bad.suggestions = vec!["  ".to_string()];
        assert!(matches!(
            report(vec![bad]).validate(),
            Err(LqaError::Protocol(_))
        ));
        assert!(report(vec![issue("2", IssueCategory::Grammar, Severity::Minor)])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_scores_clamped() {
        let scores = Scores {
            accuracy: 7.0,
            terminology: -1.0,
            layout: f64::NAN,
            grammar: 3.5,
            formatting: 5.0,
            tone: 0.0,
        }
        .clamped();
        assert_eq!(scores.accuracy, 5.0);
        assert_eq!(scores.terminology, 0.0);
        assert_eq!(scores.layout, 0.0);
        assert_eq!(scores.grammar, 3.5);
    }

    #[test]
    fn test_mark_is_not_repeated() {
        let mut i = issue("1", IssueCategory::Style, Severity::Minor);
        i.mark("[Needs review]");
        i.mark("[Needs review]");
        assert_eq!(i.description, "[Needs review] Label is clipped");
    }

    #[test]
    fn test_request_defaults_from_manifest_json() {
        let json = r#"{"sourceImage": "a.png", "targetImage": "b.png", "targetLanguage": "de"}"#;
        let req: AnalysisRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.report_language, "en");
        assert!(req.request_id.starts_with("shot_"));
        assert_eq!(req.glossary(), "");
    }
}
