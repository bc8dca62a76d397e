//! Deterministic grading rules
//!
//! Scores may only move down when the issue list contradicts them, and the
//! quality level is always a pure function of issue counts.

use crate::report::{Issue, IssueCategory, QualityLevel, Scores, Severity};

/// Ceiling for a dimension that has a Critical issue
pub const CRITICAL_SCORE_CAP: f64 = 2.0;
/// Ceiling for a dimension that has a Major issue
pub const MAJOR_SCORE_CAP: f64 = 3.5;

fn dimension_mut(scores: &mut Scores, category: IssueCategory) -> Option<&mut f64> {
    match category {
        IssueCategory::Mistranslation => Some(&mut scores.accuracy),
        IssueCategory::Terminology => Some(&mut scores.terminology),
        IssueCategory::Layout => Some(&mut scores.layout),
        IssueCategory::Grammar => Some(&mut scores.grammar),
        IssueCategory::Formatting => Some(&mut scores.formatting),
        IssueCategory::Style => Some(&mut scores.tone),
        IssueCategory::Other => None,
    }
}

/// Cap each dimension by the worst issue filed against it.
pub fn enforce_scores(issues: &[Issue], scores: Scores) -> Scores {
    let mut out = scores;
    for issue in issues {
        let cap = match issue.severity {
            Severity::Critical => CRITICAL_SCORE_CAP,
            Severity::Major => MAJOR_SCORE_CAP,
            Severity::Minor => continue,
        };
        if let Some(score) = dimension_mut(&mut out, issue.category) {
            if *score > cap {
                *score = cap;
            }
        }
    }
    out
}

/// Grade a screenshot from its final issue list.
pub fn derive_quality_level(issues: &[Issue]) -> QualityLevel {
    let count = |sev: Severity| issues.iter().filter(|i| i.severity == sev).count();
    let critical = count(Severity::Critical);
    let major = count(Severity::Major);
    let minor = count(Severity::Minor);

    if critical >= 2 {
        QualityLevel::Critical
    } else if critical == 1 || major >= 3 {
        QualityLevel::Poor
    } else if major >= 1 || minor >= 5 {
        QualityLevel::Fair
    } else if minor >= 1 {
        QualityLevel::Good
    } else {
        QualityLevel::Excellent
    }
}
