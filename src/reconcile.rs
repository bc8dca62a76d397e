//! Final, deterministic pass over a verified report
//!
//! 1. Hallucination guard: Terminology issues citing a term id that is not in
//!    the glossary are downgraded to Minor Style findings.
//! 2. Score caps from the surviving issues.
//! 3. Quality level and summary counts recomputed from the issue list.

use crate::glossary::{normalize_term_id, term_ids};
use crate::quality::{derive_quality_level, enforce_scores};
use crate::report::{IssueCategory, Report, Severity, MAX_SCORE};
use tracing::{debug, warn};

/// Prefix added to terminology claims that could not be grounded
pub const UNGROUNDED_MARKER: &str = "[Auto-downgraded: term not in glossary]";

/// `glossarySource` value for findings based on the model's own knowledge
pub const UNGROUNDED_SOURCE: &str = "model_knowledge";

/// Downgrade Terminology issues whose term id is absent from the glossary.
///
/// Idempotent. Returns the number of issues downgraded.
pub fn sanitize(report: &mut Report, glossary_text: &str) -> usize {
    let known = term_ids(glossary_text);
    let mut downgraded = 0;

    for issue in report
        .issues
        .iter_mut()
        .filter(|i| i.category == IssueCategory::Terminology)
    {
        let grounded = issue
            .glossary_term_id
            .as_deref()
            .map(normalize_term_id)
            .is_some_and(|id| known.contains(&id));
        if grounded {
            continue;
        }

        warn!(
            issue_id = %issue.id,
            term_id = issue.glossary_term_id.as_deref().unwrap_or("<none>"),
            "terminology claim not grounded in glossary, downgrading"
        );
        issue.category = IssueCategory::Style;
        issue.severity = Severity::Minor;
        issue.mark(UNGROUNDED_MARKER);
        issue.glossary_term_id = None;
        issue.glossary_source = Some(UNGROUNDED_SOURCE.to_string());
        downgraded += 1;
    }

    if !report.has_category(IssueCategory::Terminology) {
        report.overall.scores.terminology = MAX_SCORE;
    }

    downgraded
}

/// Run all reconciliation steps in order.
pub fn reconcile(mut report: Report, glossary_text: &str) -> Report {
    let downgraded = sanitize(&mut report, glossary_text);

    report.overall.scores = enforce_scores(&report.issues, report.overall.scores);

    let level = derive_quality_level(&report.issues);
    if level != report.overall.quality_level {
        debug!(
            model_level = report.overall.quality_level.as_str(),
            derived_level = level.as_str(),
            "overriding model quality level"
        );
    }
    report.overall.quality_level = level;

    report.summary.severe_count = report.count(Severity::Critical);
    report.summary.major_count = report.count(Severity::Major);
    report.summary.minor_count = report.count(Severity::Minor);

    debug!(downgraded, issues = report.issues.len(), "report reconciled");
    report
}
