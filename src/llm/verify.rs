//! Second-opinion pass over the draft report
//!
//! A skeptical reviewer re-adjudicates every issue against the same evidence.
//! Verification can only make a report more trustworthy: if the verifier is
//! unreachable or answers garbage, the draft goes through untouched.

use super::client::{GenerationBackend, GenerationRequest};
use super::images::InlineImage;
use super::models::ModelChain;
use super::parse::parse_structured_content;
use super::prompts::Prompts;
use super::retry::run_chain;
use crate::report::{IssueCategory, Report, Severity, VerificationVerdict};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub const VERIFY_SCHEMA_NAME: &str = "lqa_verification";

/// Prefix added to rejected-but-rescued Style/Formatting issues
pub const REVIEW_MARKER: &str = "[Needs review]";

/// Verdict reasons containing any of these mean the issue was made up
const HALLUCINATION_PHRASES: &[&str] = &["hallucination", "not visible", "does not exist"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerificationResponse {
    verified_issues: Vec<VerificationVerdict>,
}

/// JSON Schema for the verifier response
pub fn verification_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "verifiedIssues": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "isValid": {"type": "boolean"},
                        "reason": {"type": "string"},
                        "refinedSeverity": {
                            "type": "string",
                            "enum": ["Critical", "Major", "Minor"]
                        },
                        "refinedRationale": {"type": "string"}
                    },
                    "required": ["id", "isValid", "reason"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["verifiedIssues"],
        "additionalProperties": false
    })
}

fn mentions_hallucination(reason: &str) -> bool {
    let lower = reason.to_lowercase();
    HALLUCINATION_PHRASES.iter().any(|p| lower.contains(p))
}

/// Apply verifier verdicts to the report's issues.
///
/// - no verdict: kept as is
/// - valid: kept, with refined severity/rationale applied
/// - invalid: dropped, unless it is a Style/Formatting issue whose rejection
///   doesn't claim hallucination, in which case it is kept as Minor and marked
pub fn merge_verdicts(mut report: Report, verdicts: Vec<VerificationVerdict>) -> Report {
    let mut by_id: HashMap<String, VerificationVerdict> = HashMap::new();
    for verdict in verdicts {
        by_id.entry(verdict.issue_id.clone()).or_insert(verdict);
    }

    let before = report.issues.len();
    let mut rescued = 0usize;
    report.issues = report
        .issues
        .into_iter()
        .filter_map(|mut issue| {
            let Some(verdict) = by_id.get(&issue.id) else {
                return Some(issue);
            };

            if verdict.is_valid {
                if let Some(severity) = verdict.refined_severity {
                    issue.severity = severity;
                }
                if let Some(rationale) = verdict
                    .refined_rationale
                    .as_deref()
                    .filter(|r| !r.trim().is_empty())
                {
                    issue.rationale = rationale.to_string();
                }
                return Some(issue);
            }

            let low_stakes = matches!(
                issue.category,
                IssueCategory::Style | IssueCategory::Formatting
            );
            if low_stakes && !mentions_hallucination(&verdict.reason) {
                issue.severity = Severity::Minor;
                issue.mark(REVIEW_MARKER);
                rescued += 1;
                return Some(issue);
            }

            debug!(issue_id = %issue.id, reason = %verdict.reason, "verifier rejected issue");
            None
        })
        .collect();

    info!(
        before,
        after = report.issues.len(),
        rescued,
        "verification merged"
    );
    report
}

/// Run the verifier and merge its verdicts. Never fails: any error returns
/// the input report unchanged.
pub async fn verify<B: GenerationBackend + ?Sized>(
    backend: &B,
    chain: &ModelChain,
    temperature: f32,
    max_tokens: u32,
    report: Report,
    prompts: &Prompts,
    images: &[InlineImage],
) -> Report {
    if report.issues.is_empty() {
        return report;
    }

    let schema = verification_schema();
    let schema = &schema;
    let system = prompts.system.as_str();
    let user = prompts.user.as_str();

    let result = run_chain(chain, |model| async move {
        let request = GenerationRequest {
            model: &model,
            system,
            user,
            images,
            schema_name: VERIFY_SCHEMA_NAME,
            schema,
            temperature,
            max_tokens,
        };
        let content = backend.generate(&request).await?;
        parse_structured_content::<VerificationResponse>(&content)
    })
    .await;

    match result {
        Ok(output) => {
            debug!(model = %output.model, verdicts = output.value.verified_issues.len(), "verifier answered");
            merge_verdicts(report, output.value.verified_issues)
        }
        Err(err) => {
            warn!(error = %err, "verification unavailable, keeping draft report");
            report
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::{issue, report};

    fn verdict(id: &str, is_valid: bool, reason: &str) -> VerificationVerdict {
        VerificationVerdict {
            issue_id: id.to_string(),
            is_valid,
            reason: reason.to_string(),
            refined_severity: None,
            refined_rationale: None,
        }
    }

    #[test]
    fn test_no_verdict_keeps_issue() {
        let r = report(vec![issue("a", IssueCategory::Layout, Severity::Major)]);
        let merged = merge_verdicts(r.clone(), vec![verdict("other", false, "nope")]);
        assert_eq!(merged.issues, r.issues);
    }

    #[test]
    fn test_valid_verdict_applies_refinements() {
        let r = report(vec![issue("a", IssueCategory::Layout, Severity::Major)]);
        let mut v = verdict("a", true, "confirmed");
        v.refined_severity = Some(Severity::Critical);
        v.refined_rationale = Some("Button text is unreadable".to_string());
        let merged = merge_verdicts(r, vec![v]);
        assert_eq!(merged.issues[0].severity, Severity::Critical);
        assert_eq!(merged.issues[0].rationale, "Button text is unreadable");
    }

    #[test]
    fn test_invalid_high_stakes_issue_is_dropped() {
        for category in [
            IssueCategory::Layout,
            IssueCategory::Terminology,
            IssueCategory::Mistranslation,
            IssueCategory::Other,
            IssueCategory::Grammar,
        ] {
            let r = report(vec![issue("a", category, Severity::Major)]);
            let merged = merge_verdicts(r, vec![verdict("a", false, "acceptable wording")]);
            assert!(merged.issues.is_empty(), "category {:?}", category);
        }
    }

    #[test]
    fn test_invalid_style_issue_is_rescued_as_minor() {
        for category in [IssueCategory::Style, IssueCategory::Formatting] {
            let r = report(vec![issue("a", category, Severity::Major)]);
            let merged = merge_verdicts(r, vec![verdict("a", false, "matter of taste")]);
            assert_eq!(merged.issues.len(), 1);
            assert_eq!(merged.issues[0].severity, Severity::Minor);
            assert!(merged.issues[0].description.starts_with(REVIEW_MARKER));
        }
    }

    #[test]
    fn test_hallucinated_style_issue_is_dropped() {
        for reason in [
            "Hallucination: there is no such label",
            "The text is NOT VISIBLE in the target",
            "This button does not exist",
        ] {
            let r = report(vec![issue("a", IssueCategory::Style, Severity::Minor)]);
            let merged = merge_verdicts(r, vec![verdict("a", false, reason)]);
            assert!(merged.issues.is_empty(), "reason {:?}", reason);
        }
    }

    #[test]
    fn test_first_verdict_wins_for_duplicate_ids() {
        let r = report(vec![issue("a", IssueCategory::Layout, Severity::Major)]);
        let merged = merge_verdicts(
            r,
            vec![verdict("a", true, "ok"), verdict("a", false, "not visible")],
        );
        assert_eq!(merged.issues.len(), 1);
    }

    #[test]
    fn test_verdict_parses_backend_shape() {
        let body = r#"{"verifiedIssues": [
            {"id": "1", "isValid": false, "reason": "not visible"},
            {"id": "2", "isValid": true, "reason": "ok", "refinedSeverity": "Minor"}
        ]}"#;
        let parsed: VerificationResponse = parse_structured_content(body).unwrap();
        assert_eq!(parsed.verified_issues.len(), 2);
        assert_eq!(parsed.verified_issues[1].refined_severity, Some(Severity::Minor));
    }

    #[test]
    fn test_verdict_missing_required_field_fails() {
        let body = r#"{"verifiedIssues": [{"id": "1", "reason": "no isValid"}]}"#;
        assert!(parse_structured_content::<VerificationResponse>(body).is_err());
    }
}
