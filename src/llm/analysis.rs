use super::client::{GenerationBackend, GenerationRequest};
use super::images::InlineImage;
use super::models::ModelChain;
use super::parse::parse_structured_content;
use super::prompts::Prompts;
use super::retry::run_chain;
use crate::error::LqaResult;
use crate::report::{IssueCategory, QualityLevel, Report, Severity};
use tracing::info;

pub const REPORT_SCHEMA_NAME: &str = "lqa_report";

fn enum_values<T>(values: &[T], name: fn(&T) -> &'static str) -> Vec<&'static str> {
    values.iter().map(name).collect()
}

/// JSON Schema for the report - used for structured output
pub fn report_schema() -> serde_json::Value {
    let score = serde_json::json!({"type": "number", "minimum": 0, "maximum": 5});
    serde_json::json!({
        "type": "object",
        "properties": {
            "screenshotId": {"type": "string"},
            "overall": {
                "type": "object",
                "properties": {
                    "qualityLevel": {
                        "type": "string",
                        "enum": enum_values(&QualityLevel::ALL, QualityLevel::as_str)
                    },
                    "scores": {
                        "type": "object",
                        "properties": {
                            "accuracy": score,
                            "terminology": score,
                            "layout": score,
                            "grammar": score,
                            "formatting": score,
                            "tone": score
                        },
                        "required": ["accuracy", "terminology", "layout", "grammar", "formatting", "tone"],
                        "additionalProperties": false
                    },
                    "sceneDescription": {"type": "string"},
                    "mainProblemsSummary": {"type": "string"}
                },
                "required": ["qualityLevel", "scores", "sceneDescription", "mainProblemsSummary"],
                "additionalProperties": false
            },
            "issues": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "location": {"type": "string"},
                        "issueCategory": {
                            "type": "string",
                            "enum": enum_values(&IssueCategory::ALL, IssueCategory::as_str)
                        },
                        "severity": {
                            "type": "string",
                            "enum": enum_values(&Severity::ALL, Severity::as_str)
                        },
                        "sourceText": {"type": "string"},
                        "targetText": {"type": "string"},
                        "description": {"type": "string"},
                        "suggestionRationale": {"type": "string"},
                        "suggestionsTarget": {
                            "type": "array",
                            "items": {"type": "string"},
                            "minItems": 1
                        },
                        "glossarySource": {"type": "string"},
                        "glossaryTermId": {"type": "string"}
                    },
                    "required": [
                        "id", "location", "issueCategory", "severity",
                        "description", "suggestionRationale", "suggestionsTarget"
                    ],
                    "additionalProperties": false
                }
            },
            "summary": {
                "type": "object",
                "properties": {
                    "severeCount": {"type": "integer"},
                    "majorCount": {"type": "integer"},
                    "minorCount": {"type": "integer"},
                    "optimizationAdvice": {"type": "string"},
                    "termAdvice": {"type": "string"}
                },
                "required": ["severeCount", "majorCount", "minorCount", "optimizationAdvice"],
                "additionalProperties": false
            }
        },
        "required": ["screenshotId", "overall", "issues", "summary"],
        "additionalProperties": false
    })
}

/// Generation settings for the analysis call
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub chain: ModelChain,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Parse and validate one analysis response.
pub(crate) fn parse_report(content: &str, request_id: &str) -> LqaResult<Report> {
    let mut report: Report = parse_structured_content(content)?;
    report.validate()?;
    report.request_id = request_id.to_string();
    report.overall.scores = report.overall.scores.clamped();
    for issue in &mut report.issues {
        issue.suggestions.retain(|s| !s.trim().is_empty());
    }
    Ok(report)
}

/// Draft report from the analysis call, with retry and model fallback.
pub async fn analyze<B: GenerationBackend + ?Sized>(
    backend: &B,
    settings: &AnalysisSettings,
    request_id: &str,
    prompts: &Prompts,
    images: &[InlineImage],
) -> LqaResult<Report> {
    let schema = report_schema();
    let system = prompts.system.as_str();
    let user = prompts.user.as_str();
    let schema = &schema;

    let output = run_chain(&settings.chain, |model| async move {
        let request = GenerationRequest {
            model: &model,
            system,
            user,
            images,
            schema_name: REPORT_SCHEMA_NAME,
            schema,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };
        let content = backend.generate(&request).await?;
        parse_report(&content, request_id)
    })
    .await?;

    info!(
        model = %output.model,
        issues = output.value.issues.len(),
        "analysis complete"
    );
    Ok(output.value)
}
