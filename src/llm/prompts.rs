//! Prompt assembly
//!
//! Pure functions of their inputs. Any drift between two runs on the same
//! screenshots comes from the model, never from here.

use crate::report::Issue;
use crate::skills::primary_subtag;

/// Inputs shared by the analysis and verification prompts
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub target_language: &'a str,
    pub report_language: &'a str,
    pub skill_block: &'a str,
    pub glossary_text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub system: String,
    pub user: String,
}

/// English display name for a language tag. Unknown tags are echoed back.
pub fn language_name(tag: &str) -> String {
    let name = match primary_subtag(tag).as_str() {
        "en" => "English",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "pl" => "Polish",
        "ru" => "Russian",
        "tr" => "Turkish",
        "ar" => "Arabic",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "th" => "Thai",
        "vi" => "Vietnamese",
        "id" => "Indonesian",
        _ => return tag.trim().to_string(),
    };
    name.to_string()
}

const ANALYSIS_RULES: &str = r#"RULES:
- Compare the SOURCE screenshot (first image) with the TARGET screenshot (second image).
- Report only defects visible in the TARGET screenshot. Never guess at hidden screens or states.
- Categories: Layout, Mistranslation, Terminology, Formatting, Grammar, Style, Other.
- Severity: Critical (blocks understanding or use), Major (clearly wrong, user notices), Minor (polish).
- Use Terminology ONLY when the glossary below contains the term. Set glossaryTermId to the exact
  id from its [ID:...] tag and glossarySource to the glossary entry. Without a matching tag,
  use a different category.
- Every issue must have at least one concrete replacement string in suggestionsTarget.
- Scores run from 0 (unusable) to 5 (flawless) for accuracy, terminology, layout, grammar,
  formatting, and tone."#;

const VERIFY_RULES: &str = r#"RULES:
- For every issue, look at the TARGET screenshot (second image) again and decide whether the issue is real.
- isValid=false when the text or defect is not visible, the claim contradicts the screenshot, or the
  issue breaks the heuristics below. Say "not visible" or "does not exist" in the reason when the
  issue describes something that isn't on screen.
- When an issue is real but over- or under-rated, keep isValid=true and set refinedSeverity.
- Set refinedRationale only when the original rationale is wrong or unclear.
- Return one entry per issue id. Do not invent new issues."#;

/// Sentence telling the model which language to write the report in.
fn report_language_instruction(report_language: &str) -> String {
    match primary_subtag(report_language).as_str() {
        "zh" => "请使用简体中文撰写所有描述、理由和建议（suggestionsTarget 保持目标语言）。".to_string(),
        "ja" => "説明・理由・アドバイスはすべて日本語で記述してください（suggestionsTarget は対象言語のまま）。".to_string(),
        _ => format!(
            "Write every description, rationale, and piece of advice in {}. Keep suggestionsTarget in the target language.",
            language_name(report_language)
        ),
    }
}

fn glossary_section(glossary_text: &str) -> String {
    if glossary_text.trim().is_empty() {
        "GLOSSARY: (none provided - do not file Terminology issues)".to_string()
    } else {
        format!("GLOSSARY:\n{}", glossary_text.trim())
    }
}

/// System and user prompts for the analysis call.
pub fn analysis_prompts(ctx: &PromptContext<'_>, request_id: &str) -> Prompts {
    let target = language_name(ctx.target_language);
    let system = format!(
        "You are a senior localization QA reviewer for {target} user interfaces.\n\
         {language}\n\n\
         {rules}\n\n\
         {skills}",
        target = target,
        language = report_language_instruction(ctx.report_language),
        rules = ANALYSIS_RULES,
        skills = ctx.skill_block.trim_end(),
    );

    let user = format!(
        "Screenshot id: {id}\n\
         Source language UI is the first image; the {target} localization is the second image.\n\n\
         {glossary}\n\n\
         EVALUATION:\n\
         1. Describe the scene in sceneDescription.\n\
         2. List every localization defect as an issue with a unique id.\n\
         3. Score the six dimensions from 0 to 5.\n\
         4. Summarize the main problems and give optimization advice.\n\n\
         Every issue MUST include at least one entry in suggestionsTarget. Respond with JSON only.",
        id = request_id,
        target = target,
        glossary = glossary_section(ctx.glossary_text),
    );

    Prompts { system, user }
}

/// Render issues for the verifier, one JSON object per line.
fn issues_block(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| serde_json::to_string(issue).unwrap_or_else(|_| issue.id.clone()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// System and user prompts for the verification call.
pub fn verification_prompts(ctx: &PromptContext<'_>, issues: &[Issue]) -> Prompts {
    let system = format!(
        "You are a skeptical second reviewer checking another reviewer's localization findings \
         for a {target} user interface.\n\
         {language}\n\n\
         {rules}\n\n\
         The first reviewer used these heuristics:\n{skills}",
        target = language_name(ctx.target_language),
        language = report_language_instruction(ctx.report_language),
        rules = VERIFY_RULES,
        skills = ctx.skill_block.trim_end(),
    );

    let user = format!(
        "{glossary}\n\n\
         ISSUES TO VERIFY:\n{issues}\n\n\
         Respond with JSON only: {{\"verifiedIssues\": [...]}}.",
        glossary = glossary_section(ctx.glossary_text),
        issues = issues_block(issues),
    );

    Prompts { system, user }
}
