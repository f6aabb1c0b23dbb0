//! Prompt construction and provider response parsing.
//!
//! All providers share one prompt contract: the system prompt fixes the
//! output schema, the user prompt carries the job text, and the response is
//! parsed leniently (code fences stripped, unknown fields ignored, missing
//! groups treated as absent).

use scholarsync_core::{EnrichedData, JobText, Result};

/// System prompt fixing the JSON output schema for every provider.
pub const SYSTEM_PROMPT: &str = "\
You are an expert at analyzing academic job postings. Extract structured \
information from the posting and respond with a single JSON object. Use \
exactly these top-level keys, omitting any group you cannot extract:

\"keywords\": {\"keywords\": [string], \"confidence\": float}
\"attributes\": {\"category\": string, \"work_modality\": \"on_site\"|\"hybrid\"|\"remote\", \
\"contract_type\": \"permanent\"|\"fixed_term\"|\"temporary\", \
\"employment_type\": \"full_time\"|\"part_time\", \"confidence\": float}
\"details\": {\"summary\": string, \"department\": string, \"duration\": string, \"confidence\": float}
\"application\": {\"deadline\": \"YYYY-MM-DD\", \"url\": string, \"instructions\": string, \"confidence\": float}
\"languages\": {\"languages\": [{\"language\": string, \"level\": string}], \"confidence\": float}
\"background\": {\"education_level\": string, \"field_of_study\": string, \
\"experience_years\": integer, \"confidence\": float}
\"geolocation\": {\"city\": string, \"region\": string, \"country\": string, \
\"latitude\": float, \"longitude\": float, \"confidence\": float}
\"contact\": {\"name\": string, \"email\": string, \"phone\": string, \"confidence\": float}
\"research_areas\": {\"research_areas\": [string], \"confidence\": float}

Every group carries its own \"confidence\" between 0.0 and 1.0 reflecting how \
certain you are of that group's values. Omit fields you cannot determine \
rather than guessing. Respond with JSON only, no prose.";

/// Render the user prompt for one job's text bundle.
pub fn build_user_prompt(job: &JobText) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str("Job title: ");
    prompt.push_str(&job.title);
    prompt.push_str("\n\nDescription:\n");
    prompt.push_str(&job.description);
    if let Some(qualifications) = &job.qualifications {
        prompt.push_str("\n\nQualifications:\n");
        prompt.push_str(qualifications);
    }
    if let Some(salary) = &job.salary {
        prompt.push_str("\n\nSalary: ");
        prompt.push_str(salary);
    }
    if let Some(instructions) = &job.instructions {
        prompt.push_str("\n\nHow to apply:\n");
        prompt.push_str(instructions);
    }
    prompt
}

/// Parse raw provider output into [`EnrichedData`].
///
/// Tolerates markdown code fences around the JSON body. Confidence values
/// are clamped into [0, 1] after parsing. Schema violations surface as
/// [`scholarsync_core::Error::Validation`].
pub fn parse_provider_response(raw: &str) -> Result<EnrichedData> {
    let body = strip_code_fences(raw);
    let mut data: EnrichedData = serde_json::from_str(body)?;
    clamp_confidences(&mut data);
    Ok(data)
}

/// Strip a surrounding markdown code fence, with or without a language tag.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line (```json), then the closing fence.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn clamp_confidences(data: &mut EnrichedData) {
    if let Some(g) = data.keywords.as_mut() {
        g.confidence = g.confidence.clamp(0.0, 1.0);
    }
    if let Some(g) = data.attributes.as_mut() {
        g.confidence = g.confidence.clamp(0.0, 1.0);
    }
    if let Some(g) = data.details.as_mut() {
        g.confidence = g.confidence.clamp(0.0, 1.0);
    }
    if let Some(g) = data.application.as_mut() {
        g.confidence = g.confidence.clamp(0.0, 1.0);
    }
    if let Some(g) = data.languages.as_mut() {
        g.confidence = g.confidence.clamp(0.0, 1.0);
    }
    if let Some(g) = data.background.as_mut() {
        g.confidence = g.confidence.clamp(0.0, 1.0);
    }
    if let Some(g) = data.geolocation.as_mut() {
        g.confidence = g.confidence.clamp(0.0, 1.0);
    }
    if let Some(g) = data.contact.as_mut() {
        g.confidence = g.confidence.clamp(0.0, 1.0);
    }
    if let Some(g) = data.research_areas.as_mut() {
        g.confidence = g.confidence.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholarsync_core::{Error, WorkModality};

    fn job_text() -> JobText {
        JobText {
            title: "Lecturer in Statistics".to_string(),
            description: "Teach undergraduate statistics.".to_string(),
            qualifications: Some("PhD in Statistics".to_string()),
            salary: Some("£45,000".to_string()),
            instructions: Some("Apply online.".to_string()),
        }
    }

    #[test]
    fn user_prompt_includes_all_sections() {
        let prompt = build_user_prompt(&job_text());
        assert!(prompt.contains("Lecturer in Statistics"));
        assert!(prompt.contains("Teach undergraduate statistics."));
        assert!(prompt.contains("PhD in Statistics"));
        assert!(prompt.contains("£45,000"));
        assert!(prompt.contains("Apply online."));
    }

    #[test]
    fn user_prompt_omits_missing_sections() {
        let job = JobText {
            title: "Postdoc".to_string(),
            description: "Research role.".to_string(),
            qualifications: None,
            salary: None,
            instructions: None,
        };
        let prompt = build_user_prompt(&job);
        assert!(!prompt.contains("Qualifications"));
        assert!(!prompt.contains("Salary"));
        assert!(!prompt.contains("How to apply"));
    }

    #[test]
    fn parses_plain_json() {
        let raw = r#"{"keywords": {"keywords": ["statistics"], "confidence": 0.9}}"#;
        let data = parse_provider_response(raw).unwrap();
        let keywords = data.keywords.unwrap();
        assert_eq!(keywords.keywords, vec!["statistics"]);
        assert!((keywords.confidence - 0.9).abs() < f32::EPSILON);
        assert!(data.attributes.is_none());
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"attributes\": {\"category\": \"lecturer\", \
                   \"work_modality\": \"on_site\", \"confidence\": 0.8}}\n```";
        let data = parse_provider_response(raw).unwrap();
        let attrs = data.attributes.unwrap();
        assert_eq!(attrs.category.as_deref(), Some("lecturer"));
        assert_eq!(attrs.work_modality, Some(WorkModality::OnSite));
    }

    #[test]
    fn parses_fence_without_language_tag() {
        let raw = "```\n{\"research_areas\": {\"research_areas\": [\"bayesian inference\"], \"confidence\": 0.4}}\n```";
        let data = parse_provider_response(raw).unwrap();
        assert_eq!(
            data.research_areas.unwrap().research_areas,
            vec!["bayesian inference"]
        );
    }

    #[test]
    fn empty_object_is_valid_and_empty() {
        let data = parse_provider_response("{}").unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw = r#"{"keywords": {"keywords": ["x"], "confidence": 0.7}, "reasoning": "because"}"#;
        let data = parse_provider_response(raw).unwrap();
        assert!(data.keywords.is_some());
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let result = parse_provider_response("here are the keywords: statistics");
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let raw = r#"{
            "keywords": {"keywords": ["a"], "confidence": 1.7},
            "contact": {"email": "x@example.edu", "confidence": -0.2}
        }"#;
        let data = parse_provider_response(raw).unwrap();
        assert!((data.keywords.unwrap().confidence - 1.0).abs() < f32::EPSILON);
        assert_eq!(data.contact.unwrap().confidence, 0.0);
    }

    #[test]
    fn invalid_deadline_fails_validation() {
        let raw = r#"{"application": {"deadline": "soon", "confidence": 0.5}}"#;
        assert!(parse_provider_response(raw).is_err());
    }
}
