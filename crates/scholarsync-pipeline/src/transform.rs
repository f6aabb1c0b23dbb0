//! Deterministic normalization of raw feed records.
//!
//! No LLM calls here. Everything this module produces is reproducible from
//! the raw record alone: HTML stripped to text, dates parsed, and
//! work-modality / contract / hours heuristics applied from the feed's own
//! labels. Fields the heuristics cannot settle stay `None` for enrichment.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use scholarsync_core::{
    ContractType, EmploymentType, NewJobRecord, RawJobRecord, WorkModality,
};

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strip HTML down to readable plain text.
///
/// Block-level closers become newlines so paragraph structure survives;
/// entities the feed commonly emits are decoded; runs of whitespace collapse.
pub fn strip_html(html: &str) -> String {
    static BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)</(p|div|li|h[1-6]|tr|ul|ol|table)>|<br\s*/?>").unwrap()
    });

    let text = BLOCK_RE.replace_all(html, "\n");
    let text = TAG_RE.replace_all(&text, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&pound;", "£");

    let text = WHITESPACE_RE.replace_all(&text, " ");
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    BLANK_LINES_RE.replace_all(&joined, "\n\n").trim().to_string()
}

/// Parse a feed date string into a UTC timestamp at midnight.
///
/// The feed is inconsistent about formats, so several are tried in order.
/// Unparseable input yields `None` rather than an error; a missing date is
/// ordinary feed noise, not a pipeline fault.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    const FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%d %B %Y",
        "%d %b %Y",
        "%B %d, %Y",
    ];

    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date.and_time(NaiveTime::MIN).and_utc());
        }
    }

    // "22nd March 2026" style ordinals
    static ORDINAL_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(\d{1,2})(st|nd|rd|th)").unwrap());
    let plain = ORDINAL_RE.replace(trimmed, "$1");
    if plain != trimmed {
        for format in &["%d %B %Y", "%d %b %Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(&plain, format) {
                return Some(date.and_time(NaiveTime::MIN).and_utc());
            }
        }
    }

    None
}

/// Work-modality heuristic over the feed's location and description labels.
fn detect_work_modality(raw: &RawJobRecord) -> Option<WorkModality> {
    if let Some(location) = &raw.location {
        if let Some(modality) = WorkModality::from_str_loose(location) {
            return Some(modality);
        }
        let lower = location.to_lowercase();
        if lower.contains("remote") {
            return Some(WorkModality::Remote);
        }
        if lower.contains("hybrid") {
            return Some(WorkModality::Hybrid);
        }
    }
    let description = raw.description.as_deref().unwrap_or_default().to_lowercase();
    if description.contains("fully remote") || description.contains("100% remote") {
        return Some(WorkModality::Remote);
    }
    if description.contains("hybrid working") || description.contains("hybrid work") {
        return Some(WorkModality::Hybrid);
    }
    None
}

/// Contract-type heuristic over the feed's contract label.
fn detect_contract_type(raw: &RawJobRecord) -> Option<ContractType> {
    let label = raw.contract_type.as_deref()?;
    if let Some(contract) = ContractType::from_str_loose(label) {
        return Some(contract);
    }
    let lower = label.to_lowercase();
    if lower.contains("permanent") || lower.contains("open-ended") || lower.contains("open ended")
    {
        return Some(ContractType::Permanent);
    }
    if lower.contains("fixed") {
        return Some(ContractType::FixedTerm);
    }
    if lower.contains("temp") || lower.contains("casual") {
        return Some(ContractType::Temporary);
    }
    None
}

/// Hours heuristic over the feed's hours label.
fn detect_employment_type(raw: &RawJobRecord) -> Option<EmploymentType> {
    let label = raw.hours.as_deref()?;
    if let Some(employment) = EmploymentType::from_str_loose(label) {
        return Some(employment);
    }
    let lower = label.to_lowercase();
    if lower.contains("full") {
        return Some(EmploymentType::FullTime);
    }
    if lower.contains("part") {
        return Some(EmploymentType::PartTime);
    }
    None
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

/// Normalize one raw feed record into a loadable job record.
pub fn transform(raw: RawJobRecord) -> NewJobRecord {
    let description_html = non_empty(raw.description.clone());
    let description = description_html
        .as_deref()
        .map(strip_html)
        .unwrap_or_default();

    let work_modality = detect_work_modality(&raw);
    let contract_type = detect_contract_type(&raw);
    let employment_type = detect_employment_type(&raw);
    let posted_at = raw.placed_on.as_deref().and_then(parse_feed_date);
    let deadline_at = raw.closes.as_deref().and_then(parse_feed_date);

    NewJobRecord {
        source_url: raw.url.trim().to_string(),
        title: raw.title.trim().to_string(),
        description_html,
        description,
        institution: non_empty(raw.employer),
        department: non_empty(raw.department),
        location: non_empty(raw.location),
        salary_text: non_empty(raw.salary),
        qualifications: non_empty(raw.qualifications).map(|q| strip_html(&q)),
        application_instructions: non_empty(raw.how_to_apply).map(|h| strip_html(&h)),
        application_url: non_empty(raw.apply_url),
        work_modality,
        contract_type,
        employment_type,
        posted_at,
        deadline_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn raw(url: &str) -> RawJobRecord {
        RawJobRecord {
            url: url.to_string(),
            title: "Lecturer in Statistics".to_string(),
            employer: Some("Example University".to_string()),
            department: None,
            location: None,
            salary: None,
            contract_type: None,
            hours: None,
            placed_on: None,
            closes: None,
            description: None,
            qualifications: None,
            how_to_apply: None,
            apply_url: None,
        }
    }

    #[test]
    fn strip_html_removes_tags_and_decodes_entities() {
        let html = "<p>Salary: &pound;45,000 &amp; benefits</p><p>Apply <b>now</b></p>";
        let text = strip_html(html);
        assert_eq!(text, "Salary: £45,000 & benefits\nApply now");
    }

    #[test]
    fn strip_html_turns_list_items_into_lines() {
        let html = "<ul><li>PhD required</li><li>Teaching experience</li></ul>";
        let text = strip_html(html);
        assert!(text.contains("PhD required\n"));
        assert!(text.contains("Teaching experience"));
    }

    #[test]
    fn strip_html_collapses_blank_runs() {
        let html = "<p>One</p><p></p><p></p><p>Two</p>";
        let text = strip_html(html);
        assert_eq!(text, "One\n\nTwo");
    }

    #[test]
    fn strip_html_passes_plain_text_through() {
        assert_eq!(strip_html("Just text."), "Just text.");
    }

    #[test]
    fn parse_feed_date_accepts_iso() {
        let date = parse_feed_date("2026-03-15").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2026, 3, 15));
    }

    #[test]
    fn parse_feed_date_accepts_uk_slash() {
        let date = parse_feed_date("15/03/2026").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2026, 3, 15));
    }

    #[test]
    fn parse_feed_date_accepts_long_month() {
        let date = parse_feed_date("15 March 2026").unwrap();
        assert_eq!(date.month(), 3);
    }

    #[test]
    fn parse_feed_date_accepts_ordinal_suffix() {
        let date = parse_feed_date("22nd March 2026").unwrap();
        assert_eq!((date.month(), date.day()), (3, 22));
    }

    #[test]
    fn parse_feed_date_rejects_garbage() {
        assert!(parse_feed_date("soon").is_none());
        assert!(parse_feed_date("").is_none());
        assert!(parse_feed_date("   ").is_none());
    }

    #[test]
    fn transform_fills_identity_and_text() {
        let mut record = raw("https://example.edu/jobs/1 ");
        record.description = Some("<p>Teach statistics.</p>".to_string());
        let job = transform(record);
        assert_eq!(job.source_url, "https://example.edu/jobs/1");
        assert_eq!(job.description, "Teach statistics.");
        assert_eq!(
            job.description_html.as_deref(),
            Some("<p>Teach statistics.</p>")
        );
        assert_eq!(job.institution.as_deref(), Some("Example University"));
    }

    #[test]
    fn transform_blank_optionals_become_none() {
        let mut record = raw("u");
        record.department = Some("   ".to_string());
        record.salary = Some("".to_string());
        let job = transform(record);
        assert!(job.department.is_none());
        assert!(job.salary_text.is_none());
        assert!(job.description.is_empty());
    }

    #[test]
    fn transform_detects_remote_from_location() {
        let mut record = raw("u");
        record.location = Some("Remote (UK)".to_string());
        let job = transform(record);
        assert_eq!(job.work_modality, Some(WorkModality::Remote));
        assert_eq!(job.location.as_deref(), Some("Remote (UK)"));
    }

    #[test]
    fn transform_detects_hybrid_from_description() {
        let mut record = raw("u");
        record.location = Some("Leeds".to_string());
        record.description = Some("<p>Hybrid working available.</p>".to_string());
        let job = transform(record);
        assert_eq!(job.work_modality, Some(WorkModality::Hybrid));
    }

    #[test]
    fn transform_leaves_modality_unset_for_plain_campus_post() {
        let mut record = raw("u");
        record.location = Some("Leeds".to_string());
        record.description = Some("<p>Teach on campus facilities.</p>".to_string());
        let job = transform(record);
        assert!(job.work_modality.is_none());
    }

    #[test]
    fn transform_maps_contract_labels() {
        let mut record = raw("u");
        record.contract_type = Some("Fixed-term contract for 3 years".to_string());
        assert_eq!(transform(record).contract_type, Some(ContractType::FixedTerm));

        let mut record = raw("u");
        record.contract_type = Some("Permanent".to_string());
        assert_eq!(transform(record).contract_type, Some(ContractType::Permanent));

        let mut record = raw("u");
        record.contract_type = Some("Casual cover".to_string());
        assert_eq!(transform(record).contract_type, Some(ContractType::Temporary));
    }

    #[test]
    fn transform_maps_hours_labels() {
        let mut record = raw("u");
        record.hours = Some("Full Time".to_string());
        assert_eq!(
            transform(record).employment_type,
            Some(EmploymentType::FullTime)
        );

        let mut record = raw("u");
        record.hours = Some("Part-time (0.5 FTE)".to_string());
        assert_eq!(
            transform(record).employment_type,
            Some(EmploymentType::PartTime)
        );
    }

    #[test]
    fn transform_parses_both_dates() {
        let mut record = raw("u");
        record.placed_on = Some("2026-02-01".to_string());
        record.closes = Some("15 March 2026".to_string());
        let job = transform(record);
        assert_eq!(job.posted_at.unwrap().day(), 1);
        assert_eq!(job.deadline_at.unwrap().day(), 15);
    }

    #[test]
    fn transform_strips_html_from_qualifications_and_instructions() {
        let mut record = raw("u");
        record.qualifications = Some("<p>PhD in Statistics</p>".to_string());
        record.how_to_apply = Some("Apply via the <a href=\"x\">portal</a>.".to_string());
        let job = transform(record);
        assert_eq!(job.qualifications.as_deref(), Some("PhD in Statistics"));
        assert_eq!(
            job.application_instructions.as_deref(),
            Some("Apply via the portal .")
        );
    }
}
