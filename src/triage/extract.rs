//! Best-effort intake extraction.
//!
//! Each state's required field is pulled from the user message two ways: the
//! generation collaborator is asked for a JSON array of short strings
//! (anything else degrades to an empty result), and a deterministic keyword
//! or regex scan runs locally. The two are merged, collaborator results
//! first. Extraction can miss; it can never fail a step.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use super::departments::scan_symptoms;
use crate::collaborators::{with_deadline, Generation};

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d+(?:\.\d+)?\s*(?:minutes?|mins?|hours?|hrs?|days?|weeks?|months?|years?)|(?:a\s+few|a\s+couple\s+of|several)\s+(?:minutes|hours|days|weeks|months)|since\s+(?:yesterday|this\s+morning|last\s+night|last\s+week|monday|tuesday|wednesday|thursday|friday|saturday|sunday))\b",
    )
    .expect("valid regex")
});

static PAIN_SCALE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*(?:/|out\s+of)\s*10\b").expect("valid regex")
});

// ── Collaborator-backed extraction ──────────────────────────

pub(crate) async fn extract_symptoms<G: Generation>(
    generator: &G,
    limit: Duration,
    text: &str,
) -> Vec<String> {
    let mut found = llm_string_list(generator, limit, &symptom_prompt(text)).await;
    for keyword in scan_symptoms(text) {
        if !found.iter().any(|f| f.eq_ignore_ascii_case(&keyword)) {
            found.push(keyword);
        }
    }
    found
}

pub(crate) async fn extract_duration<G: Generation>(
    generator: &G,
    limit: Duration,
    text: &str,
) -> Option<String> {
    llm_string_list(generator, limit, &duration_prompt(text))
        .await
        .into_iter()
        .find(|item| DURATION_RE.is_match(item))
        .or_else(|| scan_duration(text))
}

pub(crate) async fn extract_severity<G: Generation>(
    generator: &G,
    limit: Duration,
    text: &str,
) -> Option<String> {
    llm_string_list(generator, limit, &severity_prompt(text))
        .await
        .into_iter()
        .find_map(|item| normalize_severity(&item))
        .or_else(|| scan_severity(text))
}

/// Ask the generation collaborator for a JSON string array. Any failure —
/// timeout, backend error, malformed shape — is an empty result.
async fn llm_string_list<G: Generation>(
    generator: &G,
    limit: Duration,
    prompt: &str,
) -> Vec<String> {
    let raw = match with_deadline(limit, generator.generate(prompt)).await {
        Ok(raw) => raw,
        Err(error) => {
            tracing::debug!(%error, "Extraction call failed; treating as empty");
            return Vec::new();
        }
    };
    parse_string_list(&raw)
}

/// Lenient parse of a collaborator reply into a string list.
pub(crate) fn parse_string_list(raw: &str) -> Vec<String> {
    let stripped = strip_code_fence(raw.trim());
    match serde_json::from_str::<Vec<String>>(stripped) {
        Ok(items) => items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        Err(_) => {
            tracing::debug!("Extraction reply was not a JSON string array; treating as empty");
            Vec::new()
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the fence line (which may carry a language tag), then the
    // closing fence.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim().trim_end_matches("```").trim()
}

// ── Deterministic scans ─────────────────────────────────────

pub(crate) fn scan_duration(text: &str) -> Option<String> {
    DURATION_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

pub(crate) fn scan_severity(text: &str) -> Option<String> {
    let lower = text.to_lowercase();

    const SEVERE: &[&str] = &[
        "severe", "unbearable", "terrible", "excruciating", "intense", "very bad", "worst",
    ];
    const MODERATE: &[&str] = &["moderate", "medium", "noticeable", "bothersome"];
    const MILD: &[&str] = &["mild", "slight", "minor", "light"];

    if SEVERE.iter().any(|w| lower.contains(w)) {
        return Some("severe".to_string());
    }
    if MODERATE.iter().any(|w| lower.contains(w)) {
        return Some("moderate".to_string());
    }
    if MILD.iter().any(|w| lower.contains(w)) {
        return Some("mild".to_string());
    }

    // Pain scale: "7/10", "4 out of 10".
    if let Some(caps) = PAIN_SCALE_RE.captures(&lower) {
        if let Ok(value) = caps[1].parse::<u8>() {
            return Some(
                match value {
                    0..=3 => "mild",
                    4..=6 => "moderate",
                    _ => "severe",
                }
                .to_string(),
            );
        }
    }

    None
}

fn normalize_severity(item: &str) -> Option<String> {
    match item.trim().to_lowercase().as_str() {
        "mild" | "moderate" | "severe" => Some(item.trim().to_lowercase()),
        other => scan_severity(other),
    }
}

// ── Prompts ─────────────────────────────────────────────────

fn symptom_prompt(message: &str) -> String {
    format!(
        "Extract the medical symptoms mentioned in the message below. \
         Respond with only a JSON array of short lowercase symptom phrases, \
         or [] if there are none.\n\nMessage: {message}"
    )
}

fn duration_prompt(message: &str) -> String {
    format!(
        "Extract how long the symptoms have lasted from the message below. \
         Respond with only a JSON array containing a single short duration \
         phrase such as [\"2 days\"], or [] if no duration is given.\n\n\
         Message: {message}"
    )
}

fn severity_prompt(message: &str) -> String {
    format!(
        "Classify the symptom severity described in the message below. \
         Respond with only a JSON array containing one of \"mild\", \
         \"moderate\" or \"severe\", or [] if severity is unclear.\n\n\
         Message: {message}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::CollaboratorError;
    use async_trait::async_trait;

    struct CannedGenerator(String);

    #[async_trait]
    impl Generation for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, CollaboratorError> {
            Ok(self.0.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generation for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Generation("model offline".into()))
        }
    }

    const LIMIT: Duration = Duration::from_millis(200);

    // ── parse_string_list ──────────────────────────────────

    #[test]
    fn parses_plain_json_array() {
        assert_eq!(
            parse_string_list(r#"["headache", "fever"]"#),
            vec!["headache", "fever"]
        );
    }

    #[test]
    fn parses_fenced_json_array() {
        let raw = "```json\n[\"nausea\"]\n```";
        assert_eq!(parse_string_list(raw), vec!["nausea"]);
    }

    #[test]
    fn prose_reply_degrades_to_empty() {
        assert!(parse_string_list("The patient seems to have a headache.").is_empty());
    }

    #[test]
    fn non_string_array_degrades_to_empty() {
        assert!(parse_string_list(r#"[{"symptom": "fever"}]"#).is_empty());
    }

    #[test]
    fn blank_entries_are_dropped() {
        assert_eq!(parse_string_list(r#"["", "  ", "cough"]"#), vec!["cough"]);
    }

    // ── scans ──────────────────────────────────────────────

    #[test]
    fn scan_duration_finds_numeric_spans() {
        assert_eq!(scan_duration("about 2 days now"), Some("2 days".into()));
        assert_eq!(scan_duration("for 3 weeks"), Some("3 weeks".into()));
        assert_eq!(scan_duration("maybe 12 hours"), Some("12 hours".into()));
    }

    #[test]
    fn scan_duration_finds_relative_spans() {
        assert_eq!(scan_duration("since yesterday"), Some("since yesterday".into()));
        assert_eq!(scan_duration("a few days already"), Some("a few days".into()));
    }

    #[test]
    fn scan_duration_misses_plain_text() {
        assert_eq!(scan_duration("it just hurts"), None);
    }

    #[test]
    fn scan_severity_maps_words() {
        assert_eq!(scan_severity("it's pretty mild"), Some("mild".into()));
        assert_eq!(scan_severity("moderate I'd say"), Some("moderate".into()));
        assert_eq!(scan_severity("the pain is unbearable"), Some("severe".into()));
    }

    #[test]
    fn scan_severity_maps_pain_scale() {
        assert_eq!(scan_severity("about 8/10"), Some("severe".into()));
        assert_eq!(scan_severity("a 5 out of 10"), Some("moderate".into()));
        assert_eq!(scan_severity("2/10 at most"), Some("mild".into()));
    }

    #[test]
    fn scan_severity_misses_unrelated_text() {
        assert_eq!(scan_severity("no idea really"), None);
    }

    // ── collaborator merge ─────────────────────────────────

    #[tokio::test]
    async fn symptoms_merge_llm_and_keyword_scan() {
        let generator = CannedGenerator(r#"["throbbing temples"]"#.into());
        let found = extract_symptoms(&generator, LIMIT, "bad headache since monday").await;
        assert!(found.contains(&"throbbing temples".to_string()));
        assert!(found.contains(&"headache".to_string()));
    }

    #[tokio::test]
    async fn failed_collaborator_still_yields_keyword_hits() {
        let found = extract_symptoms(&FailingGenerator, LIMIT, "fever and cough").await;
        assert!(found.contains(&"fever".to_string()));
        assert!(found.contains(&"cough".to_string()));
    }

    #[tokio::test]
    async fn duration_rejects_non_duration_llm_reply() {
        let generator = CannedGenerator(r#"["definitely"]"#.into());
        let found = extract_duration(&generator, LIMIT, "started 2 days ago").await;
        assert_eq!(found, Some("2 days".into()));
    }

    #[tokio::test]
    async fn severity_normalizes_llm_reply() {
        let generator = CannedGenerator(r#"["Severe"]"#.into());
        let found = extract_severity(&generator, LIMIT, "hmm").await;
        assert_eq!(found, Some("severe".into()));
    }

    #[tokio::test]
    async fn nothing_extractable_is_none_not_error() {
        let generator = CannedGenerator("[]".into());
        assert_eq!(extract_duration(&generator, LIMIT, "dunno").await, None);
        assert_eq!(extract_severity(&generator, LIMIT, "dunno").await, None);
    }
}
