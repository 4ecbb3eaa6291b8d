//! Immutable rule tables for the content policy.
//!
//! A `RuleSet` is built once (from the built-in clinical defaults or through
//! `RuleSetBuilder`) and injected into `PolicyEngine`. Patterns compile at
//! construction; a pattern that fails to compile is skipped with a warning
//! rather than failing the build, so a bad configuration degrades to a more
//! permissive set instead of a dead engine.

use regex::Regex;

use super::types::{RewriteRule, ScreenRule};

/// Refusal shown for dangerous-intent input. Deliberately calm and
/// supportive; the disclaimer is appended by the engine.
pub const DEFAULT_REFUSAL: &str =
    "I can't help with that request. If you are having thoughts of harming \
     yourself or someone else, please reach out to someone you trust or \
     contact a local crisis line right away — support is available.";

/// Banner surfaced whenever emergency language is detected.
pub const DEFAULT_BANNER: &str =
    "If this may be a medical emergency, call your local emergency number \
     (for example 911 or 112) or go to the nearest emergency department now.";

/// Suffix guaranteed on every generated answer and every canned reply.
pub const DEFAULT_DISCLAIMER: &str =
    "This conversation offers general health information only and is not a \
     diagnosis. Please consult a qualified healthcare professional about \
     your situation.";

// ── Built-in pattern tables ─────────────────────────────────

/// Dangerous-intent patterns. Any match blocks the message outright.
static DANGEROUS_PATTERNS: &[(&str, &str)] = &[
    (
        r"(?i)\bhow\s+(?:to|do\s+i|can\s+i|would\s+i)\s+(?:commit\s+suicide|kill\s+(?:myself|himself|herself|themselves|someone)|end\s+my\s+life)\b",
        "Method-seeking self-harm or harm to others",
    ),
    (
        r"(?i)\b(?:best|easiest|quickest|painless)\s+way\s+to\s+(?:die|kill|end\s+it)\b",
        "Method-seeking self-harm",
    ),
    (
        r"(?i)\blethal\s+dose\b",
        "Lethal dose query",
    ),
    (
        r"(?i)\bhow\s+(?:much|many)\s+[\w\s]{1,40}?\s*(?:to|would\s+it\s+take\s+to)\s+(?:overdose|die|kill)\b",
        "Overdose quantity query",
    ),
    (
        r"(?i)\bhow\s+to\s+(?:poison|drug|sedate)\s+(?:someone|somebody|a\s+person|my)\b",
        "Harming another person",
    ),
    (
        r"(?i)\b(?:buy|get|obtain|order)\s+(?:opioids?|fentanyl|oxycodone|morphine|xanax|benzodiazepines?)\b[\w\s]{0,40}\bwithout\s+(?:a\s+)?prescription\b",
        "Illicit controlled-substance acquisition",
    ),
];

/// Emergency patterns. A match flags urgency but does not block; the same
/// set backs the triage emergency guard via `matches_emergency`.
static EMERGENCY_PATTERNS: &[(&str, &str)] = &[
    (
        r"(?i)\bchest\s+(?:pain|pressure|tightness)\b",
        "Chest pain",
    ),
    (
        r"(?i)\b(?:can'?t|cannot|trouble|difficulty|hard\s+to|struggling\s+to)\s+breath(?:e|ing)\b",
        "Breathing difficulty",
    ),
    (
        r"(?i)\b(?:short(?:ness)?\s+of\s+breath|gasping|choking)\b",
        "Breathing difficulty",
    ),
    (
        r"(?i)\b(?:unconscious|unresponsive|passed\s+out|won'?t\s+wake)\b",
        "Loss of consciousness",
    ),
    (
        r"(?i)\b(?:seizure|convulsion|convulsing)\b",
        "Seizure",
    ),
    (
        r"(?i)\b(?:severe|heavy|uncontrolled)\s+bleeding\b",
        "Severe bleeding",
    ),
    (
        r"(?i)\b(?:coughing|vomiting|throwing)\s+(?:up\s+)?blood\b",
        "Internal bleeding sign",
    ),
    (
        r"(?i)\b(?:stroke|face\s+droop(?:ing)?|slurred\s+speech)\b",
        "Stroke sign",
    ),
    (
        r"(?i)\bsudden\s+(?:numbness|weakness|confusion|vision\s+loss)\b",
        "Stroke sign",
    ),
    (
        r"(?i)\b(?:throat\s+(?:is\s+)?(?:closing|swelling)|anaphyla\w*)\b",
        "Anaphylaxis sign",
    ),
    (
        r"(?i)\bworst\s+headache\s+of\s+my\s+life\b",
        "Thunderclap headache",
    ),
    (
        r"(?i)\b(?:suicidal|want\s+to\s+die|don'?t\s+want\s+to\s+(?:live|be\s+alive))\b",
        "Suicidal ideation",
    ),
    (
        r"(?i)\b(?:overdosed?|took\s+too\s+many\s+(?:pills|tablets))\b",
        "Overdose event",
    ),
];

/// Diagnostic-language rewrite rules. Applied in table order, every rule,
/// over the whole text. Replacement text must never re-match any pattern in
/// this table — that keeps `check_output` idempotent.
static REWRITE_RULES: &[(&str, &str, &str)] = &[
    (
        r"(?i)\byou\s+(?:likely|probably|possibly|clearly|definitely)\s+have\s+([\w][\w' -]{0,60}?)([.!?,;:]|$)",
        "these symptoms are sometimes linked to $1$2",
        "Hedged diagnosis: 'you likely have'",
    ),
    (
        r"(?i)\byou\s+have\s+((?:a\s+|an\s+|the\s+)?[\w][\w' -]{0,60}?)([.!?,;:]|$)",
        "your symptoms can be associated with $1$2",
        "Direct diagnosis: 'you have [condition]'",
    ),
    (
        r"(?i)\byou\s+are\s+suffering\s+from\s+([\w][\w' -]{0,60}?)([.!?,;:]|$)",
        "what you describe is sometimes seen with $1$2",
        "Direct diagnosis: 'you are suffering from'",
    ),
    (
        r"(?i)\byou(?:'re|\s+are)\s+(?:a\s+)?(diabetic|hypertensive|anemic|asthmatic|epileptic|depressed)\b",
        "there may be a connection to being $1",
        "Direct label: 'you are diabetic'",
    ),
    (
        r"(?i)\bthe\s+diagnosis\s+is\s+([\w][\w' -]{0,60}?)([.!?,;:]|$)",
        "one possibility worth discussing is $1$2",
        "Diagnosis assertion: 'the diagnosis is'",
    ),
    (
        r"(?i)\byour\s+condition\s+is\s+([\w][\w' -]{0,60}?)([.!?,;:]|$)",
        "what you describe may involve $1$2",
        "Condition assertion: 'your condition is'",
    ),
    (
        r"(?i)\byou\s+(?:should|must|need\s+to)\s+(take|stop|start|increase|decrease|switch)\s+([\w][\w' -]{0,60}?)([.!?,;:]|$)",
        "you could ask a clinician whether to $1 $2$3",
        "Directive: 'you should take/stop'",
    ),
    (
        r"(?i)\bI\s+recommend\s+([\w][\w' -]{0,60}?)([.!?,;:]|$)",
        "it may be worth asking a clinician about $1$2",
        "Directive: 'I recommend'",
    ),
];

// ── RuleSet ─────────────────────────────────────────────────

/// Immutable, compiled policy rules. Safe for unlimited concurrent reads.
#[derive(Debug)]
pub struct RuleSet {
    pub(crate) dangerous: Vec<ScreenRule>,
    pub(crate) emergency: Vec<ScreenRule>,
    pub(crate) rewrites: Vec<RewriteRule>,
    pub(crate) refusal: String,
    pub(crate) banner: String,
    pub(crate) disclaimer: String,
}

impl RuleSet {
    /// The built-in clinical rule tables.
    pub fn default_clinical() -> Self {
        let mut builder = RuleSetBuilder::new();
        for &(pattern, description) in DANGEROUS_PATTERNS {
            builder = builder.dangerous(pattern, description);
        }
        for &(pattern, description) in EMERGENCY_PATTERNS {
            builder = builder.emergency(pattern, description);
        }
        for &(pattern, template, description) in REWRITE_RULES {
            builder = builder.rewrite(pattern, template, description);
        }
        builder.build()
    }

    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::new()
    }

    pub fn refusal(&self) -> &str {
        &self.refusal
    }

    pub fn banner(&self) -> &str {
        &self.banner
    }

    pub fn disclaimer(&self) -> &str {
        &self.disclaimer
    }

    /// First dangerous rule matching `text`, as its audit label.
    pub fn matches_dangerous(&self, text: &str) -> Option<&str> {
        first_match(&self.dangerous, text)
    }

    /// First emergency rule matching `text`, as its audit label.
    /// Shared with the triage guard so both components read one keyword
    /// source.
    pub fn matches_emergency(&self, text: &str) -> Option<&str> {
        first_match(&self.emergency, text)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::default_clinical()
    }
}

fn first_match<'a>(rules: &'a [ScreenRule], text: &str) -> Option<&'a str> {
    rules
        .iter()
        .find(|rule| rule.regex.is_match(text))
        .map(|rule| rule.description.as_str())
}

// ── Builder ─────────────────────────────────────────────────

/// Lenient builder for a `RuleSet`.
///
/// Invalid patterns are logged and skipped; omitted texts fall back to the
/// built-in constants. The result is always usable.
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    dangerous: Vec<ScreenRule>,
    emergency: Vec<ScreenRule>,
    rewrites: Vec<RewriteRule>,
    refusal: Option<String>,
    banner: Option<String>,
    disclaimer: Option<String>,
}

impl RuleSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dangerous(mut self, pattern: &str, description: &str) -> Self {
        if let Some(regex) = compile(pattern, description) {
            self.dangerous.push(ScreenRule {
                regex,
                description: description.to_string(),
            });
        }
        self
    }

    pub fn emergency(mut self, pattern: &str, description: &str) -> Self {
        if let Some(regex) = compile(pattern, description) {
            self.emergency.push(ScreenRule {
                regex,
                description: description.to_string(),
            });
        }
        self
    }

    pub fn rewrite(mut self, pattern: &str, template: &str, description: &str) -> Self {
        if let Some(regex) = compile(pattern, description) {
            self.rewrites.push(RewriteRule {
                regex,
                template: template.to_string(),
                description: description.to_string(),
            });
        }
        self
    }

    pub fn refusal_text(mut self, text: &str) -> Self {
        self.refusal = Some(text.to_string());
        self
    }

    pub fn banner_text(mut self, text: &str) -> Self {
        self.banner = Some(text.to_string());
        self
    }

    pub fn disclaimer_text(mut self, text: &str) -> Self {
        self.disclaimer = Some(text.to_string());
        self
    }

    pub fn build(self) -> RuleSet {
        RuleSet {
            dangerous: self.dangerous,
            emergency: self.emergency,
            rewrites: self.rewrites,
            refusal: self.refusal.unwrap_or_else(|| DEFAULT_REFUSAL.to_string()),
            banner: self.banner.unwrap_or_else(|| DEFAULT_BANNER.to_string()),
            disclaimer: self
                .disclaimer
                .unwrap_or_else(|| DEFAULT_DISCLAIMER.to_string()),
        }
    }
}

fn compile(pattern: &str, description: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(error) => {
            tracing::warn!(%pattern, %description, %error, "Skipping malformed policy pattern");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_all_compile() {
        let rules = RuleSet::default_clinical();
        assert_eq!(rules.dangerous.len(), DANGEROUS_PATTERNS.len());
        assert_eq!(rules.emergency.len(), EMERGENCY_PATTERNS.len());
        assert_eq!(rules.rewrites.len(), REWRITE_RULES.len());
    }

    #[test]
    fn dangerous_matches_case_and_whitespace_variants() {
        let rules = RuleSet::default_clinical();
        assert!(rules.matches_dangerous("how to commit suicide").is_some());
        assert!(rules.matches_dangerous("HOW  TO  COMMIT  SUICIDE").is_some());
        assert!(rules.matches_dangerous("How do I kill myself").is_some());
        assert!(rules.matches_dangerous("what is the lethal dose of paracetamol").is_some());
    }

    #[test]
    fn dangerous_does_not_match_ordinary_questions() {
        let rules = RuleSet::default_clinical();
        assert!(rules.matches_dangerous("what helps with a headache").is_none());
        assert!(rules.matches_dangerous("is paracetamol safe with ibuprofen").is_none());
    }

    #[test]
    fn emergency_matches_chest_pain_and_breathing() {
        let rules = RuleSet::default_clinical();
        assert!(rules.matches_emergency("I have crushing chest pain").is_some());
        assert!(rules.matches_emergency("my dad can't breathe").is_some());
        assert!(rules.matches_emergency("shortness of breath since lunch").is_some());
    }

    #[test]
    fn emergency_matches_ideation_but_not_mild_symptoms() {
        let rules = RuleSet::default_clinical();
        assert!(rules.matches_emergency("I am suicidal").is_some());
        assert!(rules.matches_emergency("a mild headache and a runny nose").is_none());
    }

    #[test]
    fn malformed_pattern_is_skipped_not_fatal() {
        let rules = RuleSet::builder()
            .dangerous(r"(?i)\bvalid\b", "valid rule")
            .dangerous(r"([unclosed", "broken rule")
            .build();
        assert_eq!(rules.dangerous.len(), 1);
        assert!(rules.matches_dangerous("valid").is_some());
    }

    #[test]
    fn empty_builder_falls_back_to_default_texts() {
        let rules = RuleSet::builder().build();
        assert_eq!(rules.refusal(), DEFAULT_REFUSAL);
        assert_eq!(rules.banner(), DEFAULT_BANNER);
        assert_eq!(rules.disclaimer(), DEFAULT_DISCLAIMER);
        assert!(rules.matches_dangerous("anything at all").is_none());
    }

    #[test]
    fn builder_text_overrides_stick() {
        let rules = RuleSet::builder()
            .banner_text("CALL 112")
            .disclaimer_text("Not medical advice.")
            .build();
        assert_eq!(rules.banner(), "CALL 112");
        assert_eq!(rules.disclaimer(), "Not medical advice.");
    }
}
