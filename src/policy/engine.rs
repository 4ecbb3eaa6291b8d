use super::rules::RuleSet;
use super::types::PolicyVerdict;

/// The content-safety gate. Pure, in-memory pattern matching over the
/// injected rule set; never suspends, never fails.
#[derive(Debug)]
pub struct PolicyEngine {
    rules: RuleSet,
}

impl PolicyEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Engine over the built-in clinical tables.
    pub fn with_default_rules() -> Self {
        Self::new(RuleSet::default_clinical())
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Screen an inbound user message.
    ///
    /// Rule groups run in fixed priority order: dangerous intent first (a
    /// match blocks outright and short-circuits everything downstream), then
    /// emergency language (a match flags urgency but lets processing
    /// continue), otherwise pass.
    pub fn check_input(&self, text: &str) -> PolicyVerdict {
        if let Some(rule) = self.rules.matches_dangerous(text) {
            tracing::warn!(rule, "Input blocked by content policy");
            return PolicyVerdict::block(self.ensure_disclaimer(self.rules.refusal()));
        }

        if let Some(rule) = self.rules.matches_emergency(text) {
            tracing::info!(rule, "Emergency language detected in input");
            return PolicyVerdict::emergency(self.rules.banner().to_string());
        }

        PolicyVerdict::pass()
    }

    /// Rewrite a generated draft into advisory phrasing.
    ///
    /// Every rewrite rule is applied over the whole text in table order (not
    /// just the first match), then the disclaimer is appended if absent.
    /// Idempotent: replacement text never re-matches a rewrite pattern, so a
    /// second pass is a no-op.
    pub fn check_output(&self, text: &str) -> PolicyVerdict {
        let mut result = text.to_string();
        let mut rewritten = false;

        for rule in &self.rules.rewrites {
            if rule.regex.is_match(&result) {
                tracing::debug!(
                    rule = rule.description.as_str(),
                    "Rewrote diagnostic phrasing"
                );
                rewritten = true;
                result = rule
                    .regex
                    .replace_all(&result, rule.template.as_str())
                    .into_owned();
            }
        }

        PolicyVerdict::output(self.ensure_disclaimer(&result), rewritten)
    }

    /// Append the disclaimer unless the text already carries it.
    pub fn ensure_disclaimer(&self, text: &str) -> String {
        if text.contains(self.rules.disclaimer()) {
            text.to_string()
        } else {
            format!("{}\n\n{}", text.trim_end(), self.rules.disclaimer())
        }
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::with_default_rules()
    }
}
