use regex::Regex;
use serde::{Deserialize, Serialize};

/// What the policy decided for a single piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    /// No rule matched; the text flows through unchanged.
    Pass,
    /// Dangerous intent; the caller must answer with the refusal text and
    /// make no retrieval or generation calls.
    Block,
    /// Emergency language; processing continues, but the caller must surface
    /// the banner and flag urgency.
    EmergencyAlert,
    /// Output check rewrote at least one diagnostic phrase.
    Rewrite,
}

/// Outcome of one policy evaluation. Produced fresh per call, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub passed: bool,
    pub action: PolicyAction,
    /// Refusal text or emergency banner, when the action carries one.
    pub message: Option<String>,
    /// Final text after rewriting (output checks only).
    pub content: Option<String>,
}

impl PolicyVerdict {
    pub(crate) fn pass() -> Self {
        Self {
            passed: true,
            action: PolicyAction::Pass,
            message: None,
            content: None,
        }
    }

    pub(crate) fn block(refusal: String) -> Self {
        Self {
            passed: false,
            action: PolicyAction::Block,
            message: Some(refusal),
            content: None,
        }
    }

    pub(crate) fn emergency(banner: String) -> Self {
        Self {
            passed: true,
            action: PolicyAction::EmergencyAlert,
            message: Some(banner),
            content: None,
        }
    }

    pub(crate) fn output(content: String, rewritten: bool) -> Self {
        Self {
            passed: true,
            action: if rewritten {
                PolicyAction::Rewrite
            } else {
                PolicyAction::Pass
            },
            message: None,
            content: Some(content),
        }
    }
}

/// Which rule group a pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Dangerous,
    Emergency,
    Diagnostic,
}

/// A compiled input-screening rule.
#[derive(Debug)]
pub struct ScreenRule {
    pub(crate) regex: Regex,
    /// Short label for the audit log; never shown to the user.
    pub(crate) description: String,
}

/// A compiled diagnostic-language rewrite rule.
///
/// The template uses regex-crate `$n` capture references. Replacement text
/// must never re-match any rewrite pattern — that property is what makes
/// `check_output` idempotent, and it is covered by tests on the default set.
#[derive(Debug)]
pub struct RewriteRule {
    pub(crate) regex: Regex,
    pub(crate) template: String,
    pub(crate) description: String,
}
